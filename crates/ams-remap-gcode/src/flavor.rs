//! G-code flavor definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GcodeError;

/// G-code flavor (dialect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GcodeFlavor {
    /// Bambu Lab printers.
    #[default]
    Bambu,
    /// Marlin firmware (Ender, Prusa).
    Marlin,
    /// Klipper firmware.
    Klipper,
    /// RepRap firmware.
    RepRap,
}

impl GcodeFlavor {
    /// Command that stops the print until the user resumes it.
    pub fn pause_gcode(&self) -> &'static str {
        match self {
            GcodeFlavor::Bambu => "M400 U1",
            GcodeFlavor::Marlin => "M601",
            GcodeFlavor::Klipper => "PAUSE",
            GcodeFlavor::RepRap => "M226",
        }
    }

    /// Lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            GcodeFlavor::Bambu => "bambu",
            GcodeFlavor::Marlin => "marlin",
            GcodeFlavor::Klipper => "klipper",
            GcodeFlavor::RepRap => "reprap",
        }
    }
}

impl fmt::Display for GcodeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GcodeFlavor {
    type Err = GcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bambu" => Ok(GcodeFlavor::Bambu),
            "marlin" => Ok(GcodeFlavor::Marlin),
            "klipper" => Ok(GcodeFlavor::Klipper),
            "reprap" | "rrf" => Ok(GcodeFlavor::RepRap),
            _ => Err(GcodeError::UnknownFlavor(s.to_string())),
        }
    }
}
