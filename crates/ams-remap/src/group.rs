//! Resolution of user color pairs into slot-sharing groups.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::timeline::{Color, Slot};

/// Default number of AMS slots.
pub const DEFAULT_SLOTS: u32 = 4;

/// "Color `guest` shares the slot of color `host`."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Color that gets loaded by hand.
    pub guest: Color,
    /// Color whose slot is shared.
    pub host: Color,
}

impl Share {
    /// Create a new share.
    pub fn new(guest: u32, host: u32) -> Self {
        Self {
            guest: Color(guest),
            host: Color(host),
        }
    }
}

impl FromStr for Share {
    type Err = ConfigurationError;

    /// Parse `guest:host`, e.g. `5:2`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidShare(s.to_string());
        let (guest, host) = s.split_once(':').ok_or_else(invalid)?;
        let guest = guest.trim().parse().map_err(|_| invalid())?;
        let host = host.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(guest, host))
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guest, self.host)
    }
}

/// A command-line share list: `guest:host` or `guest:guest:...:host`.
///
/// Every color before the last one shares the slot of the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareGroup {
    shares: Vec<Share>,
}

impl ShareGroup {
    /// The pairs this group stands for.
    pub fn shares(&self) -> &[Share] {
        &self.shares
    }
}

impl FromStr for ShareGroup {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidShare(s.to_string());
        let colors = s
            .split(':')
            .map(|c| c.trim().parse::<u32>().map_err(|_| invalid()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let (&host, guests) = colors.split_last().ok_or_else(invalid)?;
        if guests.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            shares: guests.iter().map(|&g| Share::new(g, host)).collect(),
        })
    }
}

/// Colors sharing one physical slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorGroup {
    /// The shared slot.
    pub slot: Slot,
    /// Base color native to the slot, unless it was itself remapped elsewhere.
    pub anchor: Option<Color>,
    /// Colors loaded into the slot by hand.
    pub guests: Vec<Color>,
}

/// Resolved color → slot mapping for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGroups {
    slots: u32,
    anchors: Vec<Slot>,
}

impl ColorGroups {
    /// Resolve `shares` for a job with colors `1..=color_count` on a printer
    /// with `slots` slots.
    ///
    /// Hosts may be base colors or guests that themselves resolve to a base
    /// color. Base colors not named as guests anchor to their own slot.
    /// Every color above the slot count must reach a base color through
    /// the shares, whether or not the job prints it.
    pub fn resolve(color_count: u32, slots: u32, shares: &[Share]) -> Result<Self> {
        if slots == 0 {
            return Err(ConfigurationError::NoSlots.into());
        }

        let in_range = |color: Color| {
            if color.0 == 0 || color.0 > color_count {
                Err(ConfigurationError::ColorOutOfRange {
                    color: color.0,
                    color_count,
                })
            } else {
                Ok(())
            }
        };

        let mut hosts: BTreeMap<Color, Color> = BTreeMap::new();
        for share in shares {
            in_range(share.guest)?;
            in_range(share.host)?;
            if share.guest == share.host {
                return Err(ConfigurationError::SelfShare(share.guest.0).into());
            }
            if let Some(first) = hosts.insert(share.guest, share.host) {
                return Err(ConfigurationError::DuplicateGuest {
                    guest: share.guest.0,
                    first: first.0,
                    second: share.host.0,
                }
                .into());
            }
        }

        let mut anchors = Vec::with_capacity(color_count as usize);
        for color in (1..=color_count).map(Color) {
            let mut current = color;
            let mut visited = BTreeSet::new();
            let slot = loop {
                if !visited.insert(current) {
                    return Err(ConfigurationError::Cycle(color.0).into());
                }
                match hosts.get(&current) {
                    Some(&host) => current = host,
                    None if current.0 <= slots => break Slot(current.0),
                    None => {
                        return Err(ConfigurationError::Unassigned {
                            color: color.0,
                            slots,
                        }
                        .into())
                    }
                }
            };
            anchors.push(slot);
        }

        Ok(Self { slots, anchors })
    }

    /// Every color in its own native slot (no sharing).
    pub fn identity(color_count: u32, slots: u32) -> Result<Self> {
        Self::resolve(color_count, slots, &[])
    }

    /// Number of physical slots.
    pub fn slot_count(&self) -> u32 {
        self.slots
    }

    /// Number of job colors.
    pub fn color_count(&self) -> u32 {
        self.anchors.len() as u32
    }

    /// Slot a color is printed from, or `None` for colors outside the job.
    pub fn anchor(&self, color: Color) -> Option<Slot> {
        if color.0 == 0 {
            return None;
        }
        let index = color.0.checked_sub(1)?;
        self.anchors.get(index as usize).copied()
    }

    /// Check if two colors are printed from the same slot.
    pub fn is_grouped(&self, a: Color, b: Color) -> bool {
        match (self.anchor(a), self.anchor(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Check if any color has to be loaded by hand.
    pub fn has_guests(&self) -> bool {
        self.anchors
            .iter()
            .enumerate()
            .any(|(i, slot)| slot.0 != i as u32 + 1)
    }

    /// Colors loaded at job start: slot `i` holds color `i` when that color
    /// still anchors to its own slot.
    pub fn initial_load(&self) -> Vec<Option<Color>> {
        (1..=self.slots)
            .map(|s| {
                let color = Color(s);
                (self.anchor(color) == Some(Slot(s))).then_some(color)
            })
            .collect()
    }

    /// All groups, one per slot in slot order.
    pub fn groups(&self) -> Vec<ColorGroup> {
        self.initial_load()
            .into_iter()
            .zip((1..=self.slots).map(Slot))
            .map(|(anchor, slot)| {
                let guests = self
                    .anchors
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (Color(i as u32 + 1), *s))
                    .filter(|&(c, s)| s == slot && Some(c) != anchor)
                    .map(|(c, _)| c)
                    .collect();
                ColorGroup {
                    slot,
                    anchor,
                    guests,
                }
            })
            .collect()
    }
}

impl fmt::Display for ColorGroups {
    /// Renders shared groups as `2:5 3:7`, anchor first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for group in self.groups().into_iter().filter(|g| !g.guests.is_empty()) {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            let members: Vec<String> = group
                .anchor
                .into_iter()
                .chain(group.guests)
                .map(|c| c.to_string())
                .collect();
            write!(f, "{}", members.join(":"))?;
        }
        Ok(())
    }
}
