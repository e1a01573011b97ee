//! G-code text split into lines, remembering the line separator.

use std::fmt;

/// A G-code program as lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcodeText {
    /// Lines without separators.
    pub lines: Vec<String>,
    /// Separator used when joining (`"\n"` or `"\r\n"`).
    pub separator: &'static str,
}

impl GcodeText {
    /// Split text into lines. Uses `\r\n` on output if the input had any.
    pub fn parse(text: &str) -> Self {
        let separator = if text.contains("\r\n") { "\r\n" } else { "\n" };
        Self {
            lines: text.lines().map(str::to_string).collect(),
            separator,
        }
    }

    /// Same separator, new lines.
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            lines,
            separator: self.separator,
        }
    }

    /// Join the lines back into one string.
    pub fn join(&self) -> String {
        self.lines.join(self.separator)
    }
}

impl fmt::Display for GcodeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}
