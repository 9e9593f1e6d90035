//! Non-fatal findings reported while encoding or decoding.

use std::fmt;

/// A condition that was handled by dropping or skipping data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A record property was omitted because its key encodes to 255 bytes
    /// or more.
    OversizedKey { key: String, len: usize },
    /// A value with no wire representation was omitted.
    Unrepresentable { kind: &'static str },
    /// The input carried an UNSUPPORTED placeholder, which was skipped.
    UnsupportedPlaceholder { offset: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::OversizedKey { key, len } => {
                write!(f, "property key '{key}' too long ({len} bytes), skipping")
            }
            Diagnostic::Unrepresentable { kind } => {
                write!(f, "{kind} value cannot be serialized, skipping")
            }
            Diagnostic::UnsupportedPlaceholder { offset } => write!(
                f,
                "input contained a value that could not be serialized (offset {offset}), ignoring"
            ),
        }
    }
}

/// Accumulated diagnostics of one encode or decode call.
///
/// Every pushed entry is also emitted as a `warn` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(target: "binpack", "{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
