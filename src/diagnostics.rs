//! Non-fatal events raised while converting Markdown.
//!
//! Every event is recovered where it happens; the collector only exists so a
//! caller can report what was degraded.

use log::debug;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A construct could not be mapped cleanly and was rendered in a simpler form.
    ParseDegraded { construct: &'static str, detail: String },
    /// Text exceeded a size limit and was split into `pieces` parts.
    OverflowSplit { construct: &'static str, pieces: usize },
    /// A construct with no Slack equivalent, e.g. raw HTML.
    UnsupportedConstruct { construct: &'static str, text: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ParseDegraded { construct, detail } => {
                write!(f, "{} degraded: {}", construct, detail)
            }
            Diagnostic::OverflowSplit { construct, pieces } => {
                write!(f, "{} split into {} pieces", construct, pieces)
            }
            Diagnostic::UnsupportedConstruct { construct, text } => {
                write!(f, "unsupported {}: {}", construct, text)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        debug!("{}", diagnostic);
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }
}
