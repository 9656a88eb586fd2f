//! Type definitions for nanrate

mod dataset;
mod error;
mod period;

pub use dataset::*;
pub use error::*;
pub use period::Period;

/// What the presentation layer asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    /// A single reporting month
    Period(Period),
    /// Every available period, combined
    All,
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::Period(p) => write!(f, "{}", p),
            Selection::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for Selection {
    type Err = NanRateError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Selection::All)
        } else {
            s.parse().map(Selection::Period)
        }
    }
}
