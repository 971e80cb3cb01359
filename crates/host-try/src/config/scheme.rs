use std::fmt;

use serde::{Deserialize, Serialize};

/// Retry scheme selector.
///
/// The three schemes are mutually exclusive. When the attempt limit is zero
/// the run always uses [`Scheme::Until`], whatever was selected here.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    /// Exhaust the attempt limit on each host before moving to the next.
    Direct,
    /// Round-robin over the hosts, one try per host per round.
    #[default]
    Staggered,
    /// Cycle over the hosts until one succeeds.
    Until,
}

impl Scheme {
    /// Resolve a scheme by name, falling back to [`Scheme::Staggered`] for
    /// anything unrecognized.
    ///
    /// Both the short names (`direct`) and the long form (`directConnection`)
    /// are accepted, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "direct" | "directconnection" => Self::Direct,
            "staggered" | "staggeredconnection" => Self::Staggered,
            "until" | "untilconnection" => Self::Until,
            _ => Self::Staggered,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Staggered => write!(f, "staggered"),
            Self::Until => write!(f, "until"),
        }
    }
}

/// What a fired cancellation token does to a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelMode {
    /// Cancellation cuts the pending wait short and the next attempt
    /// proceeds immediately. The run itself is never aborted.
    #[default]
    ShortenWait,
    /// Cancellation ends the run with a cancelled, unsuccessful outcome.
    Abort,
}

impl CancelMode {
    /// Resolve a mode by name. Unknown names keep the default.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "abort" => Self::Abort,
            _ => Self::ShortenWait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_from_name() {
        assert_eq!(Scheme::from_name("direct"), Scheme::Direct);
        assert_eq!(Scheme::from_name("directConnection"), Scheme::Direct);
        assert_eq!(Scheme::from_name("Staggered"), Scheme::Staggered);
        assert_eq!(Scheme::from_name("untilConnection"), Scheme::Until);
        assert_eq!(Scheme::from_name(" UNTIL "), Scheme::Until);
    }

    #[test]
    fn test_unknown_scheme_falls_back_to_staggered() {
        assert_eq!(Scheme::from_name("fastest"), Scheme::Staggered);
        assert_eq!(Scheme::from_name(""), Scheme::Staggered);
        assert_eq!(Scheme::default(), Scheme::Staggered);
    }

    #[test]
    fn test_cancel_mode_from_name() {
        assert_eq!(CancelMode::from_name("abort"), CancelMode::Abort);
        assert_eq!(CancelMode::from_name("shorten"), CancelMode::ShortenWait);
        assert_eq!(CancelMode::default(), CancelMode::ShortenWait);
    }

    #[test]
    fn test_scheme_serde_names() {
        assert_eq!(serde_json::to_string(&Scheme::Until).unwrap(), "\"until\"");
        assert_eq!(
            serde_json::to_string(&CancelMode::ShortenWait).unwrap(),
            "\"shorten_wait\""
        );
    }
}
