//! Relay configuration.
//!
//! The recognized options mirror what the underlying bus understands:
//! broker endpoints, a consumer-group identity controlling offset
//! bookkeeping, the single topic both produced and consumed, and the policy
//! applied when no committed offset exists. The termination token and poll
//! timeout are application-level knobs layered on top.

use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

/// Reserved payload that signals end-of-session.
///
/// A message whose value exactly equals this literal is a control signal,
/// not a chat line, and is never forwarded to the display.
pub const END_OF_SESSION: &str = "SERVER - END";

/// Default bound on a single poll call.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Policy applied when the consumer group has no committed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetReset {
    /// Replay from the start of the topic.
    #[default]
    Earliest,
    /// Read only messages published from now on.
    Latest,
}

impl OffsetReset {
    /// Wire/config string form (`earliest` / `latest`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for OffsetReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized offset-reset policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized offset reset policy: {0:?} (expected \"earliest\" or \"latest\")")]
pub struct ParseOffsetResetError(String);

impl FromStr for OffsetReset {
    type Err = ParseOffsetResetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            other => Err(ParseOffsetResetError(other.to_string())),
        }
    }
}

/// Configuration for one relay instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Broker connection endpoint(s), `host:port` comma-separated.
    pub bootstrap_servers: String,
    /// Consumer-group identity; offset bookkeeping is shared within a group.
    pub group_id: String,
    /// Channel name both produced to and consumed from.
    pub topic: String,
    /// Read position when the group has no committed offset.
    pub offset_reset: OffsetReset,
    /// Reserved payload detected by the terminal predicate.
    pub termination_token: String,
    /// Upper bound on a single poll call.
    pub poll_timeout: Duration,
}

impl RelayConfig {
    /// Configuration for the given topic and group with default endpoints,
    /// the reserved [`END_OF_SESSION`] token, and the default poll timeout.
    pub fn new(topic: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: "127.0.0.1:9092".to_string(),
            group_id: group_id.into(),
            topic: topic.into(),
            offset_reset: OffsetReset::default(),
            termination_token: END_OF_SESSION.to_string(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_reset_round_trips_through_strings() {
        assert_eq!("earliest".parse(), Ok(OffsetReset::Earliest));
        assert_eq!("latest".parse(), Ok(OffsetReset::Latest));
        assert_eq!(OffsetReset::Latest.to_string(), "latest");
    }

    #[test]
    fn unknown_offset_reset_is_rejected() {
        assert!(OffsetReset::from_str("newest").is_err());
    }

    #[test]
    fn defaults_carry_reserved_token_and_timeout() {
        let config = RelayConfig::new("demo", "group-a");
        assert_eq!(config.termination_token, END_OF_SESSION);
        assert_eq!(config.poll_timeout, DEFAULT_POLL_TIMEOUT);
        assert_eq!(config.offset_reset, OffsetReset::Earliest);
    }
}
