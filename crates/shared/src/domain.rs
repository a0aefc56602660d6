use serde::{Deserialize, Serialize};

use crate::error::ConsentError;

/// Store key holding the visitor's analytics decision.
pub const CONSENT_STORAGE_KEY: &str = "cookie_consent_status";

const GRANTED: &str = "granted";
const DENIED: &str = "denied";

/// Tri-state analytics consent. `Unset` is never written; it is the absence of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    #[default]
    Unset,
    Granted,
    Denied,
}

impl ConsentStatus {
    pub fn from_stored(raw: Option<&str>) -> Result<Self, ConsentError> {
        match raw {
            None => Ok(Self::Unset),
            Some(GRANTED) => Ok(Self::Granted),
            Some(DENIED) => Ok(Self::Denied),
            Some(other) => Err(ConsentError::UnrecognizedStatus(other.to_string())),
        }
    }

    pub fn stored_value(self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::Granted => Some(GRANTED),
            Self::Denied => Some(DENIED),
        }
    }

    /// `Granted` and `Denied` have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

/// A banner action. The only way this crate writes a consent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentChoice {
    Accept,
    Decline,
}

impl ConsentChoice {
    pub fn status(self) -> ConsentStatus {
        match self {
            Self::Accept => ConsentStatus::Granted,
            Self::Decline => ConsentStatus::Denied,
        }
    }

    pub fn stored_value(self) -> &'static str {
        match self {
            Self::Accept => GRANTED,
            Self::Decline => DENIED,
        }
    }

    pub fn enables_analytics(self) -> bool {
        matches!(self, Self::Accept)
    }
}
