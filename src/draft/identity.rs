use std::fmt;

use derive_deref::Deref;
use serde::{Deserialize, Serialize};

/// Durable server-side handle of a persisted draft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftToken(String);

impl DraftToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DraftToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Whether the draft has been persisted yet.
///
/// `Anonymous -> Identified` happens at most once, on the first successful
/// create. Nothing in this crate ever goes back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveIdentity {
    #[default]
    Anonymous,
    Identified(DraftToken),
}

impl SaveIdentity {
    pub fn from_existing(token: Option<DraftToken>) -> Self {
        match token {
            Some(token) => Self::Identified(token),
            None => Self::Anonymous,
        }
    }

    pub fn token(&self) -> Option<&DraftToken> {
        match self {
            Self::Anonymous => None,
            Self::Identified(token) => Some(token),
        }
    }

    pub fn is_identified(&self) -> bool {
        matches!(self, Self::Identified(_))
    }

    /// Records the token issued by a successful create.
    ///
    /// Returns `false` and keeps the existing token if already identified.
    pub(crate) fn identify(&mut self, token: DraftToken) -> bool {
        match self {
            Self::Anonymous => {
                *self = Self::Identified(token);
                true
            }
            Self::Identified(_) => false,
        }
    }
}
