//! Process-lifetime identity of a worker instance.

use super::ParseInstanceIdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity stamped on tasks an instance owns.
///
/// Generated once at process start and passed explicitly to every claim and
/// terminal commit. Rendered as a hyphenated UUID when persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generates a fresh random identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses the persisted text form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseInstanceIdError`] when the value is not a UUID.
    pub fn parse(value: &str) -> Result<Self, ParseInstanceIdError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|err| ParseInstanceIdError {
                value: value.to_owned(),
                reason: err.to_string(),
            })
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the persisted text form.
    #[must_use]
    pub fn to_persisted(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
