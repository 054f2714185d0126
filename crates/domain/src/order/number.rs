//! Human-readable order numbers.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order number shown to shoppers, e.g. `FC-202610482913`.
///
/// Generated numbers are random within a month; uniqueness is enforced by
/// the store when the number is reserved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    const SUFFIX_SPACE: u128 = 1_000_000;

    /// Generates `<prefix>-<YYYY><MM><6-digit suffix>` for the month of `now`.
    pub fn generate(prefix: &str, now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().as_u128() % Self::SUFFIX_SPACE;
        Self(format!(
            "{}-{:04}{:02}{:06}",
            prefix,
            now.year(),
            now.month(),
            suffix
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
