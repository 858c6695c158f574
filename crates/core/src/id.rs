//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Number of trailing millisecond digits kept in a generated order number.
const ORDER_ID_DIGITS: usize = 8;

/// Characters the hosted document store refuses in a document key.
const FORBIDDEN_KEY_CHARS: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Identifier of an order (the ticket number shown on the board).
///
/// Generated ids are the trailing digits of the submission timestamp in
/// milliseconds, so they sort by submission time within a ~27 hour window.
/// Uniqueness is not checked; two submissions in the same millisecond collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Derive an order number from a submission timestamp.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis().unsigned_abs().to_string();
        let start = millis.len().saturating_sub(ORDER_ID_DIGITS);
        Self(millis[start..].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<OrderId> for String {
    fn from(value: OrderId) -> Self {
        value.0
    }
}

impl FromStr for OrderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("OrderId: empty"));
        }
        if let Some(c) = trimmed.chars().find(|c| FORBIDDEN_KEY_CHARS.contains(c)) {
            return Err(DomainError::invalid_id(format!(
                "OrderId: forbidden character '{c}' in '{trimmed}'"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}
