//! Order documents as they sit in the store.
//!
//! Field names are a stable contract with everything else that reads the
//! collection (exports, the old board), so they are kept exactly as the board
//! has always written them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use stallboard_core::OrderId;
use stallboard_orders::{Menu, OrderLine, OrderSnapshot, OrderStatus};

use crate::store::Document;

/// Stored field names.
pub mod fields {
    pub const ORDER_ID: &str = "訂單編號";
    pub const CONTENT: &str = "品項內容";
    pub const AMOUNT: &str = "金額";
    pub const NOTE: &str = "備註";
    pub const STATUS: &str = "狀態";
    pub const COMPLETED_ITEMS: &str = "completed_items";
    pub const ITEM_PRICES: &str = "item_prices";
    pub const TIMESTAMP: &str = "timestamp";
}

/// Fields rewritten when an order's items change.
const PROGRESS_FIELDS: &[&str] = &[
    fields::CONTENT,
    fields::AMOUNT,
    fields::STATUS,
    fields::COMPLETED_ITEMS,
    fields::ITEM_PRICES,
];

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed order document '{id}': {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("order document '{0}' has an out-of-range timestamp")]
    InvalidTimestamp(String),

    #[error("failed to encode order document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("order document did not encode to an object")]
    NotAnObject,
}

/// One order document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "訂單編號")]
    pub order_id: OrderId,

    /// Remaining line items; stored newline-joined.
    #[serde(rename = "品項內容", with = "newline_joined")]
    pub content: Vec<String>,

    #[serde(rename = "金額")]
    pub amount: i64,

    #[serde(rename = "備註", default)]
    pub note: String,

    #[serde(rename = "狀態")]
    pub status: OrderStatus,

    #[serde(default)]
    pub completed_items: Vec<String>,

    /// Price captured for each remaining line at cart time. Absent on
    /// documents written by older boards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_prices: Option<Vec<i64>>,

    /// Creation time, seconds since the epoch.
    pub timestamp: f64,
}

impl OrderRecord {
    pub fn from_snapshot(snapshot: &OrderSnapshot) -> Self {
        Self {
            order_id: snapshot.id.clone(),
            content: snapshot.lines.iter().map(|l| l.text.clone()).collect(),
            amount: snapshot.amount,
            note: snapshot.note.clone(),
            status: snapshot.status,
            completed_items: snapshot.completed_items.clone(),
            item_prices: Some(snapshot.lines.iter().map(|l| l.price).collect()),
            timestamp: snapshot.created_at.timestamp_micros() as f64 / 1_000_000.0,
        }
    }

    /// Rebuild the domain view. Lines without a captured price are priced
    /// from their text via the menu.
    pub fn into_snapshot(self, menu: &Menu) -> Result<OrderSnapshot, RecordError> {
        let created_at = timestamp_to_utc(self.timestamp)
            .ok_or_else(|| RecordError::InvalidTimestamp(self.order_id.to_string()))?;

        let prices = self
            .item_prices
            .filter(|p| p.len() == self.content.len())
            .unwrap_or_else(|| self.content.iter().map(|t| menu.estimate_price(t)).collect());

        let lines = self
            .content
            .into_iter()
            .zip(prices)
            .map(|(text, price)| OrderLine { text, price })
            .collect();

        Ok(OrderSnapshot {
            id: self.order_id,
            lines,
            amount: self.amount,
            note: self.note,
            status: self.status,
            completed_items: self.completed_items,
            created_at,
        })
    }

    pub fn from_document(id: &str, document: Document) -> Result<Self, RecordError> {
        serde_json::from_value(serde_json::Value::Object(document)).map_err(|source| {
            RecordError::Malformed {
                id: id.to_string(),
                source,
            }
        })
    }

    pub fn to_document(&self) -> Result<Document, RecordError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(RecordError::NotAnObject),
        }
    }

    /// Merge-patch carrying every field that item progress can change.
    pub fn progress_patch(&self) -> Result<Document, RecordError> {
        let mut document = self.to_document()?;
        document.retain(|field, _| PROGRESS_FIELDS.contains(&field.as_str()));
        Ok(document)
    }
}

fn timestamp_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round();
    if micros.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

mod newline_joined {
    use super::*;

    pub fn serialize<S: Serializer>(lines: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&lines.join("\n"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(joined
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }
}
