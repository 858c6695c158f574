//! Cart builder: line items staged on the counter before submission.

use serde::{Deserialize, Serialize};

use stallboard_core::{DomainError, DomainResult};

use crate::menu::{EntryKind, Menu, MenuEntry};

/// Marker placed between an item and its note in the display text.
const NOTE_MARKER: &str = " - 備註: ";

/// How the customer filled a menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Number of portions of a per-unit entry.
    Quantity(u32),
    /// Flavor counts for an assorted box, in any order.
    Flavors(Vec<(String, u32)>),
}

/// What staff picked for one line, before validation and pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemSpec {
    pub entry: String,
    pub selection: Selection,
    #[serde(default)]
    pub note: String,
}

impl LineItemSpec {
    pub fn portions(entry: impl Into<String>, quantity: u32) -> Self {
        Self {
            entry: entry.into(),
            selection: Selection::Quantity(quantity),
            note: String::new(),
        }
    }

    pub fn assorted<F, S>(entry: impl Into<String>, flavors: F) -> Self
    where
        F: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            entry: entry.into(),
            selection: Selection::Flavors(
                flavors.into_iter().map(|(f, n)| (f.into(), n)).collect(),
            ),
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// A priced, display-ready line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub text: String,
    pub price: i64,
    #[serde(default)]
    pub note: String,
}

impl LineItem {
    /// Validate `spec` against the menu and price it.
    pub fn build(menu: &Menu, spec: &LineItemSpec) -> DomainResult<Self> {
        let entry = menu.entry(&spec.entry).ok_or_else(|| {
            DomainError::validation(format!("'{}' is not on the menu", spec.entry))
        })?;

        let (mut text, price) = match (&entry.kind, &spec.selection) {
            (
                EntryKind::PerUnit {
                    unit_price,
                    max_quantity,
                },
                Selection::Quantity(quantity),
            ) => {
                if *quantity == 0 || quantity > max_quantity {
                    return Err(DomainError::validation(format!(
                        "{} quantity must be between 1 and {max_quantity}, got {quantity}",
                        entry.name
                    )));
                }
                let price = unit_price.checked_mul(i64::from(*quantity)).ok_or_else(|| {
                    DomainError::validation(format!(
                        "{} x{quantity} is too expensive to price",
                        entry.name
                    ))
                })?;
                (format!("{} x{quantity}", entry.name), price)
            }
            (
                EntryKind::Assorted {
                    price,
                    required_selections,
                    suffix,
                },
                Selection::Flavors(picked),
            ) => {
                let counts = tally_flavors(menu, picked)?;
                let total: u32 = counts.iter().map(|(_, n)| n).sum();
                if total != *required_selections {
                    return Err(DomainError::validation(format!(
                        "{} requires exactly {required_selections} selections, got {total}",
                        entry.name
                    )));
                }
                (assorted_text(entry, &counts, suffix.as_deref()), *price)
            }
            (EntryKind::PerUnit { .. }, Selection::Flavors(_)) => {
                return Err(DomainError::validation(format!(
                    "{} is sold by quantity, not by flavor",
                    entry.name
                )));
            }
            (EntryKind::Assorted { .. }, Selection::Quantity(_)) => {
                return Err(DomainError::validation(format!(
                    "{} must be filled with flavors",
                    entry.name
                )));
            }
        };

        let note = spec.note.trim().to_string();
        // Order content is stored one item per line.
        if note.contains(['\n', '\r']) {
            return Err(DomainError::validation("item note must fit on one line"));
        }
        if !note.is_empty() {
            text.push_str(NOTE_MARKER);
            text.push_str(&note);
        }

        Ok(Self { text, price, note })
    }
}

/// Sum picked counts per menu flavor, in menu order.
fn tally_flavors<'m>(menu: &'m Menu, picked: &[(String, u32)]) -> DomainResult<Vec<(&'m str, u32)>> {
    if let Some((unknown, _)) = picked.iter().find(|(f, _)| !menu.flavors().contains(f)) {
        return Err(DomainError::validation(format!("unknown flavor '{unknown}'")));
    }

    Ok(menu
        .flavors()
        .iter()
        .map(|flavor| {
            let count = picked
                .iter()
                .filter(|(f, _)| f == flavor)
                .map(|(_, n)| *n)
                .sum();
            (flavor.as_str(), count)
        })
        .collect())
}

fn assorted_text(entry: &MenuEntry, counts: &[(&str, u32)], suffix: Option<&str>) -> String {
    let mut parts: Vec<String> = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(flavor, n)| format!("{flavor}x{n}"))
        .collect();
    if let Some(suffix) = suffix {
        parts.push(suffix.to_string());
    }
    format!("{} {}", entry.name, parts.join(", "))
}

/// Client-local accumulation of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and price `spec`, then append it.
    ///
    /// On error the cart is left untouched.
    pub fn add_line_item(&mut self, menu: &Menu, spec: &LineItemSpec) -> DomainResult<LineItem> {
        let item = LineItem::build(menu, spec)?;
        self.items.push(item.clone());
        Ok(item)
    }

    /// Drop the most recently added item, if any.
    pub fn remove_last(&mut self) -> Option<LineItem> {
        self.items.pop()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> i64 {
        self.items.iter().map(|i| i.price).sum()
    }
}
