//! Menu and price table.

use serde::{Deserialize, Serialize};

use stallboard_core::{DomainError, DomainResult};

/// Default per-order cap on single-flavor portions.
pub const DEFAULT_MAX_QUANTITY: u32 = 20;

/// Default number of fillings in an assorted box.
pub const DEFAULT_REQUIRED_SELECTIONS: u32 = 3;

/// Highest price a single line item may reach.
pub const MAX_LINE_PRICE: i64 = 1_000_000;

/// How a menu entry is ordered and priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    /// Sold by the portion: price = `unit_price` × quantity.
    PerUnit {
        unit_price: i64,
        #[serde(default = "default_max_quantity")]
        max_quantity: u32,
    },
    /// Fixed-price box that must be filled with exactly `required_selections` flavors.
    Assorted {
        price: i64,
        #[serde(default = "default_required_selections")]
        required_selections: u32,
        /// Fixed text appended after the flavor list (e.g. the plain cakes bundled in).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffix: Option<String>,
    },
}

fn default_max_quantity() -> u32 {
    DEFAULT_MAX_QUANTITY
}

fn default_required_selections() -> u32 {
    DEFAULT_REQUIRED_SELECTIONS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub name: String,
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl MenuEntry {
    pub fn per_unit(name: impl Into<String>, unit_price: i64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::PerUnit {
                unit_price,
                max_quantity: DEFAULT_MAX_QUANTITY,
            },
        }
    }

    pub fn assorted(name: impl Into<String>, price: i64, suffix: Option<&str>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Assorted {
                price,
                required_selections: DEFAULT_REQUIRED_SELECTIONS,
                suffix: suffix.map(str::to_string),
            },
        }
    }

    /// Listed price: the unit price for portions, the box price otherwise.
    pub fn base_price(&self) -> i64 {
        match self.kind {
            EntryKind::PerUnit { unit_price, .. } => unit_price,
            EntryKind::Assorted { price, .. } => price,
        }
    }

    /// Most a single line of this entry can cost; `None` on overflow.
    pub fn max_line_price(&self) -> Option<i64> {
        match self.kind {
            EntryKind::PerUnit {
                unit_price,
                max_quantity,
            } => unit_price.checked_mul(i64::from(max_quantity)),
            EntryKind::Assorted { price, .. } => Some(price),
        }
    }

    fn has_line_break(&self) -> bool {
        let suffix = match &self.kind {
            EntryKind::Assorted { suffix, .. } => suffix.as_deref(),
            EntryKind::PerUnit { .. } => None,
        };
        std::iter::once(self.name.as_str())
            .chain(suffix)
            .any(|text| text.contains(['\n', '\r']))
    }
}

/// The stall's menu: ordered entries plus the flavors boxes are filled with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub entries: Vec<MenuEntry>,
    pub flavors: Vec<String>,
}

impl Default for Menu {
    fn default() -> Self {
        Self {
            entries: vec![
                MenuEntry::assorted("特價綜合雞蛋糕", 70, Some("原味x3")),
                MenuEntry::assorted("內餡雞蛋糕", 50, None),
                MenuEntry::per_unit("原味雞蛋糕", 60),
            ],
            flavors: vec![
                "拉絲起司".to_string(),
                "奧利奧 Oreo".to_string(),
                "黑糖麻糬".to_string(),
            ],
        }
    }
}

impl Menu {
    pub fn new(entries: Vec<MenuEntry>, flavors: Vec<String>) -> DomainResult<Self> {
        let menu = Self { entries, flavors };
        menu.validate()?;
        Ok(menu)
    }

    /// Check the menu is usable: non-empty, unique names, positive prices.
    pub fn validate(&self) -> DomainResult<()> {
        if self.entries.is_empty() {
            return Err(DomainError::validation("menu has no entries"));
        }

        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "menu entry {idx} has an empty name"
                )));
            }
            if self.entries[..idx].iter().any(|e| e.name == entry.name) {
                return Err(DomainError::validation(format!(
                    "duplicate menu entry '{}'",
                    entry.name
                )));
            }
            if entry.has_line_break() {
                return Err(DomainError::validation(format!(
                    "menu entry {idx} has a line break in its text"
                )));
            }
            if entry.base_price() <= 0 {
                return Err(DomainError::validation(format!(
                    "menu entry '{}' must have a positive price",
                    entry.name
                )));
            }
            if entry.max_line_price().is_none_or(|p| p > MAX_LINE_PRICE) {
                return Err(DomainError::validation(format!(
                    "menu entry '{}' can exceed the line price limit of {MAX_LINE_PRICE}",
                    entry.name
                )));
            }
            match entry.kind {
                EntryKind::PerUnit { max_quantity, .. } if max_quantity == 0 => {
                    return Err(DomainError::validation(format!(
                        "menu entry '{}' must allow at least one portion",
                        entry.name
                    )));
                }
                EntryKind::Assorted {
                    required_selections,
                    ..
                } if required_selections == 0 => {
                    return Err(DomainError::validation(format!(
                        "menu entry '{}' must require at least one selection",
                        entry.name
                    )));
                }
                EntryKind::Assorted { .. } if self.flavors.is_empty() => {
                    return Err(DomainError::validation(format!(
                        "menu entry '{}' needs flavors but none are listed",
                        entry.name
                    )));
                }
                _ => {}
            }
        }

        if let Some(flavor) = self.flavors.iter().find(|f| f.contains(['\n', '\r'])) {
            return Err(DomainError::validation(format!(
                "flavor {flavor:?} has a line break"
            )));
        }

        Ok(())
    }

    pub fn entry(&self, name: &str) -> Option<&MenuEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn flavors(&self) -> &[String] {
        &self.flavors
    }

    /// Entry-level base price: the cheapest listed price.
    pub fn base_price(&self) -> i64 {
        self.entries
            .iter()
            .map(MenuEntry::base_price)
            .min()
            .unwrap_or(0)
    }

    /// Estimate the price of a line item from its display text.
    ///
    /// The longest menu name that prefixes `text` wins. Portions read their
    /// quantity from the `x{n}` right after the name (1 when absent). Text that
    /// matches no entry is priced at [`Menu::base_price`].
    pub fn estimate_price(&self, text: &str) -> i64 {
        let matched = self
            .entries
            .iter()
            .filter(|e| text.starts_with(e.name.as_str()))
            .max_by_key(|e| e.name.len());

        let Some(entry) = matched else {
            return self.base_price();
        };

        match entry.kind {
            EntryKind::PerUnit { unit_price, .. } => {
                let rest = &text[entry.name.len()..];
                unit_price
                    .checked_mul(i64::from(parse_quantity(rest).unwrap_or(1)))
                    .unwrap_or_else(|| self.base_price())
            }
            EntryKind::Assorted { price, .. } => price,
        }
    }
}

/// Reads `x{n}` (after optional whitespace) from the start of `rest`.
fn parse_quantity(rest: &str) -> Option<u32> {
    let digits: String = rest
        .trim_start()
        .strip_prefix('x')?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_menu_is_valid() {
        let menu = Menu::default();
        menu.validate().unwrap();
        assert_eq!(menu.entries().len(), 3);
        assert_eq!(menu.flavors().len(), 3);
        assert_eq!(menu.base_price(), 50);
    }

    #[test]
    fn estimate_multiplies_portion_quantity() {
        let menu = Menu::default();
        assert_eq!(menu.estimate_price("原味雞蛋糕 x3"), 180);
        assert_eq!(menu.estimate_price("原味雞蛋糕 x12 - 備註: 不要太焦"), 720);
        assert_eq!(menu.estimate_price("原味雞蛋糕"), 60);
    }

    #[test]
    fn estimate_uses_box_price_for_assorted_entries() {
        let menu = Menu::default();
        assert_eq!(
            menu.estimate_price("特價綜合雞蛋糕 拉絲起司x2, 黑糖麻糬x1, 原味x3"),
            70
        );
        assert_eq!(menu.estimate_price("內餡雞蛋糕 奧利奧 Oreox3"), 50);
    }

    #[test]
    fn estimate_falls_back_to_base_price() {
        let menu = Menu::default();
        assert_eq!(menu.estimate_price("紅豆餅 x2"), 50);
        assert_eq!(menu.estimate_price(""), 50);
    }

    #[test]
    fn longest_prefix_wins() {
        let menu = Menu::new(
            vec![
                MenuEntry::per_unit("雞蛋糕", 10),
                MenuEntry::per_unit("雞蛋糕禮盒", 200),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(menu.estimate_price("雞蛋糕禮盒 x2"), 400);
        assert_eq!(menu.estimate_price("雞蛋糕 x2"), 20);
    }

    #[test]
    fn validate_rejects_broken_menus() {
        assert!(matches!(
            Menu::new(vec![], vec![]),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Menu::new(
                vec![MenuEntry::per_unit("a", 1), MenuEntry::per_unit("a", 2)],
                vec![]
            ),
            Err(DomainError::Validation(msg)) if msg.contains("duplicate")
        ));
        assert!(matches!(
            Menu::new(vec![MenuEntry::per_unit("a", 0)], vec![]),
            Err(DomainError::Validation(msg)) if msg.contains("positive price")
        ));
        assert!(matches!(
            Menu::new(vec![MenuEntry::assorted("box", 50, None)], vec![]),
            Err(DomainError::Validation(msg)) if msg.contains("needs flavors")
        ));
    }

    #[test]
    fn validate_rejects_line_breaks_and_oversized_prices() {
        assert!(matches!(
            Menu::new(vec![MenuEntry::per_unit("原味\n雞蛋糕", 60)], vec![]),
            Err(DomainError::Validation(msg)) if msg.contains("line break")
        ));
        assert!(matches!(
            Menu::new(
                vec![MenuEntry::assorted("box", 50, Some("原味x3\n"))],
                vec!["起司".to_string()]
            ),
            Err(DomainError::Validation(msg)) if msg.contains("line break")
        ));
        assert!(matches!(
            Menu::new(
                vec![MenuEntry::assorted("box", 50, None)],
                vec!["起司\r".to_string()]
            ),
            Err(DomainError::Validation(msg)) if msg.contains("line break")
        ));
        assert!(matches!(
            Menu::new(vec![MenuEntry::per_unit("a", i64::MAX)], vec![]),
            Err(DomainError::Validation(msg)) if msg.contains("line price limit")
        ));
        // 20 portions at 60_000 is over the per-line limit.
        assert!(Menu::new(vec![MenuEntry::per_unit("a", 60_000)], vec![]).is_err());
        assert!(Menu::new(vec![MenuEntry::per_unit("a", 50_000)], vec![]).is_ok());
    }

    #[test]
    fn overflowing_estimate_falls_back_to_base_price() {
        let menu = Menu {
            entries: vec![MenuEntry::per_unit("a", i64::MAX / 2)],
            flavors: vec![],
        };
        assert_eq!(menu.estimate_price("a x3"), i64::MAX / 2);
    }

    #[test]
    fn menu_deserializes_with_defaults() {
        let json = r#"{
            "entries": [
                {"name": "原味雞蛋糕", "kind": "per_unit", "unit_price": 60},
                {"name": "內餡雞蛋糕", "kind": "assorted", "price": 50}
            ],
            "flavors": ["拉絲起司"]
        }"#;
        let menu: Menu = serde_json::from_str(json).unwrap();
        assert_eq!(
            menu.entry("原味雞蛋糕").unwrap().kind,
            EntryKind::PerUnit {
                unit_price: 60,
                max_quantity: DEFAULT_MAX_QUANTITY
            }
        );
        assert_eq!(
            menu.entry("內餡雞蛋糕").unwrap().kind,
            EntryKind::Assorted {
                price: 50,
                required_selections: DEFAULT_REQUIRED_SELECTIONS,
                suffix: None
            }
        );
    }
}
