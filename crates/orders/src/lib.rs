//! Order board domain module.
//!
//! This crate contains the stall's business rules: the menu and its price
//! table, the cart builder, the order lifecycle aggregate, and the daily
//! revenue summary. Everything here is deterministic domain logic (no IO, no
//! storage).

pub mod cart;
pub mod menu;
pub mod order;
pub mod summary;

pub use cart::{Cart, LineItem, LineItemSpec, Selection};
pub use menu::{EntryKind, Menu, MenuEntry};
pub use order::{
    CompleteItems, CompleteWhole, ItemsCompleted, ItemsVoided, Order, OrderClosed, OrderCommand,
    OrderEvent, OrderLine, OrderSnapshot, OrderStatus, VoidItems, WholeOrderCompleted,
};
pub use summary::DailySummary;
