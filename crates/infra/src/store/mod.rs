//! Order store boundary.
//!
//! The board talks to a hosted document store: one collection of order
//! documents keyed by order number, fetched whole and filtered client-side.
//! This module defines that contract without assuming any transport.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryOrderStore;
pub use r#trait::{Document, OrderStore, StoreError};
