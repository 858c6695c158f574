//! Per-session board state.
//!
//! Everything one staff terminal remembers between engine calls lives here and
//! is passed into the engine explicitly.

use std::collections::HashMap;

use stallboard_core::OrderId;
use stallboard_orders::Cart;

use crate::refresh::Digest;

#[derive(Debug, Default)]
pub struct Session {
    /// Items staged for the next submission.
    pub cart: Cart,
    /// Menu entry currently being configured, if its picker is open.
    pending_entry: Option<String>,
    /// Item texts ticked per open order, as a multiset.
    selections: HashMap<OrderId, Vec<String>>,
    last_digest: Option<Digest>,
    rendered_once: bool,
    force_refresh: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_entry(&mut self, entry: impl Into<String>) {
        self.pending_entry = Some(entry.into());
    }

    pub fn pending_entry(&self) -> Option<&str> {
        self.pending_entry.as_deref()
    }

    pub fn close_entry(&mut self) {
        self.pending_entry = None;
    }

    /// Tick one line of an order. Ticking the same text again selects another
    /// identical line.
    pub fn select_item(&mut self, order_id: &OrderId, text: impl Into<String>) {
        self.selections
            .entry(order_id.clone())
            .or_default()
            .push(text.into());
    }

    /// Untick one occurrence of `text`. Returns false if it was not ticked.
    pub fn deselect_item(&mut self, order_id: &OrderId, text: &str) -> bool {
        let Some(selected) = self.selections.get_mut(order_id) else {
            return false;
        };
        let Some(pos) = selected.iter().position(|t| t == text) else {
            return false;
        };
        selected.remove(pos);
        if selected.is_empty() {
            self.selections.remove(order_id);
        }
        true
    }

    pub fn selected(&self, order_id: &OrderId) -> &[String] {
        self.selections
            .get(order_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Remove and return the ticks for an order (an action consumed them).
    pub fn take_selection(&mut self, order_id: &OrderId) -> Vec<String> {
        self.selections.remove(order_id).unwrap_or_default()
    }

    pub fn clear_selections(&mut self) {
        self.selections.clear();
    }

    /// Force the next refresh to re-render even if nothing changed.
    pub fn request_refresh(&mut self) {
        self.force_refresh = true;
    }

    pub fn last_digest(&self) -> Option<&Digest> {
        self.last_digest.as_ref()
    }

    pub(crate) fn needs_render(&self, changed: bool) -> bool {
        !self.rendered_once || self.force_refresh || changed
    }

    pub(crate) fn mark_rendered(&mut self, digest: Digest) {
        self.rendered_once = true;
        self.force_refresh = false;
        self.last_digest = Some(digest);
    }
}
