//! Order lifecycle engine (application-level orchestration).
//!
//! Every mutating operation follows the same pipeline:
//!
//! ```text
//! Command
//!   ↓
//! 1. Fetch the order document from the store
//!   ↓
//! 2. Rehydrate the `Order` aggregate (pricing legacy lines from the menu)
//!   ↓
//! 3. Handle the command (pure decision logic, produces events)
//!   ↓
//! 4. Apply events and merge-patch the changed fields back in one write
//! ```
//!
//! The store has no revision token, so two sessions acting on the same order
//! inside one polling window can overwrite each other (last write wins).

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use thiserror::Error;

use stallboard_core::{Aggregate, AggregateRoot, Clock, DomainError, OrderId, SystemClock};
use stallboard_orders::{
    CompleteItems, CompleteWhole, DailySummary, LineItem, Menu, Order, OrderCommand, OrderStatus,
    VoidItems,
};

use crate::config::StallConfig;
use crate::record::{OrderRecord, RecordError};
use crate::refresh;
use crate::session::Session;
use crate::store::{Document, OrderStore, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    /// Domain rejection (validation, invariant, bad id).
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("failed to digest order snapshot: {0}")]
    Digest(#[from] serde_json::Error),
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Domain(DomainError::Validation(_)))
    }
}

/// Result of polling the open orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Re-render with these orders.
    Changed(Vec<Order>),
    /// Nothing observable changed since the last render.
    Unchanged,
}

/// Store-backed state machine for the board's orders.
///
/// The engine keeps no order state of its own: every call fetches what it
/// needs, so two engines over the same store see the same board.
#[derive(Debug)]
pub struct OrderLifecycleEngine<S, C = SystemClock> {
    store: S,
    clock: C,
    config: StallConfig,
    offset: FixedOffset,
}

impl<S> OrderLifecycleEngine<S, SystemClock>
where
    S: OrderStore,
{
    pub fn new(store: S, config: StallConfig) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S, C> OrderLifecycleEngine<S, C>
where
    S: OrderStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C, config: StallConfig) -> Self {
        let offset = config.utc_offset().unwrap_or_else(|| {
            tracing::warn!(
                "utc_offset_hours {} out of range; using UTC",
                config.utc_offset_hours
            );
            Utc.fix()
        });
        Self {
            store,
            clock,
            config,
            offset,
        }
    }

    pub fn menu(&self) -> &Menu {
        &self.config.menu
    }

    pub fn config(&self) -> &StallConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Today's business day in the stall's timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Write a new open order for `items`.
    ///
    /// Returns `None` without touching the store when `items` is empty. The
    /// generated order number is not checked for collisions.
    pub fn submit(&self, items: &[LineItem], note: &str) -> Result<Option<OrderId>, EngineError> {
        if items.is_empty() {
            tracing::debug!("Submit with empty cart ignored");
            return Ok(None);
        }

        let now = self.clock.now();
        let order_id = OrderId::from_timestamp(now);
        let order = Order::place(
            order_id.clone(),
            items,
            note,
            &self.config.note_separator,
            now,
        )?;
        let document = OrderRecord::from_snapshot(&order.snapshot()).to_document()?;
        self.store
            .write(&self.config.collection, order_id.as_str(), document)?;

        tracing::info!(
            "Submitted order {} ({} items, total {})",
            order_id,
            items.len(),
            order.amount()
        );
        Ok(Some(order_id))
    }

    /// Submit the session's cart; the cart is cleared only if the write succeeds.
    pub fn submit_cart(&self, session: &mut Session, note: &str) -> Result<Option<OrderId>, EngineError> {
        let submitted = self.submit(session.cart.items(), note)?;
        if submitted.is_some() {
            session.cart.clear();
            session.close_entry();
            session.request_refresh();
        }
        Ok(submitted)
    }

    /// Mark `selected` lines as made; closes the order once nothing remains.
    pub fn complete_items(&self, order_id: &OrderId, selected: &[String]) -> Result<Order, EngineError> {
        let order = self.execute(
            order_id,
            OrderCommand::CompleteItems(CompleteItems {
                order_id: order_id.clone(),
                items: selected.to_vec(),
                occurred_at: self.clock.now(),
            }),
        )?;
        self.persist_progress(&order)?;

        tracing::info!(
            "Completed {} item(s) of order {} (status {}, total {})",
            selected.len(),
            order_id,
            order.status().as_str(),
            order.amount()
        );
        Ok(order)
    }

    /// Close an order nobody has started on yet.
    pub fn complete_whole(&self, order_id: &OrderId) -> Result<Order, EngineError> {
        let order = self.execute(
            order_id,
            OrderCommand::CompleteWhole(CompleteWhole {
                order_id: order_id.clone(),
                occurred_at: self.clock.now(),
            }),
        )?;
        self.persist_progress(&order)?;

        tracing::info!("Completed whole order {} (total {})", order_id, order.amount());
        Ok(order)
    }

    /// Drop `selected` lines without making them.
    ///
    /// Returns the updated order, or `None` if nothing was ever made and the
    /// order was deleted. An order with completed items is closed as done
    /// once its last line is voided, keeping its completed items and total.
    pub fn void_items(&self, order_id: &OrderId, selected: &[String]) -> Result<Option<Order>, EngineError> {
        let order = self.execute(
            order_id,
            OrderCommand::VoidItems(VoidItems {
                order_id: order_id.clone(),
                items: selected.to_vec(),
                occurred_at: self.clock.now(),
            }),
        )?;

        if order.has_no_remaining_items() && !order.is_partially_completed() {
            tracing::info!("Voided every item of order {}; deleting it", order_id);
            self.delete(order_id)?;
            return Ok(None);
        }

        self.persist_progress(&order)?;
        tracing::info!(
            "Voided {} item(s) of order {} (total {})",
            selected.len(),
            order_id,
            order.amount()
        );
        Ok(Some(order))
    }

    /// Remove an order. Deleting an unknown order is not an error.
    pub fn delete(&self, order_id: &OrderId) -> Result<(), EngineError> {
        match self.store.delete(&self.config.collection, order_id.as_str()) {
            Ok(()) => {
                tracing::info!("Deleted order {}", order_id);
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => {
                tracing::debug!("Order {} already gone", order_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every done order not placed on `today`. Returns how many went.
    pub fn purge_stale(&self, today: NaiveDate) -> Result<usize, EngineError> {
        let stale: Vec<OrderId> = self
            .load_all()?
            .into_iter()
            .filter(|o| o.status() == OrderStatus::Done && o.business_day(self.offset) != today)
            .map(|o| o.id().clone())
            .collect();

        for order_id in &stale {
            self.delete(order_id)?;
        }

        if !stale.is_empty() {
            tracing::info!("Purged {} done order(s) from before {}", stale.len(), today);
        }
        Ok(stale.len())
    }

    /// Open orders, oldest first.
    pub fn open_orders(&self) -> Result<Vec<Order>, EngineError> {
        self.orders_with_status(OrderStatus::Open)
    }

    /// Done orders, oldest first.
    pub fn done_orders(&self) -> Result<Vec<Order>, EngineError> {
        self.orders_with_status(OrderStatus::Done)
    }

    /// Revenue and count over the done orders on the board.
    pub fn daily_summary(&self) -> Result<DailySummary, EngineError> {
        Ok(DailySummary::from_orders(&self.done_orders()?))
    }

    /// Poll the open orders and decide whether the session should re-render.
    pub fn refresh(&self, session: &mut Session) -> Result<RefreshOutcome, EngineError> {
        let open: BTreeMap<String, Document> = self
            .store
            .read_all(&self.config.collection)?
            .into_iter()
            .filter(|(_, doc)| is_open_document(doc))
            .collect();

        let (changed, digest) = refresh::changed(session.last_digest(), &open)?;
        if !session.needs_render(changed) {
            tracing::debug!("Open orders unchanged ({})", digest);
            return Ok(RefreshOutcome::Unchanged);
        }

        let mut orders = self.decode_all(open);
        sort_by_age(&mut orders);
        session.mark_rendered(digest);
        Ok(RefreshOutcome::Changed(orders))
    }

    /// The board's "完成" button: complete the ticked lines, or everything
    /// still remaining when nothing is ticked.
    pub fn complete_selected(&self, session: &mut Session, order_id: &OrderId) -> Result<Order, EngineError> {
        let selected = session.take_selection(order_id);
        let result = if !selected.is_empty() {
            self.complete_items(order_id, &selected)
        } else {
            self.load(order_id).and_then(|order| {
                if order.is_partially_completed() {
                    self.complete_items(order_id, &remaining_texts(&order))
                } else {
                    self.complete_whole(order_id)
                }
            })
        };
        session.request_refresh();
        result
    }

    /// The board's "刪除" button: void the ticked lines, or drop everything
    /// still remaining when nothing is ticked.
    ///
    /// An untouched order is deleted outright; one with completed items keeps
    /// them and is closed as done.
    pub fn delete_selected(&self, session: &mut Session, order_id: &OrderId) -> Result<Option<Order>, EngineError> {
        let selected = session.take_selection(order_id);
        let result = if !selected.is_empty() {
            self.void_items(order_id, &selected)
        } else {
            match self.load(order_id) {
                Ok(order) if order.is_open() && order.is_partially_completed() => {
                    self.void_items(order_id, &remaining_texts(&order))
                }
                // Unreadable or missing documents still go.
                _ => self.delete(order_id).map(|()| None),
            }
        };
        session.request_refresh();
        result
    }

    fn execute(&self, order_id: &OrderId, command: OrderCommand) -> Result<Order, EngineError> {
        let mut order = self.load(order_id)?;
        let events = order.handle(&command)?;
        for event in &events {
            tracing::debug!("Applying {} to order {}", event.event_type(), order_id);
            order.apply(event);
        }
        Ok(order)
    }

    fn persist_progress(&self, order: &Order) -> Result<(), EngineError> {
        let snapshot = order.snapshot();
        let patch = OrderRecord::from_snapshot(&snapshot).progress_patch()?;
        match self
            .store
            .update(&self.config.collection, snapshot.id.as_str(), patch)
        {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(EngineError::OrderNotFound(snapshot.id)),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self, order_id: &OrderId) -> Result<Order, EngineError> {
        let mut documents = self.store.read_all(&self.config.collection)?;
        let document = documents
            .remove(order_id.as_str())
            .ok_or_else(|| EngineError::OrderNotFound(order_id.clone()))?;
        self.decode(order_id.as_str(), document)
    }

    fn load_all(&self) -> Result<Vec<Order>, EngineError> {
        let documents = self.store.read_all(&self.config.collection)?;
        Ok(self.decode_all(documents))
    }

    fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>, EngineError> {
        let mut orders: Vec<Order> = self
            .load_all()?
            .into_iter()
            .filter(|o| o.status() == status)
            .collect();
        sort_by_age(&mut orders);
        Ok(orders)
    }

    fn decode(&self, id: &str, document: Document) -> Result<Order, EngineError> {
        let snapshot = OrderRecord::from_document(id, document)?.into_snapshot(self.menu())?;
        Ok(Order::from_snapshot(snapshot))
    }

    /// Decode a batch for display; unreadable documents are logged and skipped
    /// so one bad record does not blank the board.
    fn decode_all(&self, documents: BTreeMap<String, Document>) -> Vec<Order> {
        documents
            .into_iter()
            .filter_map(|(id, document)| match self.decode(&id, document) {
                Ok(order) => Some(order),
                Err(e) => {
                    tracing::warn!("Skipping unreadable order document {}: {}", id, e);
                    None
                }
            })
            .collect()
    }
}

fn is_open_document(document: &Document) -> bool {
    document
        .get(crate::record::fields::STATUS)
        .and_then(|s| s.as_str())
        .is_some_and(|s| s == OrderStatus::Open.as_str())
}

fn remaining_texts(order: &Order) -> Vec<String> {
    order.content().into_iter().map(str::to_string).collect()
}

fn sort_by_age(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use stallboard_core::ManualClock;
    use stallboard_orders::LineItemSpec;

    use crate::record::fields;
    use crate::store::InMemoryOrderStore;

    type TestEngine = OrderLifecycleEngine<Arc<InMemoryOrderStore>, Arc<ManualClock>>;

    fn setup() -> (TestEngine, Arc<InMemoryOrderStore>, Arc<ManualClock>) {
        let store = Arc::new(InMemoryOrderStore::new());
        // 2024-06-01 12:00 in UTC+8.
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 4, 0, 0).unwrap(),
        ));
        let engine = OrderLifecycleEngine::with_clock(store.clone(), clock.clone(), StallConfig::default());
        (engine, store, clock)
    }

    fn priced(engine: &TestEngine, spec: &LineItemSpec) -> LineItem {
        LineItem::build(engine.menu(), spec).unwrap()
    }

    fn plain(engine: &TestEngine, qty: u32) -> LineItem {
        priced(engine, &LineItemSpec::portions("原味雞蛋糕", qty))
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Store whose every call fails, for error propagation.
    struct DownStore;

    impl OrderStore for DownStore {
        fn write(&self, _: &str, _: &str, _: Document) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("permission denied".to_string()))
        }
        fn read_all(&self, _: &str) -> Result<BTreeMap<String, Document>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        fn update(&self, _: &str, _: &str, _: Document) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn submit_writes_one_open_order() {
        let (engine, store, _clock) = setup();
        let id = engine
            .submit(&[plain(&engine, 3)], "")
            .unwrap()
            .expect("order id");

        assert_eq!(store.len("orders"), 1);
        let document = &store.read_all("orders").unwrap()[id.as_str()];
        assert_eq!(document[fields::AMOUNT], json!(180));
        assert_eq!(document[fields::CONTENT], json!("原味雞蛋糕 x3"));
        assert_eq!(document[fields::STATUS], json!("未完成"));
        assert_eq!(document[fields::ORDER_ID], json!(id.as_str()));
    }

    #[test]
    fn submit_id_comes_from_clock() {
        let (engine, _store, clock) = setup();
        let id = engine.submit(&[plain(&engine, 1)], "").unwrap().unwrap();
        assert_eq!(id, OrderId::from_timestamp(clock.now()));
    }

    #[test]
    fn submit_empty_is_a_no_op() {
        let (engine, store, _clock) = setup();
        assert_eq!(engine.submit(&[], "note").unwrap(), None);
        assert!(store.is_empty("orders"));
    }

    #[test]
    fn submit_joins_item_and_order_notes() {
        let (engine, _store, _clock) = setup();
        let items = [
            priced(&engine, &LineItemSpec::portions("原味雞蛋糕", 1).with_note("加糖")),
            plain(&engine, 2),
            priced(
                &engine,
                &LineItemSpec::assorted("內餡雞蛋糕", [("黑糖麻糬", 3)]).with_note("分開裝"),
            ),
        ];
        let id = engine.submit(&items, "外帶").unwrap().unwrap();
        let order = engine.load(&id).unwrap();
        assert_eq!(order.note(), "加糖 / 分開裝 / 外帶");
        assert_eq!(order.amount(), 60 + 120 + 50);
    }

    #[test]
    fn complete_all_items_closes_order() {
        let (engine, _store, _clock) = setup();
        let id = engine.submit(&[plain(&engine, 3)], "").unwrap().unwrap();

        let order = engine.complete_items(&id, &texts(&["原味雞蛋糕 x3"])).unwrap();
        assert_eq!(order.status(), OrderStatus::Done);

        let stored = engine.load(&id).unwrap();
        assert_eq!(stored.status(), OrderStatus::Done);
        assert!(stored.has_no_remaining_items());
        assert_eq!(stored.completed_items(), &texts(&["原味雞蛋糕 x3"]));
        assert_eq!(stored.amount(), 180 + 180);
    }

    #[test]
    fn complete_subset_keeps_remainder_open() {
        let (engine, _store, _clock) = setup();
        let filled = priced(&engine, &LineItemSpec::assorted("內餡雞蛋糕", [("拉絲起司", 3)]));
        let id = engine
            .submit(&[plain(&engine, 1), filled.clone()], "")
            .unwrap()
            .unwrap();

        engine.complete_items(&id, &[filled.text.clone()]).unwrap();

        let stored = engine.load(&id).unwrap();
        assert_eq!(stored.status(), OrderStatus::Open);
        assert_eq!(stored.content(), vec!["原味雞蛋糕 x1"]);
        assert_eq!(stored.completed_items(), &[filled.text]);
        assert_eq!(engine.open_orders().unwrap().len(), 1);
        assert!(engine.done_orders().unwrap().is_empty());
    }

    #[test]
    fn legacy_order_without_prices_uses_estimate() {
        let (engine, store, _clock) = setup();
        let document = json!({
            "訂單編號": "11112222",
            "品項內容": "原味雞蛋糕 x3",
            "金額": 180,
            "備註": "",
            "狀態": "未完成",
            "timestamp": 1_717_214_400.0
        });
        store
            .write("orders", "11112222", document.as_object().cloned().unwrap())
            .unwrap();

        let id: OrderId = "11112222".parse().unwrap();
        let order = engine.complete_items(&id, &texts(&["原味雞蛋糕 x3"])).unwrap();
        assert_eq!(order.amount(), 180 + engine.menu().estimate_price("原味雞蛋糕 x3"));
    }

    #[test]
    fn completion_errors_surface() {
        let (engine, _store, _clock) = setup();
        let missing: OrderId = "00000001".parse().unwrap();
        assert!(matches!(
            engine.complete_items(&missing, &texts(&["原味雞蛋糕 x1"])),
            Err(EngineError::OrderNotFound(ref id)) if id == &missing
        ));

        let id = engine.submit(&[plain(&engine, 1)], "").unwrap().unwrap();
        let err = engine.complete_items(&id, &texts(&["紅豆餅"])).unwrap_err();
        assert!(err.is_validation());

        engine.complete_whole(&id).unwrap();
        assert!(matches!(
            engine.complete_items(&id, &texts(&["原味雞蛋糕 x1"])),
            Err(EngineError::Domain(DomainError::InvariantViolation(_)))
        ));
    }

    #[test]
    fn complete_whole_closes_untouched_order() {
        let (engine, _store, _clock) = setup();
        let id = engine
            .submit(&[plain(&engine, 1), plain(&engine, 2)], "")
            .unwrap()
            .unwrap();
        let order = engine.complete_whole(&id).unwrap();
        assert_eq!(order.status(), OrderStatus::Done);
        assert_eq!(order.amount(), 180);
        assert_eq!(order.completed_items().len(), 2);
        assert_eq!(order.version(), 2);
    }

    #[test]
    fn void_items_shrinks_then_deletes() {
        let (engine, store, _clock) = setup();
        let id = engine
            .submit(&[plain(&engine, 1), plain(&engine, 2)], "")
            .unwrap()
            .unwrap();

        let remaining = engine
            .void_items(&id, &texts(&["原味雞蛋糕 x2"]))
            .unwrap()
            .expect("order still has items");
        assert_eq!(remaining.amount(), 60);
        assert_eq!(engine.load(&id).unwrap().content(), vec!["原味雞蛋糕 x1"]);

        assert_eq!(engine.void_items(&id, &texts(&["原味雞蛋糕 x1"])).unwrap(), None);
        assert!(store.is_empty("orders"));
    }

    #[test]
    fn void_items_closes_started_order_instead_of_deleting() {
        let (engine, store, _clock) = setup();
        let id = engine
            .submit(&[plain(&engine, 1), plain(&engine, 2)], "")
            .unwrap()
            .unwrap();
        engine.complete_items(&id, &texts(&["原味雞蛋糕 x1"])).unwrap();

        let closed = engine
            .void_items(&id, &texts(&["原味雞蛋糕 x2"]))
            .unwrap()
            .expect("completed items are kept");
        assert_eq!(closed.status(), OrderStatus::Done);
        assert_eq!(store.len("orders"), 1);

        let stored = engine.load(&id).unwrap();
        assert_eq!(stored.status(), OrderStatus::Done);
        assert_eq!(stored.completed_items(), &texts(&["原味雞蛋糕 x1"]));
        assert_eq!(stored.amount(), 180 + 60 - 120);
    }

    #[test]
    fn delete_twice_is_fine() {
        let (engine, store, _clock) = setup();
        let id = engine.submit(&[plain(&engine, 1)], "").unwrap().unwrap();
        engine.delete(&id).unwrap();
        engine.delete(&id).unwrap();
        assert!(store.is_empty("orders"));
    }

    #[test]
    fn purge_stale_keeps_only_todays_done_orders() {
        let (engine, _store, clock) = setup();

        let yesterday_done = engine.submit(&[plain(&engine, 1)], "").unwrap().unwrap();
        engine.complete_whole(&yesterday_done).unwrap();
        let yesterday_open = {
            clock.advance(Duration::seconds(5));
            engine.submit(&[plain(&engine, 2)], "").unwrap().unwrap()
        };

        clock.advance(Duration::days(1));
        let today_done = engine.submit(&[plain(&engine, 3)], "").unwrap().unwrap();
        engine.complete_whole(&today_done).unwrap();

        let purged = engine.purge_stale(engine.today()).unwrap();
        assert_eq!(purged, 1);

        let done: Vec<OrderId> = engine.done_orders().unwrap().iter().map(|o| o.id().clone()).collect();
        assert_eq!(done, vec![today_done]);
        // Open orders are never purged, however old.
        assert!(engine.load(&yesterday_open).is_ok());
    }

    #[test]
    fn purge_uses_stall_timezone_for_business_day() {
        let (engine, _store, clock) = setup();
        // 23:30 local on 2024-06-01 (UTC+8).
        clock.set(Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap());
        let late = engine.submit(&[plain(&engine, 1)], "").unwrap().unwrap();
        engine.complete_whole(&late).unwrap();

        let june_first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(engine.purge_stale(june_first).unwrap(), 0);
        assert_eq!(engine.purge_stale(june_first.succ_opt().unwrap()).unwrap(), 1);
    }

    #[test]
    fn daily_summary_totals_done_orders() {
        let (engine, _store, clock) = setup();
        let a = engine.submit(&[plain(&engine, 2)], "").unwrap().unwrap();
        clock.advance(Duration::milliseconds(10));
        let _open = engine.submit(&[plain(&engine, 5)], "").unwrap().unwrap();
        clock.advance(Duration::milliseconds(10));
        let b = engine.submit(&[plain(&engine, 1)], "").unwrap().unwrap();

        engine.complete_whole(&a).unwrap();
        engine.complete_whole(&b).unwrap();

        assert_eq!(
            engine.daily_summary().unwrap(),
            DailySummary { revenue: 180, orders: 2 }
        );
    }

    #[test]
    fn open_orders_are_sorted_oldest_first_and_skip_bad_documents() {
        let (engine, store, clock) = setup();
        let first = engine.submit(&[plain(&engine, 1)], "").unwrap().unwrap();
        clock.advance(Duration::seconds(1));
        let second = engine.submit(&[plain(&engine, 2)], "").unwrap().unwrap();
        store
            .write(
                "orders",
                "broken",
                json!({"狀態": "未完成"}).as_object().cloned().unwrap(),
            )
            .unwrap();

        let ids: Vec<OrderId> = engine.open_orders().unwrap().iter().map(|o| o.id().clone()).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn refresh_renders_first_time_then_only_on_change() {
        let (engine, _store, clock) = setup();
        let mut session = Session::new();

        assert_eq!(engine.refresh(&mut session).unwrap(), RefreshOutcome::Changed(vec![]));
        assert_eq!(engine.refresh(&mut session).unwrap(), RefreshOutcome::Unchanged);

        let id = engine.submit(&[plain(&engine, 1)], "").unwrap().unwrap();
        match engine.refresh(&mut session).unwrap() {
            RefreshOutcome::Changed(orders) => assert_eq!(orders[0].id(), &id),
            other => panic!("expected change, got {other:?}"),
        }
        assert_eq!(engine.refresh(&mut session).unwrap(), RefreshOutcome::Unchanged);

        // Done orders leave the open view.
        clock.advance(Duration::seconds(1));
        engine.complete_whole(&id).unwrap();
        assert_eq!(engine.refresh(&mut session).unwrap(), RefreshOutcome::Changed(vec![]));
    }

    #[test]
    fn forced_refresh_renders_even_without_change() {
        let (engine, _store, _clock) = setup();
        let mut session = Session::new();
        engine.refresh(&mut session).unwrap();

        session.request_refresh();
        assert_eq!(engine.refresh(&mut session).unwrap(), RefreshOutcome::Changed(vec![]));
        assert_eq!(engine.refresh(&mut session).unwrap(), RefreshOutcome::Unchanged);
    }

    #[test]
    fn store_failures_are_reported() {
        let engine = OrderLifecycleEngine::new(DownStore, StallConfig::default());
        let item = LineItem::build(engine.menu(), &LineItemSpec::portions("原味雞蛋糕", 1)).unwrap();
        let id: OrderId = "1".parse().unwrap();

        assert!(matches!(
            engine.submit(&[item], ""),
            Err(EngineError::Store(StoreError::WriteFailed(_)))
        ));
        assert!(matches!(
            engine.complete_whole(&id),
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            engine.delete(&id),
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            engine.refresh(&mut Session::new()),
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn failed_submit_keeps_the_cart() {
        let engine = OrderLifecycleEngine::new(DownStore, StallConfig::default());
        let mut session = Session::new();
        session
            .cart
            .add_line_item(engine.menu(), &LineItemSpec::portions("原味雞蛋糕", 1))
            .unwrap();

        assert!(engine.submit_cart(&mut session, "").is_err());
        assert_eq!(session.cart.len(), 1);
    }
}
