use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stallboard_core::{Aggregate, AggregateRoot, DomainError, DomainResult, OrderId};

use crate::cart::LineItem;

/// Order status lifecycle. `Done` is terminal.
///
/// Serialized with the labels the board has always written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "未完成")]
    Open,
    #[serde(rename = "完成")]
    Done,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "未完成",
            OrderStatus::Done => "完成",
        }
    }
}

/// Remaining (not yet completed) line of an order, with its captured price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub text: String,
    pub price: i64,
}

/// Plain field view of an order, used to move it across the store boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub lines: Vec<OrderLine>,
    pub amount: i64,
    pub note: String,
    pub status: OrderStatus,
    pub completed_items: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate root: Order.
///
/// `lines` holds only what is still to be made; finished items move to
/// `completed_items`, which only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    lines: Vec<OrderLine>,
    amount: i64,
    note: String,
    status: OrderStatus,
    completed_items: Vec<String>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Order {
    /// Turn a finalized cart into a new open order.
    ///
    /// Item notes and the order note are joined with `note_separator`, skipping
    /// empty ones.
    pub fn place(
        id: OrderId,
        items: &[LineItem],
        note: &str,
        note_separator: &str,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("cannot place an order without items"));
        }

        let lines: Vec<OrderLine> = items
            .iter()
            .map(|i| OrderLine {
                text: i.text.clone(),
                price: i.price,
            })
            .collect();
        let amount = lines.iter().map(|l| l.price).sum();
        let note = items
            .iter()
            .map(|i| i.note.trim())
            .chain(std::iter::once(note.trim()))
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(note_separator);

        Ok(Self {
            id,
            lines,
            amount,
            note,
            status: OrderStatus::Open,
            completed_items: Vec::new(),
            created_at,
            version: 0,
        })
    }

    /// Rehydrate from stored fields.
    pub fn from_snapshot(snapshot: OrderSnapshot) -> Self {
        Self {
            id: snapshot.id,
            lines: snapshot.lines,
            amount: snapshot.amount,
            note: snapshot.note,
            status: snapshot.status,
            completed_items: snapshot.completed_items,
            created_at: snapshot.created_at,
            version: 0,
        }
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            id: self.id.clone(),
            lines: self.lines.clone(),
            amount: self.amount,
            note: self.note.clone(),
            status: self.status,
            completed_items: self.completed_items.clone(),
            created_at: self.created_at,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Remaining item texts, in order.
    pub fn content(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn completed_items(&self) -> &[String] {
        &self.completed_items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Business day the order was placed on, in the stall's timezone.
    pub fn business_day(&self, offset: FixedOffset) -> NaiveDate {
        self.created_at.with_timezone(&offset).date_naive()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, OrderStatus::Open)
    }

    /// True once every line has been completed or voided.
    pub fn has_no_remaining_items(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_partially_completed(&self) -> bool {
        !self.completed_items.is_empty()
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CompleteItems (mark a batch of lines as made).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteItems {
    pub order_id: OrderId,
    pub items: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteWhole (close an untouched order in one go).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteWhole {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: VoidItems (drop lines without making them).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidItems {
    pub order_id: OrderId,
    pub items: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    CompleteItems(CompleteItems),
    CompleteWhole(CompleteWhole),
    VoidItems(VoidItems),
}

/// Event: ItemsCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsCompleted {
    pub order_id: OrderId,
    pub items: Vec<String>,
    /// Price of the completed lines, added to the order total.
    pub contribution: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WholeOrderCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholeOrderCompleted {
    pub order_id: OrderId,
    pub items: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemsVoided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsVoided {
    pub order_id: OrderId,
    pub items: Vec<String>,
    /// Price of the voided lines, taken off the order total.
    pub refund: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderClosed {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    ItemsCompleted(ItemsCompleted),
    WholeOrderCompleted(WholeOrderCompleted),
    ItemsVoided(ItemsVoided),
    OrderClosed(OrderClosed),
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::ItemsCompleted(_) => "order.items_completed",
            OrderEvent::WholeOrderCompleted(_) => "order.whole_completed",
            OrderEvent::ItemsVoided(_) => "order.items_voided",
            OrderEvent::OrderClosed(_) => "order.closed",
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::ItemsCompleted(e) => {
                self.remove_lines(&e.items);
                self.completed_items.extend(e.items.iter().cloned());
                self.amount += e.contribution;
            }
            OrderEvent::WholeOrderCompleted(e) => {
                self.lines.clear();
                self.completed_items.extend(e.items.iter().cloned());
            }
            OrderEvent::ItemsVoided(e) => {
                self.remove_lines(&e.items);
                self.amount -= e.refund;
            }
            OrderEvent::OrderClosed(_) => {
                self.status = OrderStatus::Done;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::CompleteItems(cmd) => self.handle_complete_items(cmd),
            OrderCommand::CompleteWhole(cmd) => self.handle_complete_whole(cmd),
            OrderCommand::VoidItems(cmd) => self.handle_void_items(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: &OrderId) -> Result<(), DomainError> {
        if &self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::invariant(format!(
                "order {} is already done",
                self.id
            )));
        }
        Ok(())
    }

    /// Resolve each selected text to a distinct remaining line.
    ///
    /// Selections are matched as a multiset: selecting a text twice consumes two
    /// identical lines.
    fn match_selection(&self, items: &[String]) -> Result<Vec<usize>, DomainError> {
        if items.is_empty() {
            return Err(DomainError::validation("no items selected"));
        }

        let mut taken = vec![false; self.lines.len()];
        let mut matched = Vec::with_capacity(items.len());
        for item in items {
            let idx = self
                .lines
                .iter()
                .enumerate()
                .position(|(i, line)| !taken[i] && &line.text == item)
                .ok_or_else(|| {
                    DomainError::validation(format!(
                        "'{item}' is not a remaining item of order {}",
                        self.id
                    ))
                })?;
            taken[idx] = true;
            matched.push(idx);
        }
        Ok(matched)
    }

    fn price_of(&self, indices: &[usize]) -> i64 {
        indices.iter().map(|&i| self.lines[i].price).sum()
    }

    fn remove_lines(&mut self, items: &[String]) {
        for item in items {
            if let Some(pos) = self.lines.iter().position(|l| &l.text == item) {
                self.lines.remove(pos);
            }
        }
    }

    fn handle_complete_items(&self, cmd: &CompleteItems) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_order_id(&cmd.order_id)?;
        self.ensure_open()?;

        let matched = self.match_selection(&cmd.items)?;
        let mut events = vec![OrderEvent::ItemsCompleted(ItemsCompleted {
            order_id: cmd.order_id.clone(),
            items: cmd.items.clone(),
            contribution: self.price_of(&matched),
            occurred_at: cmd.occurred_at,
        })];

        if matched.len() == self.lines.len() {
            events.push(OrderEvent::OrderClosed(OrderClosed {
                order_id: cmd.order_id.clone(),
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_complete_whole(&self, cmd: &CompleteWhole) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_order_id(&cmd.order_id)?;
        self.ensure_open()?;

        if self.is_partially_completed() {
            return Err(DomainError::invariant(format!(
                "order {} is partially completed; complete the remaining items instead",
                self.id
            )));
        }

        Ok(vec![
            OrderEvent::WholeOrderCompleted(WholeOrderCompleted {
                order_id: cmd.order_id.clone(),
                items: self.lines.iter().map(|l| l.text.clone()).collect(),
                occurred_at: cmd.occurred_at,
            }),
            OrderEvent::OrderClosed(OrderClosed {
                order_id: cmd.order_id.clone(),
                occurred_at: cmd.occurred_at,
            }),
        ])
    }

    fn handle_void_items(&self, cmd: &VoidItems) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_order_id(&cmd.order_id)?;
        self.ensure_open()?;

        let matched = self.match_selection(&cmd.items)?;
        let mut events = vec![OrderEvent::ItemsVoided(ItemsVoided {
            order_id: cmd.order_id.clone(),
            items: cmd.items.clone(),
            refund: self.price_of(&matched),
            occurred_at: cmd.occurred_at,
        })];

        // Finished work stays on the board as a done order.
        if matched.len() == self.lines.len() && self.is_partially_completed() {
            events.push(OrderEvent::OrderClosed(OrderClosed {
                order_id: cmd.order_id.clone(),
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }
}
