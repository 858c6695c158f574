//! Daily revenue summary over finished orders.

use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Sum of the totals of all done orders.
    pub revenue: i64,
    /// Number of done orders.
    pub orders: usize,
}

impl DailySummary {
    /// Summarize the done orders in `orders`; open orders are ignored.
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        orders
            .into_iter()
            .filter(|o| o.status() == OrderStatus::Done)
            .fold(Self::default(), |acc, o| Self {
                revenue: acc.revenue + o.amount(),
                orders: acc.orders + 1,
            })
    }
}
