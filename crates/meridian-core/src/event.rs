//! # Sale Completed Event
//!
//! The only data contract between the sale service and its downstream
//! handlers. Handlers never read the sale tables; everything they need is
//! carried here.
//!
//! ## Wire Format
//! ```json
//! {
//!   "transactionId": "5f0c…",
//!   "tenantId": "00000000-0000-0000-0000-000000000001",
//!   "items": [{ "productId": "A", "quantity": 2, "price": 100 }],
//!   "totalAmount": 250,
//!   "customerId": "c-17",
//!   "timestamp": "2026-03-01T09:30:00Z"
//! }
//! ```
//! `price` and `totalAmount` are minor currency units. `customerId` is
//! omitted when the sale is anonymous.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CoPurchasePattern, SaleLineItem, SaleTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleEventItem {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price resolved at sale time.
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleCompletedEvent {
    pub transaction_id: String,
    pub tenant_id: String,
    pub items: Vec<SaleEventItem>,
    pub total_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub customer_id: Option<String>,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

impl SaleCompletedEvent {
    /// Builds the event from a committed transaction and its lines.
    pub fn from_sale(transaction: &SaleTransaction, lines: &[SaleLineItem]) -> Self {
        SaleCompletedEvent {
            transaction_id: transaction.id.clone(),
            tenant_id: transaction.tenant_id.clone(),
            items: lines
                .iter()
                .map(|line| SaleEventItem {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
            total_amount: transaction.total_amount,
            customer_id: transaction.customer_id.clone(),
            timestamp: transaction.created_at,
        }
    }

    /// Every unordered pair of distinct products in the sale, each once,
    /// in canonical `(smaller, larger)` order.
    ///
    /// ```rust
    /// use meridian_core::{Money, SaleCompletedEvent, SaleEventItem};
    ///
    /// let item = |id: &str| SaleEventItem {
    ///     product_id: id.into(),
    ///     quantity: 1,
    ///     price: Money::from_cents(100),
    /// };
    /// let event = SaleCompletedEvent {
    ///     transaction_id: "t".into(),
    ///     tenant_id: "x".into(),
    ///     items: vec![item("c"), item("a"), item("b"), item("a")],
    ///     total_amount: Money::from_cents(400),
    ///     customer_id: None,
    ///     timestamp: chrono::Utc::now(),
    /// };
    /// let pairs = event.co_purchase_pairs();
    /// assert_eq!(
    ///     pairs,
    ///     vec![("a".into(), "b".into()), ("a".into(), "c".into()), ("b".into(), "c".into())]
    /// );
    /// ```
    pub fn co_purchase_pairs(&self) -> Vec<(String, String)> {
        let distinct: BTreeSet<&str> = self.items.iter().map(|i| i.product_id.as_str()).collect();
        let ids: Vec<&str> = distinct.into_iter().collect();

        let mut pairs = Vec::with_capacity(ids.len() * ids.len().saturating_sub(1) / 2);
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                let (first, second) = CoPurchasePattern::key(a, b);
                pairs.push((first.to_string(), second.to_string()));
            }
        }
        pairs
    }

    /// Total units across all items.
    pub fn unit_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
