//! # Domain Types
//!
//! Rows and value types shared by the storage, event and service layers.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Catalog           Sales                    Stock                       │
//! │  ─────────────     ─────────────────────    ──────────────────────────  │
//! │  Product           SaleTransaction          StockRecord (authoritative) │
//! │  Customer          └── SaleLineItem (1..n)  StockMovement (append-only) │
//! │                    SaleStatus               MovementReason              │
//! │                    PaymentMethod            StockReconciliationFlag     │
//! │                                                                         │
//! │  Recommendations                                                        │
//! │  ─────────────────────────────────────                                  │
//! │  PurchasePattern (product, tenant)                                      │
//! │  CoPurchasePattern (product_a < product_b, tenant)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All monetary columns are [`Money`]; all quantities are `i64`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, TaxRate};

// =============================================================================
// Product
// =============================================================================

/// A tenant-scoped catalog entry. Read-only from the sale pipeline's view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub category_id: Option<String>,
    pub cost_price: Money,
    pub selling_price: Money,
    /// Tax rate in basis points (700 = 7%).
    pub tax_rate_bps: u32,
    /// Inactive products cannot be sold.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer that accrues loyalty on attached sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub email: Option<String>,
    pub loyalty_points: i64,
    pub total_spent: Money,
    #[ts(as = "Option<String>")]
    pub last_visit: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    #[default]
    Completed,
    Refunded,
    Cancelled,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer paid. Parsed from the caller's free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mobile,
    StoreCredit,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Mobile,
        PaymentMethod::StoreCredit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
            PaymentMethod::StoreCredit => "store_credit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    /// ```rust
    /// use meridian_core::PaymentMethod;
    ///
    /// assert_eq!("Credit".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
    /// assert!("".parse::<PaymentMethod>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err(ValidationError::required("payment_method")),
            "cash" => Ok(PaymentMethod::Cash),
            "card" | "credit" | "debit" | "credit_card" | "debit_card" => Ok(PaymentMethod::Card),
            "mobile" | "wallet" | "mobile_wallet" => Ok(PaymentMethod::Mobile),
            "store_credit" | "gift_card" => Ok(PaymentMethod::StoreCredit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Sale Transaction
// =============================================================================

/// The record of a completed sale.
///
/// Written once together with its lines; only `status` may change later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleTransaction {
    pub id: String,
    pub tenant_id: String,
    /// Human-readable number, unique per tenant (`TXN-20260301-000042`).
    pub transaction_number: String,
    pub customer_id: Option<String>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleTransaction {
    /// `total == subtotal + tax - discount`.
    pub fn is_balanced(&self) -> bool {
        self.total_amount == self.subtotal + self.tax_amount - self.discount_amount
    }
}

/// One product line of a sale. Price and name are frozen at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// `unit_price × quantity`.
    pub subtotal: Money,
    pub tax_amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock
// =============================================================================

/// On-hand quantity for one (product, tenant, location).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockRecord {
    pub product_id: String,
    pub tenant_id: String,
    pub location_id: String,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

/// Why a stock quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementReason {
    Sale,
    Restock,
    Adjustment,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Sale => "sale",
            MovementReason::Restock => "restock",
            MovementReason::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for MovementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit row for one quantity change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub tenant_id: String,
    pub location_id: String,
    /// Signed delta; negative for sales.
    pub quantity_change: i64,
    pub reason: MovementReason,
    pub old_quantity: i64,
    pub new_quantity: i64,
    /// Transaction id for sale movements.
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// `old + change == new`.
    pub fn is_consistent(&self) -> bool {
        self.old_quantity + self.quantity_change == self.new_quantity
    }
}

/// Category of a failed post-sale deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationKind {
    InsufficientStock,
    RecordNotFound,
    Storage,
}

/// A completed sale whose stock deduction failed and needs an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockReconciliationFlag {
    pub id: String,
    pub tenant_id: String,
    pub transaction_id: String,
    pub kind: ReconciliationKind,
    pub detail: String,
    pub raised_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Recommendation Counters
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchasePattern {
    pub product_id: String,
    pub tenant_id: String,
    /// Cumulative units sold.
    pub purchase_count: i64,
    pub last_purchased_at: DateTime<Utc>,
}

/// Co-occurrence counter for an unordered product pair.
///
/// Stored with `product_a < product_b`; see [`CoPurchasePattern::key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CoPurchasePattern {
    pub tenant_id: String,
    pub product_a: String,
    pub product_b: String,
    pub co_purchase_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl CoPurchasePattern {
    /// Canonical storage order for a pair.
    ///
    /// ```rust
    /// use meridian_core::CoPurchasePattern;
    ///
    /// assert_eq!(CoPurchasePattern::key("b", "a"), ("a", "b"));
    /// assert_eq!(CoPurchasePattern::key("a", "b"), ("a", "b"));
    /// ```
    pub fn key<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
        if x <= y {
            (x, y)
        } else {
            (y, x)
        }
    }

    /// The product paired with `product_id` in this row.
    pub fn partner_of(&self, product_id: &str) -> &str {
        if self.product_a == product_id {
            &self.product_b
        } else {
            &self.product_a
        }
    }
}
