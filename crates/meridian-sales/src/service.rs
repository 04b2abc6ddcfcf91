//! # Sale Transaction Service
//!
//! Turns a cart into a committed sale and announces it.
//!
//! ## Pipeline
//! ```text
//! CreateSaleInput
//!      │ validate (no I/O)
//!      ▼
//! BEGIN ─────────────────────────────────────────────────────────────┐
//!      │ number          SaleRepository::next_transaction_number_in   │
//!      │                 (first statement: takes the write lock)      │
//!      │ customer        CustomerRepository::find_in                  │
//!      │ products        ProductRepository::find_active_in            │
//!      │ availability    StockLedger::available_quantity_in           │
//!      │ totals          pricing::compute_totals                      │
//!      │ insert          transaction row + one row per line           │
//!      │ loyalty         CustomerRepository::accrue_loyalty_in       │
//! COMMIT ────────────────────────────────────────────────────────────┘
//!      │
//!      ▼
//! Dispatcher::publish(SaleCompleted)   ── stock deduction happens there
//! ```
//!
//! Any error before COMMIT drops the transaction: no rows, no event.

use chrono::Utc;
use meridian_core::pricing::{compute_totals, loyalty_points_for};
use meridian_core::validation::{
    validate_notes, validate_price, validate_quantity_within, validate_required,
};
use meridian_core::{
    Money, PaymentMethod, PricedLine, Product, SaleCompletedEvent, SaleLineItem, SaleStatus,
    SaleTransaction, TaxPolicy, ValidationError, DEFAULT_LOCATION, MAX_ITEM_QUANTITY,
    MAX_SALE_LINES,
};
use meridian_db::{CustomerRepository, Database, ProductRepository, SaleRepository, StockLedger};
use meridian_events::{Dispatcher, FanOut};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SaleError, SaleResult};

// =============================================================================
// Input
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineInput {
    pub product_id: String,
    pub quantity: i64,
}

/// A checkout request.
///
/// ```rust
/// use meridian_sales::CreateSaleInput;
///
/// let input = CreateSaleInput::new("tenant-1", "cash")
///     .item("espresso", 2)
///     .item("croissant", 1)
///     .customer("c-42");
/// assert_eq!(input.items.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleInput {
    pub tenant_id: String,
    pub items: Vec<SaleLineInput>,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Free-form; parsed into a [`PaymentMethod`].
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Minor units. Absent means no discount.
    #[serde(default)]
    pub discount: Option<Money>,
}

impl CreateSaleInput {
    pub fn new(tenant_id: impl Into<String>, payment_method: impl Into<String>) -> Self {
        CreateSaleInput {
            tenant_id: tenant_id.into(),
            items: Vec::new(),
            customer_id: None,
            payment_method: payment_method.into(),
            notes: None,
            discount: None,
        }
    }

    pub fn item(mut self, product_id: impl Into<String>, quantity: i64) -> Self {
        self.items.push(SaleLineInput {
            product_id: product_id.into(),
            quantity,
        });
        self
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }
}

// =============================================================================
// Output
// =============================================================================

/// A persisted sale with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSale {
    pub transaction: SaleTransaction,
    pub lines: Vec<SaleLineItem>,
}

impl CompletedSale {
    /// The `sale_completed` payload for this sale.
    pub fn event(&self) -> SaleCompletedEvent {
        SaleCompletedEvent::from_sale(&self.transaction, &self.lines)
    }
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleSettings {
    pub tax_policy: TaxPolicy,
    /// Location whose stock is checked before the sale is recorded.
    pub location_id: String,
    pub max_item_quantity: i64,
}

impl Default for SaleSettings {
    fn default() -> Self {
        SaleSettings {
            tax_policy: TaxPolicy::default(),
            location_id: DEFAULT_LOCATION.to_string(),
            max_item_quantity: MAX_ITEM_QUANTITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
    dispatcher: Dispatcher,
    settings: SaleSettings,
}

impl SaleService {
    pub fn new(db: Database, dispatcher: Dispatcher, settings: SaleSettings) -> Self {
        SaleService {
            db,
            dispatcher,
            settings,
        }
    }

    pub fn settings(&self) -> &SaleSettings {
        &self.settings
    }

    /// Records a sale and publishes `sale_completed`.
    ///
    /// Stock is checked but not deducted here; the inventory handler deducts
    /// it after the event is published. Handler outcomes never affect the
    /// result.
    ///
    /// ## Errors
    /// * `SaleError::Validation` - malformed input or a discount larger than
    ///   subtotal + tax
    /// * `SaleError::NotFound` - unknown or inactive product, unknown customer
    /// * `SaleError::InsufficientStock` - requested more than is on hand
    /// * `SaleError::Persistence` - the database failed
    pub async fn create_sale(&self, input: CreateSaleInput) -> SaleResult<CompletedSale> {
        let (sale, _fan_out) = self.create_sale_tracked(input).await?;
        Ok(sale)
    }

    /// [`create_sale`](Self::create_sale), also returning the handle on the
    /// handler tasks so callers can wait for stock deduction.
    pub async fn create_sale_tracked(
        &self,
        input: CreateSaleInput,
    ) -> SaleResult<(CompletedSale, FanOut)> {
        debug!(
            tenant_id = %input.tenant_id,
            items = input.items.len(),
            "create_sale"
        );

        let payment_method = self.validate(&input)?;
        let discount = input.discount.unwrap_or_default();
        let tenant_id = input.tenant_id.as_str();

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        // A write must come first: a deferred transaction that reads and then
        // writes after another connection committed gets SQLITE_BUSY at once.
        let transaction_number =
            SaleRepository::next_transaction_number_in(&mut tx, tenant_id, now).await?;

        let customer = match input.customer_id.as_deref() {
            Some(customer_id) => Some(
                CustomerRepository::find_in(&mut tx, tenant_id, customer_id)
                    .await?
                    .ok_or_else(|| SaleError::not_found("Customer", customer_id))?,
            ),
            None => None,
        };

        // Resolve each distinct product once, summing quantities so a
        // product listed on two lines is checked against its combined need.
        let mut products: HashMap<&str, Product> = HashMap::new();
        let mut requested: Vec<(&str, i64)> = Vec::new();
        for item in &input.items {
            let product_id = item.product_id.as_str();
            if !products.contains_key(product_id) {
                let product = ProductRepository::find_active_in(&mut tx, tenant_id, product_id)
                    .await?
                    .ok_or_else(|| SaleError::not_found("Product", product_id))?;
                products.insert(product_id, product);
                requested.push((product_id, 0));
            }
            if let Some(entry) = requested.iter_mut().find(|(id, _)| *id == product_id) {
                entry.1 += item.quantity;
            }
        }

        for (product_id, quantity) in &requested {
            let available = StockLedger::available_quantity_in(
                &mut tx,
                product_id,
                tenant_id,
                Some(self.settings.location_id.as_str()),
            )
            .await?;

            if *quantity > available {
                let product_name = products
                    .get(product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                warn!(
                    product_id,
                    requested = quantity,
                    available,
                    "Sale rejected: insufficient stock"
                );
                return Err(SaleError::InsufficientStock {
                    product_name,
                    product_id: product_id.to_string(),
                    requested: *quantity,
                    available,
                });
            }
        }

        let mut priced = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = products
                .get(item.product_id.as_str())
                .ok_or_else(|| SaleError::not_found("Product", item.product_id.as_str()))?;
            priced.push(PricedLine::new(
                &product.id,
                &product.name,
                item.quantity,
                product.selling_price,
                product.tax_rate(),
            ));
        }

        let totals = compute_totals(&priced, self.settings.tax_policy, discount)?;

        let transaction = SaleTransaction {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            transaction_number,
            customer_id: customer.as_ref().map(|c| c.id.clone()),
            subtotal: totals.subtotal,
            tax_amount: totals.tax,
            discount_amount: totals.discount,
            total_amount: totals.total,
            payment_method,
            status: SaleStatus::Completed,
            notes: input.notes.clone(),
            created_at: now,
        };
        SaleRepository::insert_transaction_in(&mut tx, &transaction).await?;

        let lines: Vec<SaleLineItem> = priced
            .iter()
            .zip(&totals.line_taxes)
            .map(|(line, tax)| SaleLineItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction.id.clone(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal(),
                tax_amount: *tax,
                created_at: now,
            })
            .collect();
        for line in &lines {
            SaleRepository::insert_line_in(&mut tx, line).await?;
        }

        if let Some(customer) = &customer {
            CustomerRepository::accrue_loyalty_in(
                &mut tx,
                tenant_id,
                &customer.id,
                loyalty_points_for(totals.total),
                totals.total,
                now,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            number = %transaction.transaction_number,
            total = %transaction.total_amount,
            lines = lines.len(),
            "Sale completed"
        );

        let sale = CompletedSale { transaction, lines };
        let fan_out = self.dispatcher.publish(sale.event());

        Ok((sale, fan_out))
    }

    /// A sale and its lines, or `None` if `id` is not one of `tenant_id`'s.
    pub async fn get_transaction(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> SaleResult<Option<CompletedSale>> {
        let Some(transaction) = self.db.sales().get_by_id(tenant_id, id).await? else {
            return Ok(None);
        };
        let lines = self.db.sales().get_lines(&transaction.id).await?;
        Ok(Some(CompletedSale { transaction, lines }))
    }

    /// Input checks that need no database. Returns the parsed payment method.
    fn validate(&self, input: &CreateSaleInput) -> SaleResult<PaymentMethod> {
        if input.items.is_empty() {
            return Err(ValidationError::EmptySale.into());
        }
        validate_required("tenant_id", &input.tenant_id)?;
        if input.items.len() > MAX_SALE_LINES {
            return Err(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: MAX_SALE_LINES as i64,
            }
            .into());
        }
        for item in &input.items {
            validate_required("product_id", &item.product_id)?;
            validate_quantity_within(item.quantity, self.settings.max_item_quantity)?;
        }

        let payment_method: PaymentMethod = input.payment_method.parse()?;

        validate_notes(input.notes.as_deref())?;
        if let Some(discount) = input.discount {
            validate_price("discount", discount)?;
        }
        if let Some(customer_id) = input.customer_id.as_deref() {
            validate_required("customer_id", customer_id)?;
        }

        Ok(payment_method)
    }
}
