//! Invoice input and priced output models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a discount or adjustment value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiscountType {
    Percent,
    #[default]
    Flat,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percent => "PERCENT",
            DiscountType::Flat => "FLAT",
        }
    }
}

/// Line item on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub discount_type: DiscountType,
}

impl LineItem {
    pub fn new(description: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            description: description.into(),
            price,
            quantity,
            discount: Decimal::ZERO,
            discount_type: DiscountType::Flat,
        }
    }

    pub fn with_discount(mut self, discount: Decimal, discount_type: DiscountType) -> Self {
        self.discount = discount;
        self.discount_type = discount_type;
        self
    }
}

/// Caller-supplied invoice. Read-only for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceDocument {
    pub items: Vec<LineItem>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub apply_overall_discount: bool,
    pub overall_discount: Decimal,
    pub overall_discount_type: DiscountType,
    pub adjustment_amount: Decimal,
    pub adjustment_amount_type: DiscountType,
    pub payment_method: String,
    pub payment_details: String,
    pub issued_by: String,
    pub invoice_status: String,
    pub owner_message: String,
}

impl InvoiceDocument {
    /// Checks the input invariants: non-negative prices and line discounts.
    pub fn validate(&self) -> Result<(), String> {
        for (index, item) in self.items.iter().enumerate() {
            if item.price < Decimal::ZERO {
                return Err(format!("item {} has a negative price", index + 1));
            }
            if item.discount < Decimal::ZERO {
                return Err(format!("item {} has a negative discount", index + 1));
            }
        }
        Ok(())
    }
}

/// A line item together with its computed total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLineItem {
    pub item: LineItem,
    pub total: Decimal,
}

/// Invoice with computed totals. Only the calculator constructs one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedInvoice {
    document: InvoiceDocument,
    items: Vec<PricedLineItem>,
    subtotal: Decimal,
    after_overall_discount: Decimal,
    grand_total: Decimal,
}

impl PricedInvoice {
    pub(crate) fn new(
        document: InvoiceDocument,
        items: Vec<PricedLineItem>,
        subtotal: Decimal,
        after_overall_discount: Decimal,
        grand_total: Decimal,
    ) -> Self {
        Self {
            document,
            items,
            subtotal,
            after_overall_discount,
            grand_total,
        }
    }

    pub fn document(&self) -> &InvoiceDocument {
        &self.document
    }

    /// Priced items, in input order.
    pub fn items(&self) -> &[PricedLineItem] {
        &self.items
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn after_overall_discount(&self) -> Decimal {
        self.after_overall_discount
    }

    pub fn grand_total(&self) -> Decimal {
        self.grand_total
    }
}
