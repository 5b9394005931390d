//! Invoice totals.
//!
//! The order of operations is fixed: line items, subtotal, overall discount,
//! then adjustment. All arithmetic is exact decimal; nothing is rounded or
//! clamped here, so a discount larger than the amount it applies to yields a
//! negative contribution. Every step is checked, and a result outside the
//! decimal range is a validation error.

use crate::error::InvoiceError;
use crate::models::{DiscountType, InvoiceDocument, LineItem, PricedInvoice, PricedLineItem};
use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn overflow(what: &str) -> InvoiceError {
    InvoiceError::Validation(format!("{} is out of range (decimal overflow)", what))
}

/// Compute every total for `invoice`. Pure: same input, same output.
pub fn compute_totals(invoice: &InvoiceDocument) -> Result<PricedInvoice, InvoiceError> {
    let items = invoice
        .items
        .iter()
        .map(|item| {
            Ok(PricedLineItem {
                item: item.clone(),
                total: item_total(item)?,
            })
        })
        .collect::<Result<Vec<_>, InvoiceError>>()?;

    let subtotal = items.iter().try_fold(Decimal::ZERO, |acc, priced| {
        acc.checked_add(priced.total).ok_or_else(|| overflow("subtotal"))
    })?;

    let after_overall_discount = if invoice.apply_overall_discount {
        apply_discount(
            subtotal,
            invoice.overall_discount,
            invoice.overall_discount_type,
        )
        .ok_or_else(|| overflow("overall discount"))?
    } else {
        subtotal
    };

    let grand_total = apply_adjustment(
        after_overall_discount,
        invoice.adjustment_amount,
        invoice.adjustment_amount_type,
    )
    .ok_or_else(|| overflow("adjustment"))?;

    tracing::debug!(
        items = items.len(),
        subtotal = %subtotal,
        after_overall_discount = %after_overall_discount,
        grand_total = %grand_total,
        "Invoice totals computed"
    );

    Ok(PricedInvoice::new(
        invoice.clone(),
        items,
        subtotal,
        after_overall_discount,
        grand_total,
    ))
}

/// `price * quantity`, less the line discount.
pub fn item_total(item: &LineItem) -> Result<Decimal, InvoiceError> {
    item.price
        .checked_mul(Decimal::from(item.quantity))
        .and_then(|gross| apply_discount(gross, item.discount, item.discount_type))
        .ok_or_else(|| overflow(&format!("total for item '{}'", item.description)))
}

/// PERCENT removes `value`% of `amount`; FLAT subtracts `value`.
fn apply_discount(amount: Decimal, value: Decimal, kind: DiscountType) -> Option<Decimal> {
    match kind {
        DiscountType::Percent => amount.checked_sub(percent_of(amount, value)?),
        DiscountType::Flat => amount.checked_sub(value),
    }
}

/// PERCENT adds `value`% of `amount`; FLAT adds `value`. A negative value
/// lowers the total.
fn apply_adjustment(amount: Decimal, value: Decimal, kind: DiscountType) -> Option<Decimal> {
    match kind {
        DiscountType::Percent => amount.checked_add(percent_of(amount, value)?),
        DiscountType::Flat => amount.checked_add(value),
    }
}

fn percent_of(amount: Decimal, value: Decimal) -> Option<Decimal> {
    amount.checked_mul(value)?.checked_div(HUNDRED)
}
