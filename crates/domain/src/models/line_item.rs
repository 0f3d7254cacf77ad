//! Order and invoice line items with derived totals.

use serde::{Deserialize, Serialize};

/// Round a monetary amount to cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    pub fn total(&self) -> f64 {
        round_cents(self.quantity * self.unit_price)
    }
}

/// Sum of all line totals, rounded to cents.
pub fn order_total(items: &[LineItem]) -> f64 {
    round_cents(items.iter().map(|item| item.quantity * item.unit_price).sum())
}

/// Derived amounts of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

impl InvoiceTotals {
    pub fn compute(items: &[LineItem], tax_rate: f64) -> Self {
        let subtotal = order_total(items);
        let tax_amount = round_cents(subtotal * tax_rate / 100.0);
        Self {
            subtotal,
            tax_rate,
            tax_amount,
            total_amount: round_cents(subtotal + tax_amount),
        }
    }
}
