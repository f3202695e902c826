//! Canonical order types

use rust_decimal::Decimal;

/// Store label used when the order carries none
pub const DEFAULT_STORE_NAME: &str = "STORE";

/// Normalized order, ready for layout
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Never empty
    pub id: String,
    /// `dd/mm/yyyy` when the source date could be parsed
    pub date: String,
    pub customer: Option<String>,
    pub store_name: String,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub note: Option<String>,
}

/// Normalized order line
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub sku: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub note: Option<String>,
}
