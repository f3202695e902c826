//! Fixed-width receipt layout
//!
//! Renders a normalized [`Order`] into plain text lines for a monospace
//! printer. Pure: the same order and width always give the same lines.

use rust_decimal::Decimal;

use crate::types::{LineItem, Order};

/// Receipt layout formatter
///
/// Common widths:
/// - 58mm paper: 32 characters
/// - 80mm paper: 48 characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutFormatter {
    width: usize,
}

impl LayoutFormatter {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Render an order; every line is at most `width` characters
    pub fn format(&self, order: &Order) -> Vec<String> {
        let mut lines = Vec::new();

        self.render_header(&mut lines, order);
        self.render_items(&mut lines, &order.items);
        self.render_footer(&mut lines, order);

        lines
    }

    fn render_header(&self, lines: &mut Vec<String>, order: &Order) {
        lines.push(self.separator());
        lines.extend(self.centered(&order.store_name));
        lines.extend(self.centered("ORDER"));
        lines.push(self.separator());

        lines.extend(wrap(&format!("Order: {}", order.id), self.width));
        lines.extend(wrap(&format!("Date: {}", order.date), self.width));
        if let Some(customer) = &order.customer {
            lines.extend(wrap(&format!("Customer: {}", customer), self.width));
        }
        lines.push(self.separator());
    }

    fn render_items(&self, lines: &mut Vec<String>, items: &[LineItem]) {
        lines.push("ITEMS:".to_string());

        if items.is_empty() {
            lines.push("(no items)".to_string());
            return;
        }

        for item in items {
            let heading = format!("{}x {}", format_quantity(item.quantity), item.description);
            lines.extend(wrap(&heading, self.width));
            lines.extend(wrap(&format!("   Code: {}", item.sku), self.width));

            let prices = format!(
                "   VU: {} | VT: {}",
                format_currency(item.unit_price),
                format_currency(item.line_total)
            );
            lines.extend(wrap(&prices, self.width));

            if let Some(note) = &item.note {
                lines.extend(self.paragraphs(&format!("   Note: {}", note)));
            }
            lines.push(String::new());
        }
    }

    fn render_footer(&self, lines: &mut Vec<String>, order: &Order) {
        lines.push(self.separator());
        lines.extend(wrap(
            &format!("TOTAL: {}", format_currency(order.total)),
            self.width,
        ));

        if let Some(note) = &order.note {
            lines.push(self.separator());
            lines.push("NOTES:".to_string());
            lines.extend(self.paragraphs(note));
        }
        lines.push(self.separator());
    }

    fn separator(&self) -> String {
        "-".repeat(self.width)
    }

    /// Wrap, then left-pad each line so it sits in the middle
    fn centered(&self, text: &str) -> Vec<String> {
        wrap(text, self.width)
            .into_iter()
            .map(|line| {
                let pad = (self.width - line.chars().count()) / 2;
                format!("{}{}", " ".repeat(pad), line)
            })
            .collect()
    }

    /// Wrap text that may contain line breaks
    fn paragraphs(&self, text: &str) -> Vec<String> {
        text.lines()
            .flat_map(|line| wrap(line, self.width))
            .collect()
    }
}

/// Render `order` at `width` characters per line
pub fn format_order(order: &Order, width: usize) -> Vec<String> {
    LayoutFormatter::new(width).format(order)
}

/// Word wrap
///
/// Breaks at the last space within `width` (a space at index 0 does not
/// count), otherwise hard-breaks at exactly `width`. Heads are right-trimmed
/// and continuations left-trimmed.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut rest: Vec<char> = text.chars().collect();

    while rest.len() > width {
        let cut = rest[..=width]
            .iter()
            .rposition(|c| *c == ' ')
            .filter(|&i| i > 0)
            .unwrap_or(width);

        let head: String = rest[..cut].iter().collect();
        let head = head.trim_end();
        if !head.is_empty() {
            lines.push(head.to_string());
        }

        let skip = rest[cut..]
            .iter()
            .take_while(|c| c.is_whitespace())
            .count();
        rest.drain(..cut + skip);
    }

    if !rest.is_empty() {
        lines.push(rest.into_iter().collect());
    }
    lines
}

/// `R$ 11,00`
pub fn format_currency(value: Decimal) -> String {
    format!("R$ {:.2}", value.round_dp(2)).replace('.', ",")
}

/// `2` for whole quantities, `1.5` otherwise
pub fn format_quantity(value: Decimal) -> String {
    if value.fract().is_zero() {
        value.trunc().to_string()
    } else {
        value.normalize().to_string()
    }
}
