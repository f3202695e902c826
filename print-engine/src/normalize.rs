//! Schema normalizer
//!
//! Order records come from an external API whose shape varies by endpoint
//! version: the same field may sit under different keys or nested objects.
//! Every canonical field is resolved by an ordered list of [`FieldRule`]s;
//! the first rule yielding a usable value wins and missing fields get a
//! placeholder. Normalization never fails.
//!
//! Supporting a new source shape means pushing a rule onto the relevant
//! list, e.g. `normalizer.rules_mut().item.description.push(KeyPath::new("titulo"))`.

use std::fmt::Debug;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::types::{DEFAULT_STORE_NAME, LineItem, Order};

/// One way of locating a field inside a source record
pub trait FieldRule: Debug + Send + Sync {
    fn resolve<'a>(&self, source: &'a Value) -> Option<&'a Value>;
}

/// Dotted object path, e.g. `produto.nome`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath(String);

impl KeyPath {
    pub fn new(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl FieldRule for KeyPath {
    fn resolve<'a>(&self, source: &'a Value) -> Option<&'a Value> {
        self.0
            .split('.')
            .try_fold(source, |value, key| value.get(key))
    }
}

/// Key looked up one level down, inside any nested object of the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedKey(String);

impl NestedKey {
    pub fn new(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl FieldRule for NestedKey {
    fn resolve<'a>(&self, source: &'a Value) -> Option<&'a Value> {
        source
            .as_object()?
            .values()
            .filter(|v| v.is_object())
            .filter_map(|v| v.get(&self.0))
            .find(|v| is_present(v))
    }
}

/// Ordered resolution rules for one canonical field
#[derive(Debug, Default)]
pub struct FieldRules {
    rules: Vec<Box<dyn FieldRule>>,
}

impl FieldRules {
    /// Rules probing each dotted path in order
    pub fn keys(paths: &[&str]) -> Self {
        let mut rules = Self::default();
        for p in paths {
            rules.push(KeyPath::new(p));
        }
        rules
    }

    /// Append a rule (lowest priority)
    pub fn push(&mut self, rule: impl FieldRule + 'static) -> &mut Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn candidates<'a>(&'a self, source: &'a Value) -> impl Iterator<Item = &'a Value> + 'a {
        self.rules
            .iter()
            .filter_map(move |r| r.resolve(source))
            .filter(|v| is_present(v))
    }

    /// First non-empty string or number, as text
    pub fn text(&self, source: &Value) -> Option<String> {
        self.candidates(source).find_map(as_text)
    }

    /// First value that parses as a decimal; malformed candidates are skipped
    pub fn decimal(&self, source: &Value, field: &str) -> Option<Decimal> {
        self.candidates(source).find_map(|v| {
            let parsed = as_decimal(v);
            if parsed.is_none() {
                warn!(field, value = %v, "Malformed numeric value, ignoring");
            }
            parsed
        })
    }

    /// First non-empty array
    pub fn list<'a>(&'a self, source: &'a Value) -> Option<&'a Vec<Value>> {
        self.candidates(source).find_map(Value::as_array)
    }
}

/// Rules for order-level fields
#[derive(Debug)]
pub struct OrderRules {
    pub id: FieldRules,
    pub date: FieldRules,
    pub customer: FieldRules,
    pub store: FieldRules,
    pub total: FieldRules,
    pub note: FieldRules,
    pub items: FieldRules,
    pub item: ItemRules,
}

/// Rules for line item fields
#[derive(Debug)]
pub struct ItemRules {
    pub description: FieldRules,
    pub sku: FieldRules,
    pub quantity: FieldRules,
    pub unit_price: FieldRules,
    pub line_total: FieldRules,
    pub note: FieldRules,
}

const ITEM_LIST_KEYS: [&str; 6] = [
    "itens",
    "items",
    "produtos",
    "pedidoProdutos",
    "products",
    "produto",
];

impl Default for OrderRules {
    fn default() -> Self {
        let mut items = FieldRules::keys(&ITEM_LIST_KEYS);
        for key in ITEM_LIST_KEYS {
            items.push(NestedKey::new(key));
        }

        Self {
            id: FieldRules::keys(&["numero", "id", "numeroPedido", "order_id", "idVenda"]),
            date: FieldRules::keys(&["data", "data_pedido", "dataPedido", "date"]),
            customer: FieldRules::keys(&["cliente.nome", "contato.nome", "customer.name", "cliente"]),
            store: FieldRules::keys(&["loja.nome", "store.name"]),
            total: FieldRules::keys(&["total", "totalProdutos", "valor_total"]),
            note: FieldRules::keys(&["observacao", "observacoes", "obs", "note"]),
            items,
            item: ItemRules::default(),
        }
    }
}

impl Default for ItemRules {
    fn default() -> Self {
        Self {
            description: FieldRules::keys(&[
                "descricao",
                "produto.nome",
                "produto.descricao",
                "nome",
                "description",
                "descr",
                "item_name",
            ]),
            sku: FieldRules::keys(&[
                "codigo",
                "sku",
                "id",
                "code",
                "produto.codigo",
                "produto.sku",
                "produto.id",
                "produto.code",
            ]),
            quantity: FieldRules::keys(&["quantidade", "qtde", "qtd", "quantity", "amount"]),
            unit_price: FieldRules::keys(&[
                "valorunidade",
                "valor_unitario",
                "valor",
                "unit_price",
                "preco",
                "price",
                "produto.preco",
                "produto.valor",
                "produto.price",
            ]),
            line_total: FieldRules::keys(&["valorTotalItem", "valor_total", "total"]),
            note: FieldRules::keys(&[
                "descricaoDetalhada",
                "observacao",
                "obs",
                "description_details",
                "notas",
            ]),
        }
    }
}

/// Resolves canonical orders from heterogeneous records
#[derive(Debug, Default)]
pub struct SchemaNormalizer {
    rules: OrderRules,
}

impl SchemaNormalizer {
    pub fn new(rules: OrderRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &OrderRules {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut OrderRules {
        &mut self.rules
    }

    /// Normalize using the current local time for synthesized fields
    pub fn normalize(&self, raw: &Value) -> Order {
        self.normalize_at(raw, Local::now())
    }

    /// Normalize with an explicit clock (synthesized id and missing date)
    #[instrument(skip(self, raw, now))]
    pub fn normalize_at(&self, raw: &Value, now: DateTime<Local>) -> Order {
        let r = &self.rules;

        let id = r.id.text(raw).unwrap_or_else(|| {
            let id = format!("TEMP-{}", now.timestamp());
            warn!(id = %id, "Order number not found, using temporary id");
            id
        });

        let date = match r.date.text(raw) {
            Some(d) => normalize_date(&d),
            None => now.format("%d/%m/%Y %H:%M").to_string(),
        };

        let items: Vec<LineItem> = match r.items.list(raw) {
            Some(list) => list
                .iter()
                .enumerate()
                .map(|(i, v)| self.normalize_item(unwrap_item(v), i + 1))
                .collect(),
            None => {
                debug!(order_id = %id, "No item list found");
                Vec::new()
            }
        };

        let total = r
            .total
            .decimal(raw, "total")
            .unwrap_or_else(|| sum_line_totals(&items));

        Order {
            id,
            date,
            customer: r.customer.text(raw),
            store_name: r
                .store
                .text(raw)
                .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
            items,
            total,
            note: r.note.text(raw),
        }
    }

    /// Normalize one line item; `n` is its 1-based position
    fn normalize_item(&self, raw: &Value, n: usize) -> LineItem {
        let r = &self.rules.item;

        let code = r.sku.text(raw);
        let description = r.description.text(raw).unwrap_or_else(|| match &code {
            Some(code) => format!("Product {}", code),
            None => format!("Product #{}", n),
        });
        let quantity = r.quantity.decimal(raw, "quantity").unwrap_or(Decimal::ONE);
        let unit_price = r
            .unit_price
            .decimal(raw, "unit_price")
            .unwrap_or(Decimal::ZERO);
        let line_total = r
            .line_total
            .decimal(raw, "line_total")
            .unwrap_or_else(|| {
                quantity.checked_mul(unit_price).unwrap_or_else(|| {
                    warn!(%quantity, %unit_price, "Line total overflows, using zero");
                    Decimal::ZERO
                })
            });

        LineItem {
            description,
            sku: code.unwrap_or_else(|| format!("SKU{}", n)),
            quantity,
            unit_price,
            line_total,
            note: r.note.text(raw),
        }
    }
}

/// Sum of line totals; zero when the sum overflows
fn sum_line_totals(items: &[LineItem]) -> Decimal {
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.line_total))
        .unwrap_or_else(|| {
            warn!(items = items.len(), "Order total overflows, using zero");
            Decimal::ZERO
        })
}

/// `{"item": {...}}` wrappers are unwrapped
fn unwrap_item(v: &Value) -> &Value {
    match v.as_object() {
        Some(obj) if obj.len() == 1 => match obj.get("item") {
            Some(inner) if inner.is_object() => inner,
            _ => v,
        },
        _ => v,
    }
}

/// `yyyy-mm-dd[Thh:mm...]` becomes `dd/mm/yyyy`; anything else is kept as is
pub fn normalize_date(raw: &str) -> String {
    let head = raw.trim().split(['T', ' ']).next().unwrap_or_default();
    match NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Accepts `5.50`, `5,50`, `1.234,56`, `1,234.56` and scientific notation
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s.to_string(),
    };
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::dec;
    use serde_json::json;

    fn clock() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap()
    }

    fn item_of(raw: Value) -> LineItem {
        let order = SchemaNormalizer::default().normalize_at(&json!({ "itens": [raw] }), clock());
        order.items.into_iter().next().unwrap()
    }

    #[test]
    fn test_description_from_distinct_shapes() {
        let shapes = [
            json!({ "descricao": "Coffee" }),
            json!({ "produto": { "nome": "Coffee" } }),
            json!({ "nome": "Coffee" }),
            json!({ "description": "Coffee" }),
            json!({ "item": { "descricao": "Coffee" } }),
        ];
        for shape in shapes {
            assert_eq!(item_of(shape).description, "Coffee");
        }
    }

    #[test]
    fn test_item_placeholders() {
        let item = item_of(json!({}));
        assert_eq!(item.description, "Product #1");
        assert_eq!(item.sku, "SKU1");
        assert_eq!(item.quantity, Decimal::ONE);
        assert_eq!(item.unit_price, Decimal::ZERO);
        assert_eq!(item.line_total, Decimal::ZERO);

        let item = item_of(json!({ "codigo": "CF-01" }));
        assert_eq!(item.description, "Product CF-01");
        assert_eq!(item.sku, "CF-01");
    }

    #[test]
    fn test_malformed_numbers_fall_back() {
        let item = item_of(json!({ "quantidade": "lots", "preco": { "x": 1 } }));
        assert_eq!(item.quantity, Decimal::ONE);
        assert_eq!(item.unit_price, Decimal::ZERO);

        // Malformed first candidate, valid second one
        let item = item_of(json!({ "quantidade": "two", "qtd": "3" }));
        assert_eq!(item.quantity, dec!(3));
    }

    #[test]
    fn test_line_total_computed_or_supplied() {
        let item = item_of(json!({ "quantidade": 2, "preco": "5,50" }));
        assert_eq!(item.line_total, dec!(11.00));

        let item = item_of(json!({ "quantidade": 2, "preco": 5.5, "valorTotalItem": 10 }));
        assert_eq!(item.line_total, dec!(10));
    }

    #[test]
    fn test_huge_values_do_not_overflow() {
        let huge = Decimal::from_scientific("7e28").unwrap();
        let item = item_of(json!({ "descricao": "X", "quantidade": "7e28", "preco": 2 }));
        assert_eq!(item.quantity, huge);
        assert_eq!(item.line_total, Decimal::ZERO);

        let raw = json!({
            "itens": [
                { "descricao": "A", "valorTotalItem": "7e28" },
                { "descricao": "B", "valorTotalItem": "7e28" }
            ]
        });
        let order = SchemaNormalizer::default().normalize_at(&raw, clock());
        assert_eq!(order.items[0].line_total, huge);
        assert_eq!(order.total, Decimal::ZERO);

        // Layout still renders the order
        let lines = crate::layout::format_order(&order, 32);
        assert!(lines.iter().any(|l| l == "TOTAL: R$ 0,00"));
    }

    #[test]
    fn test_order_fields() {
        let raw = json!({
            "numero": 1042,
            "data": "2024-01-02T10:00:00",
            "contato": { "nome": "Ana" },
            "loja": { "nome": "Cafe Central" },
            "observacao": "Deliver after 6pm",
            "itens": [{ "descricao": "Coffee", "quantidade": 2, "preco": 5.5 }]
        });
        let order = SchemaNormalizer::default().normalize_at(&raw, clock());

        assert_eq!(order.id, "1042");
        assert_eq!(order.date, "02/01/2024");
        assert_eq!(order.customer.as_deref(), Some("Ana"));
        assert_eq!(order.store_name, "Cafe Central");
        assert_eq!(order.note.as_deref(), Some("Deliver after 6pm"));
        // No total in the source: sum of lines
        assert_eq!(order.total, dec!(11.0));
    }

    #[test]
    fn test_missing_fields_are_synthesized() {
        let order = SchemaNormalizer::default().normalize_at(&json!({}), clock());
        assert_eq!(order.id, format!("TEMP-{}", clock().timestamp()));
        assert_eq!(order.date, "05/03/2024 14:30");
        assert_eq!(order.store_name, DEFAULT_STORE_NAME);
        assert!(order.items.is_empty());
        assert_eq!(order.total, Decimal::ZERO);

        let order = SchemaNormalizer::default().normalize_at(&json!("not an object"), clock());
        assert!(order.id.starts_with("TEMP-"));
    }

    #[test]
    fn test_alternate_id_and_item_keys() {
        let raw = json!({
            "idVenda": "V-7",
            "pedido": { "items": [{ "nome": "Tea" }] }
        });
        let order = SchemaNormalizer::default().normalize_at(&raw, clock());
        assert_eq!(order.id, "V-7");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].description, "Tea");

        let raw = json!({ "produtos": [{ "nome": "A" }, { "nome": "B" }] });
        let order = SchemaNormalizer::default().normalize_at(&raw, clock());
        assert_eq!(order.items[1].sku, "SKU2");
    }

    #[test]
    fn test_custom_rule() {
        let mut normalizer = SchemaNormalizer::default();
        normalizer
            .rules_mut()
            .item
            .description
            .push(KeyPath::new("titulo"));

        let order = normalizer.normalize_at(&json!({ "itens": [{ "titulo": "Cake" }] }), clock());
        assert_eq!(order.items[0].description, "Cake");
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-01-02"), "02/01/2024");
        assert_eq!(normalize_date("2024-01-02 08:15:00"), "02/01/2024");
        assert_eq!(normalize_date("02/01/2024 08:15"), "02/01/2024 08:15");
        assert_eq!(normalize_date("0000-00-00"), "0000-00-00");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("5.50"), Some(dec!(5.50)));
        assert_eq!(parse_decimal("5,50"), Some(dec!(5.50)));
        assert_eq!(parse_decimal("1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal("1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal("1e3"), Some(dec!(1000)));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal(""), None);
    }
}
