//! Price models shared by the import and export paths

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use sqlx::FromRow;
use std::collections::HashSet;

/// One validated row, ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRow {
    /// Upstream product identifier, when the source file carried one
    pub product_id: Option<i64>,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub create_date: NaiveDate,
}

/// A persisted price row
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredPrice {
    pub id: i64,
    pub product_id: Option<i64>,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub create_date: NaiveDate,
}

impl StoredPrice {
    pub fn from_row(id: i64, row: PriceRow) -> Self {
        Self {
            id,
            product_id: row.product_id,
            name: row.name,
            category: row.category,
            price: row.price,
            create_date: row.create_date,
        }
    }
}

/// Aggregate statistics returned by one import call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_items: u64,
    pub total_categories: u64,
    #[serde(serialize_with = "serialize_decimal_as_number")]
    pub total_price: BigDecimal,
}

fn serialize_decimal_as_number<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value.to_f64() {
        Some(number) => serializer.serialize_f64(number),
        None => serializer.serialize_str(&value.to_string()),
    }
}

/// Accumulates a [`Summary`] while rows are accepted
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    items: u64,
    categories: HashSet<String>,
    total_price: BigDecimal,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self {
            items: 0,
            categories: HashSet::new(),
            total_price: BigDecimal::zero(),
        }
    }

    pub fn accept(&mut self, row: &PriceRow) {
        self.items += 1;
        if !self.categories.contains(&row.category) {
            self.categories.insert(row.category.clone());
        }
        self.total_price += &row.price;
    }

    pub fn items(&self) -> u64 {
        self.items
    }

    pub fn finish(self) -> Summary {
        Summary {
            total_items: self.items,
            total_categories: self.categories.len() as u64,
            total_price: self.total_price,
        }
    }
}
