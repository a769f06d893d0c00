//! Field conversion for a single record
//!
//! A record either becomes a [`PriceRow`] or is skipped. Skips are never
//! errors: short records, blank required fields, bad prices and bad dates
//! are simply left out of the import.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

use super::{ColumnLayout, DateFormats};
use crate::models::PriceRow;

/// Minimum width of a record that carries an id column
pub const MIN_FIELDS_WITH_ID: usize = 5;

/// Minimum width of a record without an id column
pub const MIN_FIELDS_WITHOUT_ID: usize = 4;

/// Field positions resolved for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOrder {
    pub id: Option<usize>,
    pub name: usize,
    pub category: usize,
    pub price: usize,
    pub date: usize,
}

impl FieldOrder {
    /// `id,name,category,price,create_date`
    pub const FULL: FieldOrder = FieldOrder { id: Some(0), name: 1, category: 2, price: 3, date: 4 };
    /// `id,create_date,name,category,price`
    pub const DATE_SECOND: FieldOrder =
        FieldOrder { id: Some(0), name: 2, category: 3, price: 4, date: 1 };
    /// `name,category,price,create_date`
    pub const NO_ID: FieldOrder = FieldOrder { id: None, name: 0, category: 1, price: 2, date: 3 };

    pub fn min_fields(&self) -> usize {
        if self.id.is_some() {
            MIN_FIELDS_WITH_ID
        } else {
            MIN_FIELDS_WITHOUT_ID
        }
    }
}

/// Pick the field order for `record` under `layout`
///
/// Fixed layouts always answer the same. The heuristic layout looks at each
/// record: an integer in field 0 means an id column, and a date-shaped
/// field 1 then means the date comes second.
pub fn resolve_order(record: &[String], layout: ColumnLayout) -> FieldOrder {
    match layout {
        ColumnLayout::Full => FieldOrder::FULL,
        ColumnLayout::NoId => FieldOrder::NO_ID,
        ColumnLayout::Heuristic => {
            let leading_int = record
                .first()
                .is_some_and(|field| field.trim().parse::<i64>().is_ok());
            if !leading_int {
                FieldOrder::NO_ID
            } else if record.get(1).is_some_and(|field| is_date_shaped(field)) {
                FieldOrder::DATE_SECOND
            } else {
                FieldOrder::FULL
            }
        },
    }
}

/// Two hyphens splitting three non-empty segments, e.g. `2024-01-15`
fn is_date_shaped(field: &str) -> bool {
    let segments: Vec<&str> = field.trim().split('-').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

/// Fractional digits kept by the `DECIMAL(10, 2)` price column
pub const PRICE_SCALE: i64 = 2;

/// Parse a non-negative base-10 decimal with at most two significant
/// fractional digits
///
/// `9.990` becomes `9.99`; `9.999` is refused rather than rounded, so the
/// summary never differs from what the store keeps.
pub fn parse_price(text: &str) -> Option<BigDecimal> {
    let price = BigDecimal::from_str(text).ok()?;
    if price < BigDecimal::from(0) {
        return None;
    }
    let scaled = price.with_scale(PRICE_SCALE);
    (scaled == price).then_some(scaled)
}

/// Parse `YYYY-MM-DD`, or `YYYY/MM/DD` when the fallback is enabled
pub fn parse_date(text: &str, formats: DateFormats) -> Option<NaiveDate> {
    parse_date_with(text, '-', "%Y-%m-%d").or_else(|| {
        formats
            .allow_slash_fallback
            .then(|| parse_date_with(text, '/', "%Y/%m/%d"))
            .flatten()
    })
}

fn parse_date_with(text: &str, separator: char, pattern: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == separator as u8
        && bytes[7] == separator as u8
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(text, pattern).ok()
}

fn required(record: &[String], index: usize) -> Option<&str> {
    let value = record.get(index)?.trim();
    (!value.is_empty()).then_some(value)
}

/// Convert one record, or `None` when it must be skipped
pub fn validate(record: &[String], layout: ColumnLayout, formats: DateFormats) -> Option<PriceRow> {
    let order = resolve_order(record, layout);
    if record.len() < order.min_fields() {
        return None;
    }

    let name = required(record, order.name)?;
    let category = required(record, order.category)?;
    let price = parse_price(required(record, order.price)?)?;
    let create_date = parse_date(required(record, order.date)?, formats)?;
    let product_id = order
        .id
        .and_then(|index| record.get(index))
        .and_then(|field| field.trim().parse::<i64>().ok());

    Some(PriceRow {
        product_id,
        name: name.to_string(),
        category: category.to_string(),
        price,
        create_date,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const STRICT: DateFormats = DateFormats { allow_slash_fallback: false };
    const LENIENT: DateFormats = DateFormats { allow_slash_fallback: true };

    fn record(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn price(text: &str) -> BigDecimal {
        BigDecimal::from_str(text).unwrap()
    }

    #[test]
    fn test_full_layout_row() {
        let row = validate(
            &record(&["1", " Widget ", "Tools ", " 9.99", "2024-01-15"]),
            ColumnLayout::Full,
            STRICT,
        )
        .unwrap();
        assert_eq!(row.product_id, Some(1));
        assert_eq!(row.name, "Widget");
        assert_eq!(row.category, "Tools");
        assert_eq!(row.price, price("9.99"));
        assert_eq!(row.create_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_non_integer_id_is_not_fatal() {
        let row = validate(
            &record(&["sku-9", "Widget", "Tools", "9.99", "2024-01-15"]),
            ColumnLayout::Full,
            STRICT,
        )
        .unwrap();
        assert_eq!(row.product_id, None);
    }

    #[test]
    fn test_short_records_are_skipped() {
        let four = record(&["1", "Widget", "Tools", "9.99"]);
        assert!(validate(&four, ColumnLayout::Full, STRICT).is_none());

        let three = record(&["Widget", "Tools", "9.99"]);
        assert!(validate(&three, ColumnLayout::NoId, STRICT).is_none());
    }

    #[test]
    fn test_no_id_layout_needs_four_fields() {
        let row = validate(
            &record(&["Widget", "Tools", "9.99", "2024-01-15"]),
            ColumnLayout::NoId,
            STRICT,
        )
        .unwrap();
        assert_eq!(row.product_id, None);
        assert_eq!(row.name, "Widget");
    }

    #[test]
    fn test_blank_required_fields_are_skipped() {
        let cases = [
            ["1", "  ", "Tools", "9.99", "2024-01-15"],
            ["1", "Widget", "", "9.99", "2024-01-15"],
            ["1", "Widget", "Tools", " ", "2024-01-15"],
            ["1", "Widget", "Tools", "9.99", ""],
        ];
        for case in cases {
            assert!(validate(&record(&case), ColumnLayout::Full, STRICT).is_none(), "{:?}", case);
        }
    }

    #[test]
    fn test_bad_prices_are_skipped() {
        for bad in ["abc", "9,99", "-1.00", "NaN", "$5"] {
            let rec = record(&["1", "Widget", "Tools", bad, "2024-01-15"]);
            assert!(validate(&rec, ColumnLayout::Full, STRICT).is_none(), "{}", bad);
        }
        assert_eq!(parse_price("0"), Some(price("0")));
        assert_eq!(parse_price("12"), Some(price("12")));
    }

    #[test]
    fn test_price_precision_matches_stored_column() {
        assert_eq!(parse_price("9.990").unwrap().to_string(), "9.99");
        assert_eq!(parse_price("4.5").unwrap().to_string(), "4.50");
        for bad in ["9.999", "0.001", "1.005"] {
            assert!(parse_price(bad).is_none(), "{}", bad);
            let rec = record(&["1", "Widget", "Tools", bad, "2024-01-15"]);
            assert!(validate(&rec, ColumnLayout::Full, STRICT).is_none(), "{}", bad);
        }
    }

    #[test]
    fn test_date_must_match_fixed_pattern() {
        for bad in ["2024-1-15", "15-01-2024", "2024-02-30", "2024/01/15", "20240115", "2024-01-15T00:00"] {
            assert!(parse_date(bad, STRICT).is_none(), "{}", bad);
        }
        assert_eq!(
            parse_date("2024-02-29", STRICT),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_slash_fallback_only_when_enabled() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024/01/15", LENIENT), expected);
        assert_eq!(parse_date("2024-01-15", LENIENT), expected);
        assert!(parse_date("2024/1/15", LENIENT).is_none());
    }

    #[test]
    fn test_heuristic_resolves_each_record_on_its_own() {
        let full = record(&["1", "Widget", "Tools", "9.99", "2024-01-15"]);
        let date_second = record(&["2", "2024-02-20", "Gadget", "Tools", "4.50"]);
        let no_id = record(&["Gizmo", "Garden", "1.25", "2024-03-01"]);

        assert_eq!(resolve_order(&full, ColumnLayout::Heuristic), FieldOrder::FULL);
        assert_eq!(resolve_order(&date_second, ColumnLayout::Heuristic), FieldOrder::DATE_SECOND);
        assert_eq!(resolve_order(&no_id, ColumnLayout::Heuristic), FieldOrder::NO_ID);

        let row = validate(&date_second, ColumnLayout::Heuristic, STRICT).unwrap();
        assert_eq!(row.name, "Gadget");
        assert_eq!(row.price, price("4.50"));
        assert_eq!(row.product_id, Some(2));

        let row = validate(&no_id, ColumnLayout::Heuristic, STRICT).unwrap();
        assert_eq!(row.category, "Garden");
        assert_eq!(row.product_id, None);
    }

    #[test]
    fn test_heuristic_misreads_numeric_names() {
        // A product literally named "42" is taken for an id column, so the
        // record is read with the wrong order and dropped.
        let rec = record(&["42", "Tools", "9.99", "2024-01-15"]);
        assert_eq!(resolve_order(&rec, ColumnLayout::Heuristic), FieldOrder::FULL);
        assert!(validate(&rec, ColumnLayout::Heuristic, STRICT).is_none());
        assert!(validate(&rec, ColumnLayout::NoId, STRICT).is_some());
    }

    #[test]
    fn test_heuristic_misreads_date_shaped_names() {
        // A hyphenated product name in field 1 looks like a date and pulls
        // the whole record into the date-second order.
        let rec = record(&["7", "usb-c-cable", "Cables", "3.50", "2024-01-15"]);
        assert_eq!(resolve_order(&rec, ColumnLayout::Heuristic), FieldOrder::DATE_SECOND);
        assert!(validate(&rec, ColumnLayout::Heuristic, STRICT).is_none());
        assert!(validate(&rec, ColumnLayout::Full, STRICT).is_some());
    }
}
