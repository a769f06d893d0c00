//! Column layout and header detection settings
//!
//! Both are deployment-wide: every request handled by one process uses the
//! same layout and the same header rule.

use serde::{Deserialize, Serialize};

/// Semantic column names, in the canonical file order
pub const ID_COLUMN: &str = "id";
pub const NAME_COLUMN: &str = "name";
pub const CATEGORY_COLUMN: &str = "category";
pub const PRICE_COLUMN: &str = "price";
pub const DATE_COLUMN: &str = "create_date";

const FULL_COLUMNS: &[&str] = &[ID_COLUMN, NAME_COLUMN, CATEGORY_COLUMN, PRICE_COLUMN, DATE_COLUMN];
const NO_ID_COLUMNS: &[&str] = &[NAME_COLUMN, CATEGORY_COLUMN, PRICE_COLUMN, DATE_COLUMN];
const SHARED_MARKERS: &[&str] = &[NAME_COLUMN, CATEGORY_COLUMN, PRICE_COLUMN];

/// Order of semantic fields within a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnLayout {
    /// `id,name,category,price,create_date`
    #[default]
    Full,
    /// `name,category,price,create_date`, ids are assigned by the store
    NoId,
    /// Compatibility mode: guess the order of every record on its own.
    ///
    /// Can silently misread a row whose fields happen to look like another
    /// layout. Prefer a fixed layout.
    Heuristic,
}

impl ColumnLayout {
    /// Column names written to (and expected in) the header row
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ColumnLayout::Full | ColumnLayout::Heuristic => FULL_COLUMNS,
            ColumnLayout::NoId => NO_ID_COLUMNS,
        }
    }

    /// Substrings that must all appear in a header row
    pub fn header_markers(self) -> &'static [&'static str] {
        match self {
            ColumnLayout::Full | ColumnLayout::NoId => self.columns(),
            ColumnLayout::Heuristic => SHARED_MARKERS,
        }
    }

    pub fn leading_column(self) -> &'static str {
        self.columns()[0]
    }

    pub fn has_id_column(self) -> bool {
        !matches!(self, ColumnLayout::NoId)
    }
}

impl std::str::FromStr for ColumnLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "full" => Ok(ColumnLayout::Full),
            "no_id" | "noid" => Ok(ColumnLayout::NoId),
            "heuristic" | "auto" => Ok(ColumnLayout::Heuristic),
            _ => Err(anyhow::anyhow!("Invalid column layout: {}", s)),
        }
    }
}

/// How the parser decides whether record 0 is a header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderDetection {
    /// Field 0 equals the layout's leading column name, ignoring case
    #[default]
    FirstField,
    /// The lower-cased record contains every header marker of the layout
    Markers,
}

impl HeaderDetection {
    pub fn is_header(self, record: &[String], layout: ColumnLayout) -> bool {
        match self {
            HeaderDetection::FirstField => record
                .first()
                .is_some_and(|field| field.trim().eq_ignore_ascii_case(layout.leading_column())),
            HeaderDetection::Markers => {
                let joined = record.join(" ").to_lowercase();
                layout
                    .header_markers()
                    .iter()
                    .all(|marker| joined.contains(marker))
            },
        }
    }
}

impl std::str::FromStr for HeaderDetection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "first_field" => Ok(HeaderDetection::FirstField),
            "markers" | "tokens" => Ok(HeaderDetection::Markers),
            _ => Err(anyhow::anyhow!("Invalid header detection mode: {}", s)),
        }
    }
}

/// Accepted calendar date patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateFormats {
    /// Also accept `YYYY/MM/DD` when `YYYY-MM-DD` does not match
    pub allow_slash_fallback: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_first_field_detection() {
        let header = record(&["ID", "name", "category", "price", "create_date"]);
        let data = record(&["1", "Widget", "Tools", "9.99", "2024-01-15"]);
        assert!(HeaderDetection::FirstField.is_header(&header, ColumnLayout::Full));
        assert!(!HeaderDetection::FirstField.is_header(&data, ColumnLayout::Full));
    }

    #[test]
    fn test_first_field_detection_without_id_column() {
        let header = record(&["Name", "category", "price", "create_date"]);
        assert!(HeaderDetection::FirstField.is_header(&header, ColumnLayout::NoId));
        assert!(!HeaderDetection::FirstField.is_header(&header, ColumnLayout::Full));
    }

    #[test]
    fn test_marker_detection_requires_every_marker() {
        let header = record(&["Id", "Name", "Category", "Price", "Create_Date"]);
        let partial = record(&["id", "name", "cost", "date"]);
        assert!(HeaderDetection::Markers.is_header(&header, ColumnLayout::Full));
        assert!(!HeaderDetection::Markers.is_header(&partial, ColumnLayout::Full));
    }

    #[test]
    fn test_marker_detection_in_heuristic_mode_ignores_id() {
        let header = record(&["name", "category", "price", "date"]);
        assert!(HeaderDetection::Markers.is_header(&header, ColumnLayout::Heuristic));
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("full".parse::<ColumnLayout>().unwrap(), ColumnLayout::Full);
        assert_eq!("no-id".parse::<ColumnLayout>().unwrap(), ColumnLayout::NoId);
        assert_eq!("HEURISTIC".parse::<ColumnLayout>().unwrap(), ColumnLayout::Heuristic);
        assert!("csv".parse::<ColumnLayout>().is_err());
        assert_eq!(
            "markers".parse::<HeaderDetection>().unwrap(),
            HeaderDetection::Markers
        );
    }
}
