//! Cross-widget filter predicates
//!
//! Filters are evaluated against the full, unfiltered row set every time;
//! the result is always a new vector and the input rows are never touched.

use chrono::NaiveDate;
use dc_core::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{Column, ColumnRange};
use crate::value::{as_number, as_timestamp, display, lookup};
use crate::DataError;

/// Unique identifier for a filter
pub type FilterId = Uuid;

/// Kind of filter control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Select,
    Checkbox,
    Radio,
    Slider,
    Date,
}

impl FilterKind {
    fn expected_shape(&self) -> &'static str {
        match self {
            FilterKind::Select | FilterKind::Radio => "a single scalar",
            FilterKind::Checkbox => "a list of values",
            FilterKind::Slider => "{min, max}",
            FilterKind::Date => "{start, end}",
        }
    }
}

/// Inclusive numeric bounds; a missing bound is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    fn contains(&self, n: f64) -> bool {
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }
}

/// Inclusive calendar-day bounds; a missing bound is open-ended
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Current value of a filter. Serializes to `null`, a scalar, a list,
/// `{min, max}` or `{start, end}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Many(Vec<Value>),
    Range(NumericRange),
    Dates(DateRange),
    Single(Value),
}

impl FilterValue {
    /// Whether this value has the shape `kind` expects
    pub fn fits(&self, kind: FilterKind) -> bool {
        match self {
            FilterValue::Null => true,
            FilterValue::Single(value) => {
                matches!(kind, FilterKind::Select | FilterKind::Radio)
                    && !value.is_array()
                    && !value.is_object()
            }
            FilterValue::Many(_) => kind == FilterKind::Checkbox,
            FilterValue::Range(_) => kind == FilterKind::Slider,
            FilterValue::Dates(_) => kind == FilterKind::Date,
        }
    }

    /// JSON form, as broadcast into chart filter snapshots
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A filter bound to one column of the active source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub id: FilterId,
    pub kind: FilterKind,
    pub label: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<ColumnRange>,
    pub value: FilterValue,
}

impl FilterSpec {
    /// Create a filter seeded with the column's enrichment
    pub fn new(kind: FilterKind, column: &Column, label: Option<String>) -> Self {
        let options = match kind {
            FilterKind::Select | FilterKind::Checkbox | FilterKind::Radio => {
                Some(column.unique_values().to_vec())
            }
            FilterKind::Slider | FilterKind::Date => None,
        };

        Self {
            id: Uuid::new_v4(),
            kind,
            label: label.unwrap_or_else(|| column.name.clone()),
            column: column.name.clone(),
            options,
            range: column.range,
            value: default_value(kind, Some(column)),
        }
    }

    /// Replace the value, rejecting shapes that do not match the kind
    pub fn set_value(&mut self, value: FilterValue) -> Result<(), DataError> {
        if !value.fits(self.kind) {
            return Err(DataError::FilterShape {
                kind: self.kind,
                expected: self.kind.expected_shape(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Whether this filter's current value matches every row
    pub fn is_noop(&self) -> bool {
        match &self.value {
            FilterValue::Null => true,
            FilterValue::Single(value) => display(value).trim().is_empty(),
            FilterValue::Many(values) => values.is_empty(),
            FilterValue::Range(range) => range.min.is_none() && range.max.is_none(),
            // Rows whose value is not a date never match
            FilterValue::Dates(_) => false,
        }
    }

    pub fn matches(&self, row: &Record) -> bool {
        evaluate(row, self)
    }
}

/// Initial value for a new filter of `kind` over `column`
pub fn default_value(kind: FilterKind, column: Option<&Column>) -> FilterValue {
    let uniques = column.map(|c| c.unique_values()).unwrap_or(&[]);
    match kind {
        FilterKind::Select | FilterKind::Radio => FilterValue::Single(
            uniques
                .first()
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        ),
        FilterKind::Checkbox => FilterValue::Many(uniques.to_vec()),
        FilterKind::Slider => {
            let (min, max) = column
                .and_then(|c| c.numeric_range())
                .unwrap_or((0.0, 100.0));
            FilterValue::Range(NumericRange::new(min, max))
        }
        FilterKind::Date => FilterValue::Dates(DateRange::default()),
    }
}

/// Evaluate one filter against one row.
///
/// A column missing from the row matches, so filters survive source switches
/// where the column no longer exists.
pub fn evaluate(row: &Record, filter: &FilterSpec) -> bool {
    let Some(cell) = lookup(row, &filter.column) else {
        return true;
    };

    match (&filter.kind, &filter.value) {
        (_, FilterValue::Null) => true,
        (FilterKind::Select | FilterKind::Radio, FilterValue::Single(wanted)) => {
            let wanted = display(wanted).trim().to_lowercase();
            wanted.is_empty() || display(cell).trim().to_lowercase() == wanted
        }
        (FilterKind::Checkbox, FilterValue::Many(allowed)) => {
            if allowed.is_empty() {
                return true;
            }
            let cell = display(cell);
            allowed.iter().any(|value| display(value) == cell)
        }
        (FilterKind::Slider, FilterValue::Range(range)) => match as_number(cell) {
            Some(n) => range.contains(n),
            None => true,
        },
        (FilterKind::Date, FilterValue::Dates(range)) => match as_timestamp(cell) {
            Some(ts) => {
                let day = ts.date();
                range.start.map_or(true, |start| day >= start) && range.end.map_or(true, |end| day <= end)
            }
            None => false,
        },
        // set_value keeps kind and value aligned; a stale pair filters nothing
        _ => true,
    }
}

/// Rows matching every filter, in input order
pub fn apply_filters(rows: &[Record], filters: &[FilterSpec]) -> Vec<Record> {
    rows.iter()
        .filter(|row| filters.iter().all(|filter| evaluate(row, filter)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SemanticType, TypeInferencer};
    use proptest::prelude::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn sales_rows() -> Vec<Record> {
        vec![
            record(json!({ "region": "N", "sales": 10 })),
            record(json!({ "region": "S", "sales": 20 })),
        ]
    }

    fn column(name: &str, rows: &[Record]) -> Column {
        TypeInferencer::new().build_column(name, rows)
    }

    #[test]
    fn test_select_filter_defaults_to_first_value() {
        let rows = sales_rows();
        let filter = FilterSpec::new(FilterKind::Select, &column("region", &rows), None);

        assert_eq!(filter.value, FilterValue::Single(json!("N")));
        assert_eq!(apply_filters(&rows, &[filter]), vec![rows[0].clone()]);
    }

    #[test]
    fn test_slider_filter() {
        let rows = sales_rows();
        let mut filter = FilterSpec::new(FilterKind::Slider, &column("sales", &rows), None);
        assert_eq!(filter.value, FilterValue::Range(NumericRange::new(10.0, 20.0)));

        filter.set_value(FilterValue::Range(NumericRange::new(15.0, 25.0))).unwrap();
        assert_eq!(apply_filters(&rows, &[filter]), vec![rows[1].clone()]);
    }

    #[test]
    fn test_defaults_without_enrichment() {
        assert_eq!(
            default_value(FilterKind::Radio, None),
            FilterValue::Single(json!(""))
        );
        assert_eq!(default_value(FilterKind::Checkbox, None), FilterValue::Many(vec![]));
        assert_eq!(
            default_value(FilterKind::Slider, None),
            FilterValue::Range(NumericRange::new(0.0, 100.0))
        );
        assert_eq!(
            default_value(FilterKind::Date, None),
            FilterValue::Dates(DateRange::default())
        );
    }

    #[test]
    fn test_select_is_case_insensitive_and_trimmed() {
        let rows = vec![record(json!({ "region": " north " }))];
        let mut filter = FilterSpec::new(FilterKind::Select, &column("region", &rows), None);
        filter.set_value(FilterValue::Single(json!("NORTH"))).unwrap();
        assert!(filter.matches(&rows[0]));
    }

    #[test]
    fn test_blank_select_is_noop() {
        let rows = sales_rows();
        let mut filter = FilterSpec::new(FilterKind::Select, &column("region", &rows), None);
        filter.set_value(FilterValue::Single(json!("  "))).unwrap();
        assert!(filter.is_noop());
        assert_eq!(apply_filters(&rows, &[filter]).len(), 2);
    }

    #[test]
    fn test_checkbox_membership() {
        let rows = vec![
            record(json!({ "code": 1 })),
            record(json!({ "code": "2" })),
            record(json!({ "code": 3 })),
        ];
        let mut filter = FilterSpec::new(FilterKind::Checkbox, &column("code", &rows), None);
        filter.set_value(FilterValue::Many(vec![json!("1"), json!(2)])).unwrap();
        assert_eq!(apply_filters(&rows, &[filter]), rows[..2].to_vec());
    }

    #[test]
    fn test_slider_skips_non_numeric_rows() {
        let rows = vec![record(json!({ "sales": "n/a" })), record(json!({ "sales": 5 }))];
        let mut filter = FilterSpec::new(FilterKind::Slider, &column("sales", &rows), None);
        filter
            .set_value(FilterValue::Range(NumericRange { min: Some(10.0), max: None }))
            .unwrap();
        assert_eq!(apply_filters(&rows, &[filter]), vec![rows[0].clone()]);
    }

    #[test]
    fn test_date_filter_bounds() {
        let rows = vec![
            record(json!({ "day": "2024-01-01" })),
            record(json!({ "day": "2024-01-15 12:30:00" })),
            record(json!({ "day": "2024-02-01" })),
            record(json!({ "day": "garbage" })),
        ];
        let col = column("day", &rows);
        assert_eq!(col.semantic_type, SemanticType::String);

        let mut filter = FilterSpec::new(FilterKind::Date, &col, None);
        assert!(!filter.is_noop());
        assert_eq!(apply_filters(&rows, &[filter.clone()]), rows[..3].to_vec());

        filter
            .set_value(FilterValue::Dates(DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 10),
                end: NaiveDate::from_ymd_opt(2024, 1, 15),
            }))
            .unwrap();
        assert_eq!(apply_filters(&rows, &[filter.clone()]), vec![rows[1].clone()]);

        filter
            .set_value(FilterValue::Dates(DateRange {
                start: None,
                end: NaiveDate::from_ymd_opt(2024, 1, 15),
            }))
            .unwrap();
        assert_eq!(apply_filters(&rows, &[filter]), rows[..2].to_vec());
    }

    #[test]
    fn test_missing_column_matches() {
        let rows = sales_rows();
        let mut filter = FilterSpec::new(FilterKind::Select, &column("region", &rows), None);
        filter.column = "territory".into();
        assert_eq!(apply_filters(&rows, &[filter]).len(), 2);
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let rows = vec![record(json!({ "Region": "N" })), record(json!({ "Region": "S" }))];
        let mut filter = FilterSpec::new(FilterKind::Radio, &column("region", &rows), None);
        filter.set_value(FilterValue::Single(json!("s"))).unwrap();
        assert_eq!(apply_filters(&rows, &[filter]), vec![rows[1].clone()]);
    }

    #[test]
    fn test_filters_combine_with_and() {
        let rows = sales_rows();
        let region = FilterSpec::new(FilterKind::Select, &column("region", &rows), None);
        let mut sales = FilterSpec::new(FilterKind::Slider, &column("sales", &rows), None);
        sales.set_value(FilterValue::Range(NumericRange::new(15.0, 25.0))).unwrap();
        assert!(apply_filters(&rows, &[region, sales]).is_empty());
    }

    #[test]
    fn test_set_value_rejects_wrong_shape() {
        let rows = sales_rows();
        let mut filter = FilterSpec::new(FilterKind::Slider, &column("sales", &rows), None);
        let before = filter.value.clone();

        let err = filter.set_value(FilterValue::Many(vec![json!(1)]));
        assert!(matches!(err, Err(DataError::FilterShape { .. })));
        assert_eq!(filter.value, before);
        assert!(filter.set_value(FilterValue::Null).is_ok());
    }

    #[test]
    fn test_value_json_shapes() {
        let parse = |v: Value| serde_json::from_value::<FilterValue>(v).unwrap();
        assert_eq!(parse(json!(null)), FilterValue::Null);
        assert_eq!(parse(json!("N")), FilterValue::Single(json!("N")));
        assert_eq!(parse(json!(["N", "S"])), FilterValue::Many(vec![json!("N"), json!("S")]));
        assert_eq!(parse(json!({ "min": 1, "max": 2 })), FilterValue::Range(NumericRange::new(1.0, 2.0)));
        assert_eq!(
            parse(json!({ "start": "2024-01-01", "end": null })),
            FilterValue::Dates(DateRange { start: NaiveDate::from_ymd_opt(2024, 1, 1), end: None })
        );
        assert_eq!(FilterValue::Range(NumericRange::new(1.0, 2.0)).to_json(), json!({ "min": 1.0, "max": 2.0 }));
    }

    fn rows_strategy() -> impl Strategy<Value = Vec<Record>> {
        proptest::collection::vec(
            ("[a-zA-Z ]{0,6}", proptest::option::of(-1000i64..1000)).prop_map(|(region, sales)| {
                let mut row = Record::new();
                row.insert("region".into(), json!(region));
                row.insert("sales".into(), sales.map(Value::from).unwrap_or(Value::Null));
                row
            }),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn prop_empty_filter_list_is_identity(rows in rows_strategy()) {
            prop_assert_eq!(apply_filters(&rows, &[]), rows);
        }

        #[test]
        fn prop_empty_checkbox_matches_everything(rows in rows_strategy()) {
            let mut filter = FilterSpec::new(FilterKind::Checkbox, &column("region", &rows), None);
            filter.set_value(FilterValue::Many(vec![])).unwrap();
            prop_assert_eq!(apply_filters(&rows, &[filter]), rows);
        }
    }
}
