//! Date-indexed tabular series returned by providers, and the record
//! format used by the raw passthrough endpoints

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// ISO-8601 calendar date format used on the wire
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Daily table keyed by date (ascending), each row holding named numeric columns.
/// A column may be missing on some rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    rows: BTreeMap<NaiveDate, BTreeMap<String, f64>>,
}

/// One row of a formatted series: `{"date": "2022-01-01", "T2M": 3.1, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub date: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl TimeSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` on the row for `date`, creating the row if needed
    pub fn insert(&mut self, date: NaiveDate, column: impl Into<String>, value: f64) {
        self.rows
            .entry(date)
            .or_default()
            .insert(column.into(), value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of dated rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.rows.keys()
    }

    #[must_use]
    pub fn get(&self, date: &NaiveDate, column: &str) -> Option<f64> {
        self.rows.get(date).and_then(|row| row.get(column)).copied()
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.values().any(|row| row.contains_key(column))
    }

    /// All column names present on at least one row
    #[must_use]
    pub fn columns(&self) -> BTreeSet<&str> {
        self.rows
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect()
    }

    /// Values of `column` in date order, skipping rows where it is missing
    #[must_use]
    pub fn column(&self, column: &str) -> Vec<f64> {
        self.rows
            .values()
            .filter_map(|row| row.get(column).copied())
            .collect()
    }

    /// Copy `from` into `to` on every row that has it, leaving `from` in place
    pub fn alias_column(&mut self, from: &str, to: &str) {
        for row in self.rows.values_mut() {
            if let Some(v) = row.get(from).copied() {
                row.insert(to.to_string(), v);
            }
        }
    }

    /// Ordered records holding the date and the requested `fields`.
    /// Fields missing on a row become `None`.
    #[must_use]
    pub fn to_records(&self, fields: &[&str]) -> Vec<TimeSeriesRecord> {
        self.rows
            .iter()
            .map(|(date, row)| TimeSeriesRecord {
                date: date.format(ISO_DATE).to_string(),
                values: fields
                    .iter()
                    .map(|f| ((*f).to_string(), row.get(*f).copied()))
                    .collect(),
            })
            .collect()
    }
}

impl FromIterator<(NaiveDate, String, f64)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, String, f64)>>(iter: I) -> Self {
        let mut series = TimeSeries::new();
        for (date, column, value) in iter {
            series.insert(date, column, value);
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_series_formats_to_empty_list() {
        let series = TimeSeries::new();
        assert!(series.to_records(&["T2M"]).is_empty());
    }

    #[test]
    fn test_two_rows_format_with_iso_dates() {
        let mut series = TimeSeries::new();
        // inserted out of order, formatted ascending
        series.insert(date(2022, 1, 2), "T2M", 4.5);
        series.insert(date(2022, 1, 1), "T2M", 3.0);
        series.insert(date(2022, 1, 1), "WS10M", 2.2);

        let records = series.to_records(&["T2M", "WS10M"]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, "2022-01-01");
        assert_eq!(records[1].date, "2022-01-02");
        assert_eq!(records[0].values["T2M"], Some(3.0));
        assert_eq!(records[0].values["WS10M"], Some(2.2));
        assert_eq!(records[1].values["WS10M"], None);
    }

    #[test]
    fn test_record_serializes_flat() {
        let mut series = TimeSeries::new();
        series.insert(date(2022, 1, 1), "precip_mm", 1.5);
        let records = series.to_records(&["precip_mm", "missing"]);
        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"date": "2022-01-01", "precip_mm": 1.5, "missing": null}])
        );
    }

    #[test]
    fn test_column_access_and_alias() {
        let mut series: TimeSeries = [
            (date(2022, 1, 1), "PRECTOTCORR".to_string(), 0.5),
            (date(2022, 1, 2), "PRECTOTCORR".to_string(), 1.5),
            (date(2022, 1, 2), "T2M".to_string(), 10.0),
        ]
        .into_iter()
        .collect();

        assert!(!series.has_column("PRECTOT"));
        series.alias_column("PRECTOTCORR", "PRECTOT");
        assert_eq!(series.column("PRECTOT"), vec![0.5, 1.5]);
        assert_eq!(series.column("T2M"), vec![10.0]);
        assert_eq!(series.len(), 2);
        assert!(series.columns().contains("PRECTOTCORR"));
    }
}
