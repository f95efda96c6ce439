//! Immutable tabular snapshot of student records.
//!
//! Records are JSON objects; the loader accepts either a JSON array or an
//! NDJSON stream. Cleaning steps return a new snapshot instead of mutating
//! in place so each report section sees the same input.

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub type Record = Map<String, Value>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing dataset {}", path.display()))
    }

    /// Parse a JSON array of records or an NDJSON stream of records.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            bail!("dataset is empty");
        }

        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return match value {
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| into_record(item, idx + 1))
                    .collect::<Result<Vec<_>>>()
                    .map(Self::from_records),
                Value::Object(record) => Ok(Self::from_records(vec![record])),
                _ => bail!("unsupported dataset; expected an array of objects"),
            };
        }

        let mut records = Vec::new();
        for (idx, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line)
                .with_context(|| format!("unable to parse record on line {}", idx + 1))?;
            records.push(into_record(value, idx + 1)?);
        }
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Every column name seen in any record, sorted.
    pub fn columns(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .flat_map(|record| record.keys().map(String::as_str))
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.records.iter().any(|record| record.contains_key(name))
    }

    /// Text values of `name`, one per record; missing or null cells are `None`.
    pub fn text_column(&self, name: &str) -> Result<Vec<Option<String>>> {
        self.require_column(name)?;
        self.records
            .iter()
            .enumerate()
            .map(|(idx, record)| match record.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
                Some(Value::Number(number)) => Ok(Some(number.to_string())),
                Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
                Some(other) => Err(anyhow!(
                    "column '{name}' row {} holds {} instead of text",
                    idx + 1,
                    type_name(other)
                )),
            })
            .collect()
    }

    /// Numeric values of `name`; numeric strings are accepted.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.require_column(name)?;
        self.records
            .iter()
            .enumerate()
            .map(|(idx, record)| numeric_cell(record, name, idx))
            .collect()
    }

    /// Non-null numeric values of `name`.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.numeric_column(name)?.into_iter().flatten().collect())
    }

    /// Rows where both the label column and the value column are present.
    pub fn labeled_values(&self, label: &str, value: &str) -> Result<Vec<(String, f64)>> {
        let labels = self.text_column(label)?;
        let values = self.numeric_column(value)?;
        Ok(labels
            .into_iter()
            .zip(values)
            .filter_map(|(label, value)| Some((label?, value?)))
            .collect())
    }

    /// Rows where both numeric columns are present.
    pub fn numeric_pairs(&self, x: &str, y: &str) -> Result<Vec<(f64, f64)>> {
        let xs = self.numeric_column(x)?;
        let ys = self.numeric_column(y)?;
        Ok(xs
            .into_iter()
            .zip(ys)
            .filter_map(|(x, y)| Some((x?, y?)))
            .collect())
    }

    /// Copy of the dataset with exact text matches in `column` replaced.
    pub fn with_replacements(&self, column: &str, replacements: &[(&str, &str)]) -> Self {
        let records = self
            .records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                if let Some(Value::String(text)) = record.get_mut(column) {
                    if let Some((_, to)) = replacements
                        .iter()
                        .find(|(from, _)| text.as_str() == *from)
                    {
                        *text = (*to).to_string();
                    }
                }
                record
            })
            .collect();
        Self::from_records(records)
    }

    /// Copy of the dataset with `column` computed from each record.
    pub fn with_derived<F>(&self, column: &str, derive: F) -> Self
    where
        F: Fn(&Record) -> Option<Value>,
    {
        let records = self
            .records
            .iter()
            .map(|record| {
                let mut next = record.clone();
                next.insert(column.to_string(), derive(record).unwrap_or(Value::Null));
                next
            })
            .collect();
        Self::from_records(records)
    }

    fn require_column(&self, name: &str) -> Result<()> {
        if self.has_column(name) {
            return Ok(());
        }
        let available: Vec<&str> = self.columns().into_iter().collect();
        bail!(
            "column '{name}' not found (available: {})",
            if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            }
        )
    }
}

/// Read a numeric cell from a record, accepting numeric strings.
pub fn numeric_cell(record: &Record, name: &str, idx: usize) -> Result<Option<f64>> {
    match record.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => finite(number.as_f64(), name, idx, &number.to_string()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => finite(text.trim().parse::<f64>().ok(), name, idx, text),
        Some(other) => Err(anyhow!(
            "column '{name}' row {} holds {} instead of a number",
            idx + 1,
            type_name(other)
        )),
    }
}

fn into_record(value: Value, position: usize) -> Result<Record> {
    match value {
        Value::Object(record) => Ok(record),
        other => bail!(
            "record {position} is {} instead of an object",
            type_name(&other)
        ),
    }
}

/// NaN and infinities are rejected; they cannot round-trip through JSON.
fn finite(value: Option<f64>, name: &str, idx: usize, raw: &str) -> Result<Option<f64>> {
    match value {
        Some(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(anyhow!(
            "column '{name}' row {} holds non-numeric value '{raw}'",
            idx + 1
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_accepts_array_and_ndjson() {
        let array = Dataset::parse(r#"[{"Major": "ME", "GPA": 3.1}, {"Major": "EE"}]"#).unwrap();
        assert_eq!(array.len(), 2);

        let ndjson = "{\"Major\": \"ME\"}\n\n{\"Major\": \"EE\", \"GPA\": \"3.4\"}\n";
        let parsed = Dataset::parse(ndjson).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed.numeric_column("GPA").unwrap(),
            vec![None, Some(3.4)]
        );
    }

    #[test]
    fn numeric_columns_reject_non_finite_values() {
        for raw in ["NaN", "inf", "-inf", "infinity"] {
            let input = format!(r#"[{{"GPA": 3.1}}, {{"GPA": "{raw}"}}]"#);
            let data = Dataset::parse(&input).unwrap();
            let err = data.numeric_column("GPA").unwrap_err().to_string();
            assert!(err.contains("row 2"), "{raw}: {err}");
            assert!(err.contains(raw), "{raw}: {err}");
        }
    }

    #[test]
    fn parse_rejects_non_object_records() {
        let err = Dataset::parse("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("record 1 is a number"));

        let err = Dataset::parse("{\"a\": 1}\nnot json").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn missing_column_lists_available_columns() {
        let data = Dataset::parse(r#"[{"Major": "ME", "GPA": 3.0}]"#).unwrap();
        let err = data.numeric_column("Host GPA").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("column 'Host GPA' not found"));
        assert!(message.contains("GPA, Major"));
    }

    #[test]
    fn numeric_column_rejects_text() {
        let data = Dataset::parse(r#"[{"GPA": "three"}]"#).unwrap();
        let err = data.numeric_column("GPA").unwrap_err();
        assert!(err.to_string().contains("non-numeric value 'three'"));
    }

    #[test]
    fn replacements_leave_original_untouched() {
        let data = Dataset::parse(r#"[{"Sponsor Name": "KFUPM-Partial Sponsor"}, {"Sponsor Name": "SABIC"}]"#)
            .unwrap();
        let cleaned = data.with_replacements(
            "Sponsor Name",
            &[("KFUPM-Partial Sponsor", "Partially KFUPM")],
        );
        assert_eq!(
            cleaned.text_column("Sponsor Name").unwrap(),
            vec![Some("Partially KFUPM".into()), Some("SABIC".into())]
        );
        assert_eq!(
            data.text_column("Sponsor Name").unwrap()[0].as_deref(),
            Some("KFUPM-Partial Sponsor")
        );
    }

    #[test]
    fn derived_and_paired_columns() {
        let data = Dataset::from_records(vec![
            json!({"GPA": 3.5, "Host GPA": 3.0}).as_object().cloned().unwrap(),
            json!({"GPA": 3.0}).as_object().cloned().unwrap(),
        ]);
        let diff = data.with_derived("GPA Difference", |record| {
            let home = record.get("GPA")?.as_f64()?;
            let host = record.get("Host GPA")?.as_f64()?;
            Some(json!(home - host))
        });
        assert_eq!(diff.numeric_values("GPA Difference").unwrap(), vec![0.5]);
        assert_eq!(
            data.numeric_pairs("GPA", "Host GPA").unwrap(),
            vec![(3.5, 3.0)]
        );
    }

    #[test]
    fn from_path_adds_file_context() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "").unwrap();
        let err = Dataset::from_path(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("dataset is empty"));
    }
}
