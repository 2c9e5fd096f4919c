use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::utils::error::{EtlError, Result};

/// 單一儲存格的值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// 數值欄位或可解析成數字的文字
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Date(_) | Value::Missing => None,
        }
    }

    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Missing => None,
        }
    }

    fn key(&self) -> CellKey<'_> {
        match self {
            Value::Text(s) => CellKey::Text(s),
            Value::Integer(i) => CellKey::Integer(*i),
            // -0.0 與 0.0 視為相同
            Value::Float(f) => CellKey::Float(if *f == 0.0 { 0 } else { f.to_bits() }),
            Value::Date(d) => CellKey::Date(*d),
            Value::Missing => CellKey::Missing,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("<missing>"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Text(&'a str),
    Integer(i64),
    Float(u64),
    Date(NaiveDate),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Date,
    Text,
    /// 整欄皆為缺值
    Empty,
}

impl ColumnType {
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut inferred = ColumnType::Empty;
        for value in values {
            let current = match value {
                Value::Missing => continue,
                Value::Integer(_) => ColumnType::Integer,
                Value::Float(_) => ColumnType::Float,
                Value::Date(_) => ColumnType::Date,
                Value::Text(_) => ColumnType::Text,
            };
            inferred = match (inferred, current) {
                (ColumnType::Empty, t) => t,
                (a, b) if a == b => a,
                (ColumnType::Integer, ColumnType::Float) | (ColumnType::Float, ColumnType::Integer) => {
                    ColumnType::Float
                }
                _ => return ColumnType::Text,
            };
        }
        inferred
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Date => "date",
            ColumnType::Text => "text",
            ColumnType::Empty => "empty",
        };
        f.write_str(name)
    }
}

pub type Row = Vec<Value>;

/// 記憶體中的表格：欄位名稱與每列對應的值
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RecordBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(EtlError::schema(format!("duplicate column '{}'", name)));
            }
        }

        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(EtlError::schema(format!(
                    "row {} has {} values but the batch has {} columns",
                    index,
                    row.len(),
                    columns.len()
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::schema(format!("required column '{}' is missing", name)))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[index])
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    pub fn column_type(&self, index: usize) -> ColumnType {
        ColumnType::infer(self.column_values(index))
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len()).map(|i| self.column_type(i)).collect()
    }

    pub(crate) fn rename_columns<F>(&mut self, rename: F) -> Result<()>
    where
        F: Fn(&str) -> String,
    {
        let renamed: Vec<String> = self.columns.iter().map(|c| rename(c)).collect();
        let mut seen = HashSet::new();
        for name in &renamed {
            if !seen.insert(name.as_str()) {
                return Err(EtlError::schema(format!(
                    "more than one column normalizes to '{}'",
                    name
                )));
            }
        }
        self.columns = renamed;
        Ok(())
    }

    pub(crate) fn map_column<F>(&mut self, index: usize, mut f: F)
    where
        F: FnMut(&Value) -> Value,
    {
        for row in &mut self.rows {
            row[index] = f(&row[index]);
        }
    }

    pub(crate) fn try_map_column<F>(&mut self, index: usize, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<Value>,
    {
        for row in &mut self.rows {
            row[index] = f(&row[index])?;
        }
        Ok(())
    }

    pub(crate) fn retain_rows<F>(&mut self, f: F)
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(f);
    }

    /// 與先前某列完全相同的列數（保留第一筆）
    pub fn duplicate_rows(&self) -> usize {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|row| !seen.insert(row.iter().map(Value::key).collect::<Vec<_>>()))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub total_columns: usize,
    pub missing_values: BTreeMap<String, usize>,
    pub duplicates: usize,
    pub data_types: BTreeMap<String, ColumnType>,
}

impl QualityReport {
    pub fn from_batch(batch: &RecordBatch) -> Self {
        let mut missing_values = BTreeMap::new();
        let mut data_types = BTreeMap::new();

        for (index, name) in batch.columns().iter().enumerate() {
            let missing = batch.column_values(index).filter(|v| v.is_missing()).count();
            missing_values.insert(name.clone(), missing);
            data_types.insert(name.clone(), batch.column_type(index));
        }

        Self {
            total_rows: batch.num_rows(),
            total_columns: batch.num_columns(),
            missing_values,
            duplicates: batch.duplicate_rows(),
            data_types,
        }
    }

    pub fn total_missing(&self) -> usize {
        self.missing_values.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub batch: RecordBatch,
    pub report: QualityReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub table: String,
    pub rows_written: usize,
    pub chunks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_column_type_inference() {
        assert_eq!(
            ColumnType::infer(&[Value::Integer(1), Value::Missing]),
            ColumnType::Integer
        );
        assert_eq!(
            ColumnType::infer(&[Value::Integer(1), Value::Float(2.5)]),
            ColumnType::Float
        );
        assert_eq!(
            ColumnType::infer(&[Value::Integer(1), text("a")]),
            ColumnType::Text
        );
        assert_eq!(ColumnType::infer(&[Value::Missing]), ColumnType::Empty);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = RecordBatch::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Value::Integer(1)]],
        );
        assert!(matches!(result, Err(EtlError::SchemaError { .. })));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let result = RecordBatch::new(vec!["a".to_string(), "a".to_string()], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_rows_keep_first() {
        let batch = RecordBatch::new(
            vec!["name".to_string(), "salary".to_string()],
            vec![
                vec![text("Ann"), Value::Float(10.0)],
                vec![text("Ann"), Value::Float(10.0)],
                vec![text("Ann"), Value::Float(11.0)],
                vec![text("Ann"), Value::Float(10.0)],
                vec![Value::Missing, Value::Missing],
                vec![Value::Missing, Value::Missing],
            ],
        )
        .unwrap();

        assert_eq!(batch.duplicate_rows(), 3);
    }

    #[test]
    fn test_quality_report() {
        let batch = RecordBatch::new(
            vec!["name".to_string(), "dob".to_string()],
            vec![
                vec![text("Ann"), Value::Missing],
                vec![text("Bob"), Value::Date(NaiveDate::from_ymd_opt(1990, 1, 31).unwrap())],
            ],
        )
        .unwrap();

        let report = QualityReport::from_batch(&batch);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.total_columns, 2);
        assert_eq!(report.missing_values["dob"], 1);
        assert_eq!(report.missing_values["name"], 0);
        assert_eq!(report.data_types["dob"], ColumnType::Date);
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.total_missing(), 1);
    }

    #[test]
    fn test_value_serializes_missing_as_null() {
        let json = serde_json::to_string(&vec![Value::Missing, Value::Integer(3)]).unwrap();
        assert_eq!(json, "[null,3]");
    }
}
