//! Cleaning rules for the HR dataset.
//!
//! [`Transformer::transform`] runs the steps in a fixed order on a copy of
//! the extracted batch:
//!
//! 1. normalize column names
//! 2. parse the date columns as day/month/year
//! 3. parse the salary column as a currency amount
//! 4. trim the text columns
//! 5. fill the leave counters with zero and make them integers
//! 6. drop rows with an out-of-range age or a non-positive salary
//!
//! Values that fail to parse become [`Value::Missing`]; only structural
//! problems (a required column is absent, a counter holds text) are errors.

use crate::core::extract::is_na_token;
use crate::core::{QualityReport, RecordBatch, TransformOutput, Value};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// 開頭的正負號後可接一個貨幣符號
static CURRENCY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-+]?)\s*[$€£¥]\s*").expect("valid currency regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningRules {
    pub date_columns: Vec<String>,
    pub date_format: String,
    pub salary_column: String,
    pub age_column: String,
    pub min_age: f64,
    pub max_age: f64,
    pub text_columns: Vec<String>,
    pub leave_columns: Vec<String>,
}

impl Default for CleaningRules {
    fn default() -> Self {
        let strings = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        Self {
            date_columns: strings(&["dob", "hire_date"]),
            date_format: "%d/%m/%Y".to_string(),
            salary_column: "salary".to_string(),
            age_column: "age".to_string(),
            min_age: 18.0,
            max_age: 100.0,
            text_columns: strings(&[
                "full_name",
                "gender",
                "nationality",
                "ethnicity",
                "job_title",
                "department",
                "job_level",
                "status",
                "emp_type",
                "salary_band",
                "location",
            ]),
            leave_columns: strings(&["days_absent", "sick_days", "annual_leave"]),
        }
    }
}

impl Validate for CleaningRules {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("date_format", &self.date_format)?;
        validate_non_empty_string("salary_column", &self.salary_column)?;
        validate_non_empty_string("age_column", &self.age_column)?;
        validate_range("min_age", self.min_age, 0.0, self.max_age)?;
        Ok(())
    }
}

/// lowercase、去頭尾空白、空白改底線、移除括號
pub fn normalize_column_name(name: &str) -> String {
    // 括號移除後可能露出尾端的 tab 等空白，需再 trim 一次
    name.to_lowercase()
        .trim()
        .replace(' ', "_")
        .replace(['(', ')'], "")
        .trim()
        .to_string()
}

pub fn parse_date(value: &Value, format: &str) -> Value {
    match value {
        Value::Date(date) => Value::Date(*date),
        Value::Text(s) => {
            let s = s.trim();
            if format.contains("%Y") && !has_four_digit_year(s) {
                return Value::Missing;
            }
            NaiveDate::parse_from_str(s, format)
                .map(Value::Date)
                .unwrap_or(Value::Missing)
        }
        _ => Value::Missing,
    }
}

/// chrono 的 `%Y` 接受任意位數，年份必須剛好四位數
fn has_four_digit_year(s: &str) -> bool {
    let groups = s.split(|c: char| !c.is_ascii_digit()).filter(|g| !g.is_empty());
    let mut found = false;
    for group in groups {
        match group.len() {
            4 => found = true,
            len if len > 4 => return false,
            _ => {}
        }
    }
    found
}

pub fn parse_salary(value: &Value) -> Value {
    let amount = match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::Text(s) => {
            let stripped = CURRENCY_PREFIX.replace(s.trim(), "$1").replace(',', "");
            stripped.trim().parse::<f64>().ok()
        }
        Value::Date(_) | Value::Missing => None,
    };

    match amount {
        Some(f) if f.is_finite() => Value::Float(f),
        _ => Value::Missing,
    }
}

pub fn trim_text(value: &Value) -> Value {
    match value {
        Value::Text(s) => Value::Text(s.trim().to_string()),
        other => other.clone(),
    }
}

/// 缺值補 0，負值視為 0，其餘轉為整數
pub fn impute_counter(column: &str, value: &Value) -> Result<Value> {
    let count = match value {
        Value::Missing => 0,
        Value::Float(f) if f.is_nan() => 0,
        Value::Text(s) if is_na_token(s.trim()) => 0,
        Value::Integer(i) => *i,
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        Value::Text(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<i64>() {
                Ok(i) => i,
                Err(_) => match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() => f.trunc() as i64,
                    _ => {
                        return Err(EtlError::schema(format!(
                            "column '{}' holds non-numeric value '{}'",
                            column, s
                        )))
                    }
                },
            }
        }
        other => {
            return Err(EtlError::schema(format!(
                "column '{}' holds non-numeric value '{}'",
                column, other
            )))
        }
    };

    if count < 0 {
        tracing::debug!("Clamping negative {} value {} to 0", column, count);
    }
    Ok(Value::Integer(count.max(0)))
}

#[derive(Debug, Clone, Default)]
pub struct Transformer {
    rules: CleaningRules,
}

impl Transformer {
    pub fn new(rules: CleaningRules) -> Self {
        Self { rules }
    }

    pub fn transform(&self, input: &RecordBatch) -> Result<TransformOutput> {
        tracing::info!("🔧 Starting data transformation on {} rows", input.num_rows());
        let rules = &self.rules;
        let mut batch = input.clone();

        batch.rename_columns(normalize_column_name)?;
        tracing::info!("  ✓ Column names standardized");

        for column in &rules.date_columns {
            let index = batch.require_column(column)?;
            batch.map_column(index, |v| parse_date(v, &rules.date_format));
        }
        tracing::info!("  ✓ Dates parsed");

        let salary_index = batch.require_column(&rules.salary_column)?;
        batch.map_column(salary_index, parse_salary);
        tracing::info!("  ✓ Salary cleaned");

        for column in &rules.text_columns {
            if let Some(index) = batch.column_index(column) {
                batch.map_column(index, trim_text);
            }
        }
        tracing::info!("  ✓ Text fields cleaned");

        for column in &rules.leave_columns {
            if let Some(index) = batch.column_index(column) {
                batch.try_map_column(index, |v| impute_counter(column, v))?;
            }
        }
        tracing::info!("  ✓ Missing values handled");

        let age_index = batch.require_column(&rules.age_column)?;
        let before = batch.num_rows();
        batch.retain_rows(|row| {
            row[age_index]
                .as_f64()
                .is_some_and(|age| age >= rules.min_age && age <= rules.max_age)
        });
        let after_age = batch.num_rows();
        batch.retain_rows(|row| row[salary_index].as_f64().is_some_and(|salary| salary > 0.0));
        tracing::info!(
            "  ✓ Data validated ({} rows failed the age check, {} the salary check)",
            before - after_age,
            after_age - batch.num_rows()
        );

        let report = QualityReport::from_batch(&batch);
        tracing::info!("✅ Transformation complete: {} rows", batch.num_rows());

        Ok(TransformOutput { batch, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnType;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn hr_batch(rows: Vec<Vec<Value>>) -> RecordBatch {
        let columns = ["Full Name", "Age", "DOB", "Hire_Date", "Salary", "Sick Days"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        RecordBatch::new(columns, rows).unwrap()
    }

    fn employee(name: &str, age: i64, salary: &str, sick: Value) -> Vec<Value> {
        vec![
            text(name),
            Value::Integer(age),
            text("31/01/1990"),
            text("01/06/2015"),
            text(salary),
            sick,
        ]
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name(" Salary (USD) "), "salary_usd");
        assert_eq!(normalize_column_name("Hire_Date"), "hire_date");
        assert_eq!(normalize_column_name("Days Absent"), "days_absent");
    }

    #[test]
    fn test_normalize_column_name_is_idempotent() {
        for name in ["Full Name", " Salary (USD) ", "DOB", "(x) y", "a  b", "Emp_Type ", "Dept\t()", "Dept ()"] {
            let once = normalize_column_name(name);
            assert_eq!(normalize_column_name(&once), once, "input: {name:?}");
        }
    }

    #[test]
    fn test_parse_salary() {
        assert_eq!(parse_salary(&text("$72,500.00")), Value::Float(72500.0));
        assert_eq!(parse_salary(&text(" 55,000 ")), Value::Float(55000.0));
        assert_eq!(parse_salary(&text("-$5,000")), Value::Float(-5000.0));
        assert_eq!(parse_salary(&Value::Integer(40000)), Value::Float(40000.0));
        assert_eq!(parse_salary(&text("N/A")), Value::Missing);
        assert_eq!(parse_salary(&text("inf")), Value::Missing);
        assert_eq!(parse_salary(&Value::Missing), Value::Missing);
    }

    #[test]
    fn test_parse_date() {
        let parsed = parse_date(&text("31/01/1990"), "%d/%m/%Y");
        assert_eq!(
            parsed,
            Value::Date(NaiveDate::from_ymd_opt(1990, 1, 31).unwrap())
        );

        assert_eq!(parse_date(&text("1990-31-01"), "%d/%m/%Y"), Value::Missing);
        assert_eq!(parse_date(&text("31/13/1990"), "%d/%m/%Y"), Value::Missing);
        assert_eq!(parse_date(&text("31/01/90"), "%d/%m/%Y"), Value::Missing);
        assert_eq!(parse_date(&text("31/01/01990"), "%d/%m/%Y"), Value::Missing);
        assert_eq!(
            parse_date(&text(" 1/2/1990 "), "%d/%m/%Y"),
            Value::Date(NaiveDate::from_ymd_opt(1990, 2, 1).unwrap())
        );
        assert_eq!(parse_date(&Value::Missing, "%d/%m/%Y"), Value::Missing);
        assert_eq!(parse_date(&Value::Integer(1990), "%d/%m/%Y"), Value::Missing);
    }

    #[test]
    fn test_impute_counter() {
        assert_eq!(impute_counter("sick_days", &Value::Missing).unwrap(), Value::Integer(0));
        assert_eq!(impute_counter("sick_days", &Value::Float(3.0)).unwrap(), Value::Integer(3));
        assert_eq!(impute_counter("sick_days", &text(" 4 ")).unwrap(), Value::Integer(4));
        assert_eq!(impute_counter("sick_days", &Value::Integer(-2)).unwrap(), Value::Integer(0));
        assert_eq!(impute_counter("sick_days", &text("N/A")).unwrap(), Value::Integer(0));
        assert_eq!(impute_counter("sick_days", &Value::Float(f64::NAN)).unwrap(), Value::Integer(0));
        assert!(matches!(
            impute_counter("sick_days", &text("lots")),
            Err(EtlError::SchemaError { .. })
        ));
    }

    #[test]
    fn test_transform_filters_invalid_rows() {
        let input = hr_batch(vec![
            employee("Ann", 34, "$72,500.00", Value::Integer(1)),
            employee("Kid", 17, "$10,000.00", Value::Integer(0)),
            employee("Old", 101, "$10,000.00", Value::Integer(0)),
            employee("Zero", 40, "$0.00", Value::Integer(0)),
            employee("Unknown", 40, "N/A", Value::Missing),
            employee("Edge", 18, "1", Value::Missing),
        ]);

        let output = Transformer::default().transform(&input).unwrap();
        let batch = &output.batch;

        assert_eq!(batch.num_rows(), 2);
        for row in 0..batch.num_rows() {
            let age = batch.value(row, "age").and_then(Value::as_f64).unwrap();
            let salary = batch.value(row, "salary").and_then(Value::as_f64).unwrap();
            assert!((18.0..=100.0).contains(&age));
            assert!(salary > 0.0);
        }
        assert_eq!(batch.value(0, "salary"), Some(&Value::Float(72500.0)));
        assert_eq!(batch.value(1, "sick_days"), Some(&Value::Integer(0)));
        assert_eq!(output.report.total_rows, 2);
    }

    #[test]
    fn test_transform_does_not_touch_input() {
        let input = hr_batch(vec![employee("  Ann ", 34, "$1,000", Value::Missing)]);
        let snapshot = input.clone();

        let output = Transformer::default().transform(&input).unwrap();

        assert_eq!(input, snapshot);
        assert_eq!(output.batch.columns()[0], "full_name");
        assert_eq!(output.batch.value(0, "full_name"), Some(&text("Ann")));
    }

    #[test]
    fn test_transform_report_types_and_missing() {
        let mut row = employee("Ann", 34, "$1,000", Value::Missing);
        row[2] = text("1990-31-01");
        let input = hr_batch(vec![row]);

        let report = Transformer::default().transform(&input).unwrap().report;

        assert_eq!(report.missing_values["dob"], 1);
        assert_eq!(report.missing_values["sick_days"], 0);
        assert_eq!(report.data_types["hire_date"], ColumnType::Date);
        assert_eq!(report.data_types["salary"], ColumnType::Float);
        assert_eq!(report.data_types["sick_days"], ColumnType::Integer);
    }

    #[test]
    fn test_transform_null_tokens_from_csv() {
        let data = "\
Full Name,Age,DOB,Hire_Date,Department,Salary,Sick Days
Ann,34,31/01/1990,01/06/2015,NA,\"$1,000\",N/A
Bob,40,31/01/1985,01/06/2010,IT,\"$2,000\",3
";
        let input = crate::core::extract::extract_csv_reader(data.as_bytes()).unwrap();

        let output = Transformer::default().transform(&input).unwrap();

        assert_eq!(output.batch.num_rows(), 2);
        assert_eq!(output.batch.value(0, "sick_days"), Some(&Value::Integer(0)));
        assert_eq!(output.batch.value(1, "sick_days"), Some(&Value::Integer(3)));
        assert_eq!(output.batch.value(0, "department"), Some(&Value::Missing));
        assert_eq!(output.report.missing_values["department"], 1);
        assert_eq!(output.report.missing_values["sick_days"], 0);
    }

    #[test]
    fn test_transform_missing_required_column() {
        let input = RecordBatch::new(
            vec!["Full Name".to_string(), "Age".to_string()],
            vec![vec![text("Ann"), Value::Integer(30)]],
        )
        .unwrap();

        let err = Transformer::default().transform(&input).unwrap_err();
        assert!(matches!(err, EtlError::SchemaError { .. }));
        assert!(err.to_string().contains("dob"));
    }

    #[test]
    fn test_transform_colliding_column_names() {
        let input = RecordBatch::new(vec!["Sick Days".to_string(), "sick_days".to_string()], vec![])
            .unwrap();
        assert!(Transformer::default().transform(&input).is_err());
    }

    #[test]
    fn test_default_rules_are_valid() {
        assert!(CleaningRules::default().validate().is_ok());

        let rules = CleaningRules {
            min_age: 120.0,
            ..CleaningRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
