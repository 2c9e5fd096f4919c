use crate::core::{RecordBatch, Value};
use crate::utils::error::{EtlError, Result};
use std::io::Read;
use std::path::Path;

/// 讀檔時視為缺值的字串（與常見資料框架的預設相同）
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na_token(field: &str) -> bool {
    NA_TOKENS.contains(&field)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawKind {
    Integer,
    Float,
    Text,
}

/// 讀取 CSV 檔案，不做任何清理
pub fn extract_csv(path: &Path) -> Result<RecordBatch> {
    tracing::info!("📥 Extracting data from: {}", path.display());

    if !path.is_file() {
        return Err(EtlError::SourceNotFound {
            path: path.display().to_string(),
        });
    }

    let file = std::fs::File::open(path)?;
    let batch = extract_csv_reader(file)?;

    tracing::info!(
        "✅ Extracted {} rows and {} columns",
        batch.num_rows(),
        batch.num_columns()
    );
    Ok(batch)
}

pub fn extract_csv_reader<R: Read>(reader: R) -> Result<RecordBatch> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        raw_rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    tracing::debug!("Read {} raw records", raw_rows.len());

    // 以整欄判斷型別，與一般資料框架讀 CSV 的行為一致
    let kinds: Vec<RawKind> = (0..columns.len())
        .map(|index| infer_kind(raw_rows.iter().map(|row| row[index].as_str())))
        .collect();

    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&kinds)
                .map(|(field, kind)| raw_value(field, *kind))
                .collect()
        })
        .collect();

    RecordBatch::new(columns, rows)
}

fn infer_kind<'a>(fields: impl Iterator<Item = &'a str>) -> RawKind {
    let mut kind = RawKind::Integer;
    for field in fields.filter(|f| !is_na_token(f)) {
        if kind == RawKind::Integer && field.parse::<i64>().is_err() {
            kind = RawKind::Float;
        }
        if kind == RawKind::Float && field.parse::<f64>().is_err() {
            return RawKind::Text;
        }
    }
    kind
}

fn raw_value(field: String, kind: RawKind) -> Value {
    if is_na_token(&field) {
        return Value::Missing;
    }
    match kind {
        RawKind::Integer => field.parse().map(Value::Integer).unwrap_or(Value::Text(field)),
        RawKind::Float => field.parse().map(Value::Float).unwrap_or(Value::Text(field)),
        RawKind::Text => Value::Text(field),
    }
}
