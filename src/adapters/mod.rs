// Adapters layer: concrete table stores behind the `TableStore` port.

pub mod postgres;
pub mod sqlite;

use crate::core::{ColumnType, RecordBatch};

/// 以雙引號包住識別字，內含的雙引號重複一次
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn create_table_sql(
    table: &str,
    batch: &RecordBatch,
    types: &[ColumnType],
    if_not_exists: bool,
    sql_type: fn(ColumnType) -> &'static str,
) -> String {
    let columns: Vec<String> = batch
        .columns()
        .iter()
        .zip(types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), sql_type(*ty)))
        .collect();

    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_ident(table),
        columns.join(", ")
    )
}

pub(crate) fn column_list(batch: &RecordBatch) -> String {
    batch
        .columns()
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}
