use gridlink_core::{ColumnInfo, ColumnMeta, ForeignKeyInfo, QueryResult, Row, Value};
use std::time::Duration;

pub fn table_result(column_names: &[&str], rows: Vec<Row>) -> QueryResult {
    let columns = column_names
        .iter()
        .map(|name| column(*name, "TEXT"))
        .collect();

    QueryResult::table(columns, rows, Duration::ZERO)
}

pub fn scalar_result(value: Value) -> QueryResult {
    table_result(&["count(*)"], vec![vec![value]])
}

pub fn column(name: impl Into<String>, type_name: impl Into<String>) -> ColumnMeta {
    ColumnMeta::new(name, type_name)
}

pub fn columns(specs: &[(&str, &str)]) -> Vec<ColumnInfo> {
    specs
        .iter()
        .map(|(name, type_name)| ColumnInfo::new(*name, *type_name))
        .collect()
}

pub fn foreign_key(
    id: i64,
    column: impl Into<String>,
    referenced_table: impl Into<String>,
    referenced_column: impl Into<String>,
) -> ForeignKeyInfo {
    ForeignKeyInfo {
        id,
        column: column.into(),
        referenced_table: referenced_table.into(),
        referenced_column: referenced_column.into(),
    }
}

pub fn int_cell(value: i64) -> Value {
    Value::Int(value)
}

pub fn text_cell(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}
