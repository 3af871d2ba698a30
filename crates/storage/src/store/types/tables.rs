#![forbid(unsafe_code)]

use gl_core::model::{Column, ColumnType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableCreateRequest {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    pub id: String,
    pub name: String,
    pub columns: Vec<Column>, // creation order
    pub created_at_ms: i64,
}
