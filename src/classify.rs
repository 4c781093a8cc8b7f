use crate::data::{ColumnKind, Table};
use serde::Serialize;

/// Per-column schema row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
    pub missing_ratio: f64,
}

/// Result of classifying a table's columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub rows: usize,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    /// Fraction of missing cells over the whole table, in [0, 1]
    pub missing_ratio: f64,
    pub columns: Vec<ColumnInfo>,
}

impl ColumnSummary {
    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.iter().any(|c| c == name)
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical.iter().any(|c| c == name)
    }
}

/// Partition columns into numeric and categorical sets and measure missingness
pub fn classify(table: &Table) -> ColumnSummary {
    let rows = table.row_count();
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    let mut columns = Vec::with_capacity(table.column_count());
    let mut total_missing = 0usize;

    for column in table.columns() {
        match column.kind() {
            ColumnKind::Numeric => numeric.push(column.name.clone()),
            ColumnKind::Categorical => categorical.push(column.name.clone()),
        }

        let missing = column.missing_count();
        total_missing += missing;
        columns.push(ColumnInfo {
            name: column.name.clone(),
            kind: column.kind(),
            missing,
            missing_ratio: ratio(missing, rows),
        });
    }

    ColumnSummary {
        rows,
        numeric,
        categorical,
        missing_ratio: ratio(total_missing, rows * table.column_count()),
        columns,
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
