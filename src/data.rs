use crate::error::{LabError, LabResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::Read;

/// Cell spellings treated as missing when loading text data
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

/// A named, typed, nullable column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values.into_iter().map(|v| v.map(Into::into)).collect()),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Categorical(v) => v[row].is_none(),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_missing(row)).count()
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Categorical(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    fn take(&self, rows: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(rows.iter().map(|&r| v[r].clone()).collect())
            }
        };
        Column {
            name: self.name.clone(),
            data,
        }
    }

    /// Infer the column type from raw text cells: numeric when every present cell parses
    fn from_cells(name: String, cells: Vec<Option<String>>) -> Column {
        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                None => Some(None),
                Some(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).map(Some),
            })
            .collect();

        match parsed {
            Some(values) => Column::numeric(name, values),
            None => Column {
                name,
                data: ColumnData::Categorical(cells),
            },
        }
    }
}

/// Column-oriented, immutable dataset. Every column has `row_count` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> LabResult<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);

        let mut seen = HashSet::new();
        for column in &columns {
            if column.len() != row_count {
                return Err(LabError::Data(format!(
                    "Column '{}' has {} rows, expected {}",
                    column.name,
                    column.len(),
                    row_count
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(LabError::Data(format!("Duplicate column name '{}'", column.name)));
            }
        }

        Ok(Self { columns, row_count })
    }

    /// Build a table from header names and rows of raw text cells
    pub fn from_text_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> LabResult<Self> {
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); headers.len()];

        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(LabError::Data(format!(
                    "Row {} has {} fields, expected {}",
                    row_idx + 1,
                    row.len(),
                    headers.len()
                )));
            }
            for (col_idx, cell) in row.into_iter().enumerate() {
                cells[col_idx].push(cell);
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, col)| Column::from_cells(name, col))
            .collect();

        Table::new(columns)
    }

    /// Read CSV with a header row
    pub fn from_csv_reader<R: Read>(reader: R) -> LabResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(String::from).collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(missing_to_none).collect());
        }

        Table::from_text_rows(headers, rows)
    }

    pub fn from_csv_str(text: &str) -> LabResult<Self> {
        Table::from_csv_reader(text.as_bytes())
    }

    /// Create a table from a JSON array of objects; columns follow the keys of the first object
    pub fn from_json(value: &Value) -> LabResult<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| LabError::Data("Input data must be a JSON array of objects".to_string()))?;

        let first_obj = match array.first() {
            Some(first) => first
                .as_object()
                .ok_or_else(|| LabError::Data("Items in array must be objects".to_string()))?,
            None => return Table::new(Vec::new()),
        };

        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| LabError::Data("Items in array must be objects".to_string()))?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => missing_to_none(s),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    Some(Value::Bool(b)) => Some(b.to_string()),
                    Some(Value::Null) | None => None,
                    _ => {
                        return Err(LabError::Data(format!(
                            "Unsupported value type for field '{}'",
                            header
                        )))
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Table::from_text_rows(headers, rows)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// New table holding the given rows, in the given order
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// Indices of rows with a value in every listed column. Unknown names are ignored.
    pub fn complete_rows(&self, columns: &[&str]) -> Vec<usize> {
        let cols: Vec<&Column> = columns.iter().filter_map(|name| self.column(name)).collect();
        (0..self.row_count)
            .filter(|&row| cols.iter().all(|c| !c.is_missing(row)))
            .collect()
    }

    /// Drop rows missing a value in any of the listed columns
    pub fn drop_missing(&self, columns: &[&str]) -> Table {
        self.take_rows(&self.complete_rows(columns))
    }

    /// Uniform sample without replacement, kept in table order. Returns a copy when `n` covers every row.
    pub fn sample(&self, n: usize, seed: u64) -> Table {
        if n >= self.row_count {
            return self.clone();
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rows = rand::seq::index::sample(&mut rng, self.row_count, n).into_vec();
        rows.sort_unstable();
        self.take_rows(&rows)
    }

    /// Category values with their frequencies, most frequent first, ties in first-occurrence order
    pub fn value_counts(&self, column: &str) -> LabResult<Vec<(String, usize)>> {
        let values = self
            .column(column)
            .and_then(Column::as_categorical)
            .ok_or_else(|| LabError::config(column, "expected a categorical column"))?;

        let mut order: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for value in values.iter().flatten() {
            match index.get(value.as_str()) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(value.as_str(), order.len());
                    order.push((value.clone(), 1));
                }
            }
        }

        // stable sort keeps first-occurrence order among equal counts
        order.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(order)
    }

    /// The `n` most frequent values of a categorical column
    pub fn top_categories(&self, column: &str, n: usize) -> LabResult<Vec<String>> {
        Ok(self
            .value_counts(column)?
            .into_iter()
            .take(n)
            .map(|(value, _)| value)
            .collect())
    }

    /// Keep rows whose category is among the `n` most frequent
    pub fn filter_top_n(&self, column: &str, n: usize) -> LabResult<Table> {
        let keep: HashSet<String> = self.top_categories(column, n)?.into_iter().collect();
        let values = self
            .column(column)
            .and_then(Column::as_categorical)
            .ok_or_else(|| LabError::config(column, "expected a categorical column"))?;

        let rows: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.as_ref().map(|s| keep.contains(s)).unwrap_or(false))
            .map(|(row, _)| row)
            .collect();

        Ok(self.take_rows(&rows))
    }
}

fn missing_to_none(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if MISSING_TOKENS.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_table() -> Table {
        Table::from_csv_str("x,y,g\n1,2,a\n2,,b\n3,6,a\n4,8,c\n5,10,a\n6,12,b\n").unwrap()
    }

    #[test]
    fn test_csv_inference() {
        let table = make_table();
        assert_eq!(table.row_count(), 6);
        assert_eq!(table.column("x").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(table.column("y").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(table.column("g").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(table.column("y").unwrap().missing_count(), 1);
    }

    #[test]
    fn test_missing_tokens() {
        let table = Table::from_csv_str("v,w\nNA,x\n1.5,NaN\n,None\n").unwrap();
        assert_eq!(table.column("v").unwrap().as_numeric().unwrap(), &[None, Some(1.5), None]);
        assert_eq!(table.column("w").unwrap().missing_count(), 2);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Table::from_text_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Some("1".to_string())]],
        );
        assert!(matches!(result, Err(LabError::Data(_))));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = Table::new(vec![
            Column::numeric("a", vec![Some(1.0)]),
            Column::numeric("a", vec![Some(2.0)]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json() {
        let value = json!([
            {"name": "a", "score": 1},
            {"name": "b", "score": null},
            {"name": "c", "score": 2.5}
        ]);
        let table = Table::from_json(&value).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("score").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(table.column("score").unwrap().missing_count(), 1);
        assert_eq!(table.column("name").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        assert!(Table::from_json(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_drop_missing_leaves_source_untouched() {
        let table = make_table();
        let filtered = table.drop_missing(&["x", "y"]);
        assert_eq!(filtered.row_count(), 5);
        assert_eq!(table.row_count(), 6);
        assert_eq!(table.column("y").unwrap().missing_count(), 1);
    }

    #[test]
    fn test_value_counts_ties_first_occurrence() {
        let table = Table::from_csv_str("c\nb\na\nb\na\nc\n").unwrap();
        let counts = table.value_counts("c").unwrap();
        assert_eq!(
            counts,
            vec![("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)]
        );
    }

    #[test]
    fn test_filter_top_n() {
        let table = make_table();
        let top = table.filter_top_n("g", 2).unwrap();
        let values: Vec<_> = top.column("g").unwrap().as_categorical().unwrap().to_vec();
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|v| v.as_deref() != Some("c")));
    }

    #[test]
    fn test_sample_is_deterministic() {
        let rows: Vec<Option<f64>> = (0..50).map(|i| Some(i as f64)).collect();
        let table = Table::new(vec![Column::numeric("v", rows)]).unwrap();
        let a = table.sample(10, 42);
        let b = table.sample(10, 42);
        assert_eq!(a, b);
        assert_eq!(a.row_count(), 10);

        let values: Vec<f64> = a.column("v").unwrap().as_numeric().unwrap().iter().flatten().copied().collect();
        let mut sorted = values.clone();
        sorted.sort_by(|x, y| x.partial_cmp(y).unwrap());
        sorted.dedup();
        assert_eq!(values, sorted);
    }

    #[test]
    fn test_sample_larger_than_table() {
        let table = make_table();
        assert_eq!(table.sample(100, 42), table);
    }
}
