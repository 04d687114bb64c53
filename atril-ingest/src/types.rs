use serde::{Deserialize, Serialize};

/// One spreadsheet row: header -> cell value, in sheet column order.
///
/// Blank cells are not stored, so a header only appears when its cell has a
/// value. Headers are unique within a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    cells: Vec<(String, String)>,
    /// 1-based line of the row in the source file, when read from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u64>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and callers that already hold key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut row = Self::new();
        for (k, v) in pairs {
            row.push(k, v);
        }
        row
    }

    /// Append a cell; empty values are skipped and a repeated header
    /// replaces the earlier value.
    pub fn push(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let header = header.into();
        let value = value.into();
        if value.is_empty() {
            return;
        }
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((header, value)),
        }
    }

    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn line(&self) -> Option<u64> {
        self.line
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
