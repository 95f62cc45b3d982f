use std::collections::HashMap;
use std::fmt;

use super::{DocumentKind, DocumentLoader, ExtractionError};

/// Semicolon-delimited table without header row. Carries no prose text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedTableLoader;

impl DocumentLoader for DelimitedTableLoader {
    fn extract_text(&self, _location: &str) -> Result<String, ExtractionError> {
        Ok(String::new())
    }

    fn extract_tables(
        &self,
        location: &str,
        row_limit: Option<i64>,
    ) -> Result<Vec<String>, ExtractionError> {
        let table_error = |source| ExtractionError::Table {
            location: location.to_string(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(location)
            .map_err(table_error)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(table_error)?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![render_table(&rows, row_limit)])
    }
}

/// Whole file as text; no tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn extract_text(&self, location: &str) -> Result<String, ExtractionError> {
        std::fs::read_to_string(location).map_err(|source| ExtractionError::Io {
            location: location.to_string(),
            source,
        })
    }

    fn extract_tables(
        &self,
        _location: &str,
        _row_limit: Option<i64>,
    ) -> Result<Vec<String>, ExtractionError> {
        Ok(Vec::new())
    }
}

/// Loaders by document kind.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<DocumentKind, Box<dyn DocumentLoader>>,
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.loaders.keys().map(DocumentKind::label).collect();
        kinds.sort_unstable();
        f.debug_struct("LoaderRegistry").field("kinds", &kinds).finish()
    }
}

impl LoaderRegistry {
    /// Registry with the loaders that need no external service.
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register(DocumentKind::DelimitedTable, DelimitedTableLoader);
        registry.register(DocumentKind::PlainText, PlainTextLoader);
        registry
    }

    pub fn register<L>(&mut self, kind: DocumentKind, loader: L)
    where
        L: DocumentLoader + 'static,
    {
        self.loaders.insert(kind, Box::new(loader));
    }

    pub fn get(&self, kind: DocumentKind) -> Result<&dyn DocumentLoader, ExtractionError> {
        self.loaders
            .get(&kind)
            .map(|loader| loader.as_ref())
            .ok_or(ExtractionError::Unsupported(kind))
    }
}

/// Markdown table with a leading row-number column, capped per `row_limit`.
pub fn render_table(rows: &[Vec<String>], row_limit: Option<i64>) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let selected: Vec<(usize, &Vec<String>)> = match row_limit {
        None => rows.iter().enumerate().collect(),
        Some(limit) if limit >= 0 => rows.iter().enumerate().take(limit as usize).collect(),
        Some(limit) => {
            let keep = limit.unsigned_abs() as usize;
            let skip = rows.len().saturating_sub(keep);
            rows.iter().enumerate().skip(skip).collect()
        }
    };

    let mut lines = Vec::with_capacity(selected.len() + 2);
    let header: Vec<String> = (0..columns).map(|column| column.to_string()).collect();
    lines.push(format!("|    | {} |", header.join(" | ")));
    lines.push(format!("|---|{}", "---|".repeat(columns)));
    for (index, row) in selected {
        let cells: Vec<&str> = (0..columns)
            .map(|column| row.get(column).map(String::as_str).unwrap_or(""))
            .collect();
        lines.push(format!("| {index} | {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<String>> {
        (0..4)
            .map(|row| vec![format!("r{row}"), format!("{}", row * 10)])
            .collect()
    }

    #[test]
    fn renders_all_rows_with_numbered_columns() {
        let table = render_table(&rows(), None);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "|    | 0 | 1 |");
        assert_eq!(lines[1], "|---|---|---|");
        assert_eq!(lines[2], "| 0 | r0 | 0 |");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn caps_to_first_or_last_rows() {
        let head = render_table(&rows(), Some(2));
        assert!(head.contains("| 1 | r1 | 10 |"));
        assert!(!head.contains("r2"));

        let tail = render_table(&rows(), Some(-1));
        assert!(tail.contains("| 3 | r3 | 30 |"));
        assert!(!tail.contains("r2"));
    }

    #[test]
    fn missing_loader_is_unsupported() {
        let registry = LoaderRegistry::with_builtin();
        assert!(registry.get(DocumentKind::PlainText).is_ok());
        assert!(matches!(
            registry.get(DocumentKind::Pdf),
            Err(ExtractionError::Unsupported(DocumentKind::Pdf))
        ));
    }
}
