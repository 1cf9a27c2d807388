//! Tablas CSV mínimas para los componentes de referencia.
//!
//! Formato: primera línea cabecera, separador `,`, sin comillas ni escapes.
//! Las líneas vacías se ignoran. Cada fila debe tener tantas columnas como
//! la cabecera.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::AdapterError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn parse(text: &str, origin: &Path) -> Result<Self, AdapterError> {
        let mut lines = text.lines()
                            .enumerate()
                            .filter(|(_, l)| !l.trim().is_empty());
        let Some((_, header)) = lines.next() else {
            return Err(AdapterError::Format { path: origin.to_path_buf(),
                                              line: 1,
                                              message: "missing header".into() });
        };
        let columns: Vec<String> = split_line(header);
        let mut rows = Vec::new();
        for (idx, line) in lines {
            let row = split_line(line);
            if row.len() != columns.len() {
                return Err(AdapterError::Format { path: origin.to_path_buf(),
                                                  line: idx + 1,
                                                  message: format!("expected {} fields, found {}",
                                                                   columns.len(),
                                                                   row.len()) });
            }
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn read(path: &Path) -> Result<Self, AdapterError> {
        let text = fs::read_to_string(path).map_err(|e| AdapterError::io(path, e))?;
        Self::parse(&text, path)
    }

    /// Escribe la tabla creando los directorios padre.
    pub fn write(&self, path: &Path) -> Result<(), AdapterError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AdapterError::io(parent, e))?;
        }
        fs::write(path, self.to_csv()).map_err(|e| AdapterError::io(path, e))
    }

    pub fn to_csv(&self) -> String {
        let mut out = self.columns.join(",");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, AdapterError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| AdapterError::MissingColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<Vec<&str>, AdapterError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Valores numéricos de la columna; vacíos o no numéricos son `None`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, AdapterError> {
        Ok(self.column(name)?.into_iter().map(parse_number).collect())
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn split_line(line: &str) -> Vec<String> {
    line.split(',').map(|f| f.trim().to_string()).collect()
}

/// Archivos `*.csv` bajo `root` (o `root` mismo si es un archivo), en orden
/// lexicográfico.
pub fn csv_files(root: &Path) -> Result<Vec<PathBuf>, AdapterError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| AdapterError::io(root, e.into()))?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "csv") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows_skipping_blank_lines() {
        let t = Table::parse("a,b\n1, x\n\n2,y\n", Path::new("t.csv")).unwrap();
        assert_eq!(t.columns, vec!["a", "b"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.column("b").unwrap(), vec!["x", "y"]);
        assert_eq!(t.numeric_column("a").unwrap(), vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn ragged_row_reports_line() {
        let err = Table::parse("a,b\n1,2\n3\n", Path::new("t.csv")).unwrap_err();
        match err {
            AdapterError::Format { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_and_non_numeric_values_are_missing() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(" 2.5 "), Some(2.5));
    }
}
