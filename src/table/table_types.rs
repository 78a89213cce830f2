use std::fmt;

/// A single cell of an input or output table.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /**
     * Missing, NaN and infinite values are rendered as empty cells.
     */
    pub fn sanitized(&self) -> CellValue {
        match self {
            CellValue::Number(n) if !n.is_finite() => CellValue::Empty,
            CellValue::Text(s) if s.is_empty() => CellValue::Empty,
            other => other.clone(),
        }
    }

    /// Numeric coercion: numbers pass through, text is parsed after trimming.
    pub fn to_number(&self) -> Option<f64> {
        let value = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Empty => return None,
        };

        if value.is_finite() {
            Some(value)
        } else {
            None
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.sanitized() {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_owned())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map(CellValue::Number).unwrap_or(CellValue::Empty)
    }
}

/// Headers plus rows. Rows may be shorter than the header row.
#[derive(Clone, Debug, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Table {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
