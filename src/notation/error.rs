//! Error types for the notation pipeline.

use std::fmt;

/// A parse failure: no grammar alternative matched at `offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Character offset into the source.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub col: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize, line: usize, col: usize) -> Self {
        Self {
            offset,
            line,
            col,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

/// A compile failure. Parse-clean input can still be musically invalid.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A numeric value fell outside its allowed range.
    Range {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// The input is structurally valid but musically meaningless.
    Semantic { message: String },
}

impl CompileError {
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic {
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Range {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} must be between {min} and {max}, got {value}"),
            CompileError::Semantic { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Check that `value` lies within `[min, max]`.
pub fn limit(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), CompileError> {
    if value < min || value > max {
        return Err(CompileError::Range {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Any failure from the combined parse + compile pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(ParseError),
    Compile(CompileError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{e}"),
            Error::Compile(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Error::Compile(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_error_display() {
        let err = limit("Cents", 15000.0, -12000.0, 12000.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cents must be between -12000 and 12000, got 15000"
        );
    }

    #[test]
    fn limit_accepts_bounds() {
        assert!(limit("Hz", 20000.0, 0.0, 20000.0).is_ok());
        assert!(limit("Hz", 0.0, 0.0, 20000.0).is_ok());
    }

    #[test]
    fn parse_error_display_has_line_col() {
        let err = ParseError::new("unexpected token", 12, 2, 3);
        assert_eq!(err.to_string(), "[2:3] unexpected token");
    }
}
