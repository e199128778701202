//! Excel-style error representation.
//!
//! - **`ErrorKind`**   : the canonical 8-way set of spreadsheet error codes
//! - **`ExcelError`**  : kind plus an optional human-readable message
//!
//! Errors are first-class *values* in this engine: they flow through
//! evaluation as `LiteralValue::Error(..)` and are never raised as Rust
//! errors across the public API. They carry no stack trace and are cheap to
//! clone, compare, and hash.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// All recognised spreadsheet error codes.
///
/// **Note:** names are CamelCase (idiomatic Rust) while `Display` renders
/// them exactly as Excel shows them (`#DIV/0!`, ...). The rendered tokens
/// are a compatibility contract with UI layers and file interop; do not
/// change their spelling.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Div,
    Value,
    Ref,
    Name,
    Num,
    Na,
    Null,
    GettingData,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Div => "#DIV/0!",
            Self::Value => "#VALUE!",
            Self::Ref => "#REF!",
            Self::Name => "#NAME?",
            Self::Num => "#NUM!",
            Self::Na => "#N/A",
            Self::Null => "#NULL!",
            Self::GettingData => "#GETTING_DATA!",
        })
    }
}

impl ErrorKind {
    /// Parse a canonical error token back into its kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "#DIV/0!" => Some(Self::Div),
            "#VALUE!" => Some(Self::Value),
            "#REF!" => Some(Self::Ref),
            "#NAME?" => Some(Self::Name),
            "#NUM!" => Some(Self::Num),
            "#N/A" => Some(Self::Na),
            "#NULL!" => Some(Self::Null),
            "#GETTING_DATA!" => Some(Self::GettingData),
            _ => None,
        }
    }
}

/// The single error struct the engine passes around.
///
/// Combines the mandatory error code with an optional explanation. The
/// message never participates in equality or hashing decisions made by
/// spreadsheet semantics (two `#VALUE!` errors compare equal only when their
/// messages also match, but the engine itself only ever branches on `kind`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExcelError {
    pub kind: ErrorKind,
    pub message: Option<String>,
}

impl From<ErrorKind> for ExcelError {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }
}

impl ExcelError {
    /// Basic constructor (no message).
    pub fn new(kind: ErrorKind) -> Self {
        kind.into()
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    pub fn new_div() -> Self {
        Self::new(ErrorKind::Div)
    }
    pub fn new_value() -> Self {
        Self::new(ErrorKind::Value)
    }
    pub fn new_ref() -> Self {
        Self::new(ErrorKind::Ref)
    }
    pub fn new_name() -> Self {
        Self::new(ErrorKind::Name)
    }
    pub fn new_num() -> Self {
        Self::new(ErrorKind::Num)
    }
    pub fn new_na() -> Self {
        Self::new(ErrorKind::Na)
    }
    pub fn new_null() -> Self {
        Self::new(ErrorKind::Null)
    }
}

impl fmt::Display for ExcelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ExcelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_tokens_round_trip() {
        let kinds = [
            ErrorKind::Div,
            ErrorKind::Value,
            ErrorKind::Ref,
            ErrorKind::Name,
            ErrorKind::Num,
            ErrorKind::Na,
            ErrorKind::Null,
            ErrorKind::GettingData,
        ];
        for k in kinds {
            assert_eq!(ErrorKind::parse(&k.to_string()), Some(k));
        }
    }

    #[test]
    fn exact_spellings() {
        assert_eq!(ErrorKind::Div.to_string(), "#DIV/0!");
        assert_eq!(ErrorKind::Name.to_string(), "#NAME?");
        assert_eq!(ErrorKind::Na.to_string(), "#N/A");
        assert_eq!(ErrorKind::GettingData.to_string(), "#GETTING_DATA!");
    }

    #[test]
    fn errors_compare_as_values() {
        let a = ExcelError::new_value();
        let b = ExcelError::new(ErrorKind::Value);
        assert_eq!(a, b);
        assert_ne!(a, ExcelError::new_num());
    }
}
