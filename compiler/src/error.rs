use std::fmt;
use std::path::PathBuf;

use hdi_parcel::ParcelError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HdiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("invalid options: {0}")]
    Options(String),

    #[error("resolve error: {0}")]
    Resolve(String),

    #[error("circular dependency among {}", units.join(", "))]
    Cycle { units: Vec<String> },

    #[error("{0}")]
    Compile(Diagnostics),

    #[error("generate error: {0}")]
    Generate(String),

    #[error("marshal error: {0}")]
    Marshal(String),

    #[error(transparent)]
    Parcel(#[from] ParcelError),
}

pub type Result<T> = std::result::Result<T, HdiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Semantic,
    Structural,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            DiagnosticKind::Lexical => "lexical",
            DiagnosticKind::Syntax => "syntax",
            DiagnosticKind::Semantic => "semantic",
            DiagnosticKind::Structural => "structural",
        };
        f.write_str(text)
    }
}

/// One recoverable error, tied to a source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind:    DiagnosticKind,
    pub file:    PathBuf,
    pub line:    usize,
    pub column:  usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} error: {}",
            self.file.display(),
            self.line,
            self.column,
            self.kind,
            self.message
        )
    }
}

/// Ordered batch of diagnostics collected over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.0.iter().any(|d| d.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic {
            kind:    DiagnosticKind::Syntax,
            file:    PathBuf::from("a/ISample.idl"),
            line:    3,
            column:  7,
            message: "expected \";\"".to_owned(),
        });
        diagnostics.push(Diagnostic {
            kind:    DiagnosticKind::Semantic,
            file:    PathBuf::from("a/ISample.idl"),
            line:    4,
            column:  1,
            message: "duplicate method \"ping\"".to_owned(),
        });

        assert_eq!(
            diagnostics.to_string(),
            "a/ISample.idl:3:7: syntax error: expected \";\"\n\
             a/ISample.idl:4:1: semantic error: duplicate method \"ping\""
        );
        assert!(diagnostics.has_kind(DiagnosticKind::Semantic));
        assert!(!diagnostics.has_kind(DiagnosticKind::Lexical));
    }

    #[test]
    fn cycle_lists_units() {
        let err = HdiError::Cycle {
            units: vec!["a.v1_0.A".to_owned(), "a.v1_0.B".to_owned()],
        };
        assert_eq!(err.to_string(), "circular dependency among a.v1_0.A, a.v1_0.B");
    }
}
