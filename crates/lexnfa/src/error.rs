use std::fmt;

/// Malformed grammar input rejected before any automaton is built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Reference to undefined pattern {0:?}")]
    UnknownReference(String),
    #[error("Pattern {0:?} refers to itself")]
    RecursiveReference(String),
    #[error("Invalid repetition range {{{min},{max}}}, maximum is less than minimum")]
    InvalidRepetition { min: u32, max: u32 },
    #[error("Pattern {pattern} names undeclared lexical state {state:?}")]
    UndeclaredLexicalState { pattern: String, state: String },
    #[error("Lexical state {0:?} declared more than once")]
    DuplicateLexicalState(String),
    #[error("Label {0:?} used by more than one pattern")]
    DuplicateLabel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A configuration problem reported while processing a grammar.  Diagnostics
/// never stop other lexical states from being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning<S: Into<String>>(message: S) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool { self.severity == Severity::Error }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}
