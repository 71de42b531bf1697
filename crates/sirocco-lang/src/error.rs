use thiserror::Error;

/// Error codes prefixed by phase: L = lexer, P = parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal
    L003, // invalid escape sequence
    L004, // malformed character literal

    // Parser
    P001, // unexpected token
    P002, // missing expected token
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::L004 => "L004",
            Self::P001 => "P001",
            Self::P002 => "P002",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}:{} — {}", self.code.as_str(), self.line, self.column, self.message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// Evaluation failures. Every variant is fatal to the current run; the
/// non-error control transfers (return/break/continue) travel as completions,
/// never through this type.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("attempt to modify a constant")]
    ConstantMutation,

    #[error("type of lhs and rhs of assignment don't match")]
    AssignmentTypeMismatch,

    #[error("declaration type check failed")]
    DeclarationType,

    #[error("array element type check failed")]
    ArrayTypeMismatch,

    #[error("array type inference failed")]
    ArrayTypeInference,

    #[error("variable `{0}` is not defined")]
    UndeclaredVariable(String),

    #[error("redefined function `{0}`")]
    DuplicateFunction(String),

    #[error("illegal variable name `{0}`")]
    IllegalIdentifier(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("assertion failed")]
    AssertionFailed,

    #[error("`{type_name}` has no member `{member}`")]
    NoSuchMember { type_name: String, member: String },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("`{name}` expects {expected} args, got {got}")]
    ArityMismatch { name: String, expected: usize, got: usize },

    #[error("`{0}` is not callable")]
    NotCallable(String),

    #[error("return outside of a function body")]
    ReturnOutsideFunction,

    #[error("while executing statements: {0}")]
    Statements(Box<RuntimeError>),
}

impl RuntimeError {
    /// Context wrapper added at statement-sequence boundaries. Wrapping an
    /// already-wrapped error again would bury the cause, so it is a no-op.
    pub fn in_statements(self) -> Self {
        match self {
            Self::Statements(_) => self,
            other => Self::Statements(Box::new(other)),
        }
    }

    /// The failure underneath any statement-context wrapping.
    pub fn root_cause(&self) -> &RuntimeError {
        match self {
            Self::Statements(inner) => inner.root_cause(),
            other => other,
        }
    }
}
