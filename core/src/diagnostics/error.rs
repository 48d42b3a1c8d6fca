use core::fmt;

use crate::syntax::Anchor;

/// Specific kinds of compilation errors.
///
/// Each kind maps to a stable code (`E001`...) for documentation lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Lexical and syntax
    UnknownToken { text: String },
    MissingPairedSymbol { expected: &'static str },
    UnexpectedToken { text: String },
    MissingExpression,
    InvalidIndent,
    UnexpectedIndent,
    MissingColon,
    InvalidLiteral { message: String },
    InvalidLambdaParameters,
    InvalidForClauses,
    ElseWithoutBranch,
    DuplicateElse,
    MisplacedClause { keyword: &'static str },

    // Types and names
    TypeMismatch { expected: String, found: String },
    UndefinedName { name: String },
    AmbiguousFunction { name: String, candidates: Vec<String> },
    FunctionNotFound { name: String },
    NotAssignable,
    DivideByZero,
    ConditionNotBool { found: String },
    InvalidOperator { operator: &'static str, operands: String },
    InvalidCast { from: String, to: String },
    CannotInferType,
    TupleCountMismatch { expected: usize, found: usize },
    DuplicateLocal { name: String },
    UnknownMember { ty: String, name: String },
    NotCallable,
    NotIndexable { ty: String },
    InvalidSwizzle { name: String },
    ConstantIndexRequired,
    IndexOutOfRange { index: i64, count: usize },

    // Control flow
    NotAllPathsReturn,
    JumpOutsideLoop { keyword: &'static str },
    JumpLeavesTry { keyword: &'static str },
    ReturnLeavesFinally,

    // Warnings
    UnusedValue,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnknownToken { .. } => "E001",
            ErrorKind::MissingPairedSymbol { .. } => "E002",
            ErrorKind::UnexpectedToken { .. } => "E003",
            ErrorKind::MissingExpression => "E004",
            ErrorKind::InvalidIndent => "E005",
            ErrorKind::UnexpectedIndent => "E006",
            ErrorKind::MissingColon => "E007",
            ErrorKind::InvalidLiteral { .. } => "E008",
            ErrorKind::InvalidLambdaParameters => "E009",
            ErrorKind::InvalidForClauses => "E010",
            ErrorKind::ElseWithoutBranch => "E011",
            ErrorKind::DuplicateElse => "E012",
            ErrorKind::MisplacedClause { .. } => "E013",
            ErrorKind::TypeMismatch { .. } => "E101",
            ErrorKind::UndefinedName { .. } => "E102",
            ErrorKind::AmbiguousFunction { .. } => "E103",
            ErrorKind::FunctionNotFound { .. } => "E104",
            ErrorKind::NotAssignable => "E105",
            ErrorKind::DivideByZero => "E106",
            ErrorKind::ConditionNotBool { .. } => "E107",
            ErrorKind::InvalidOperator { .. } => "E108",
            ErrorKind::InvalidCast { .. } => "E109",
            ErrorKind::CannotInferType => "E110",
            ErrorKind::TupleCountMismatch { .. } => "E111",
            ErrorKind::DuplicateLocal { .. } => "E112",
            ErrorKind::UnknownMember { .. } => "E113",
            ErrorKind::NotCallable => "E114",
            ErrorKind::NotIndexable { .. } => "E115",
            ErrorKind::InvalidSwizzle { .. } => "E116",
            ErrorKind::ConstantIndexRequired => "E117",
            ErrorKind::IndexOutOfRange { .. } => "E118",
            ErrorKind::NotAllPathsReturn => "E201",
            ErrorKind::JumpOutsideLoop { .. } => "E202",
            ErrorKind::JumpLeavesTry { .. } => "E203",
            ErrorKind::ReturnLeavesFinally => "E204",
            ErrorKind::UnusedValue => "W001",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ErrorKind::UnknownToken { text } => format!("Unknown token '{}'", text),
            ErrorKind::MissingPairedSymbol { expected } => {
                format!("Missing paired symbol '{}'", expected)
            }
            ErrorKind::UnexpectedToken { text } => format!("Unexpected token '{}'", text),
            ErrorKind::MissingExpression => "Expected an expression".to_string(),
            ErrorKind::InvalidIndent => {
                "Indentation does not match any enclosing block".to_string()
            }
            ErrorKind::UnexpectedIndent => "Unexpected indentation".to_string(),
            ErrorKind::MissingColon => "Conditional expression is missing ':'".to_string(),
            ErrorKind::InvalidLiteral { message } => format!("Invalid literal: {}", message),
            ErrorKind::InvalidLambdaParameters => "Invalid lambda parameter list".to_string(),
            ErrorKind::InvalidForClauses => {
                "'for' needs at least an initializer and a condition".to_string()
            }
            ErrorKind::ElseWithoutBranch => "'else' without a matching 'if' or loop".to_string(),
            ErrorKind::DuplicateElse => "Statement already has an 'else' block".to_string(),
            ErrorKind::MisplacedClause { keyword } => {
                format!("'{}' does not follow a matching 'try'", keyword)
            }
            ErrorKind::TypeMismatch { expected, found } => {
                format!("Type mismatch: expected {}, found {}", expected, found)
            }
            ErrorKind::UndefinedName { name } => format!("Undefined name '{}'", name),
            ErrorKind::AmbiguousFunction { name, candidates } => format!(
                "Ambiguous call to '{}': {} candidates match equally well",
                name,
                candidates.len()
            ),
            ErrorKind::FunctionNotFound { name } => {
                format!("No overload of '{}' accepts these arguments", name)
            }
            ErrorKind::NotAssignable => "Expression cannot be assigned to".to_string(),
            ErrorKind::DivideByZero => "Division by constant zero".to_string(),
            ErrorKind::ConditionNotBool { found } => {
                format!("Condition must be bool, found {}", found)
            }
            ErrorKind::InvalidOperator { operator, operands } => {
                format!("Operator '{}' cannot be applied to {}", operator, operands)
            }
            ErrorKind::InvalidCast { from, to } => format!("Cannot convert {} to {}", from, to),
            ErrorKind::CannotInferType => "Cannot infer the type of this expression".to_string(),
            ErrorKind::TupleCountMismatch { expected, found } => {
                format!("Expected {} value(s), found {}", expected, found)
            }
            ErrorKind::DuplicateLocal { name } => {
                format!("Local '{}' is already declared in this block", name)
            }
            ErrorKind::UnknownMember { ty, name } => {
                format!("Type {} has no member '{}'", ty, name)
            }
            ErrorKind::NotCallable => "Expression cannot be called".to_string(),
            ErrorKind::NotIndexable { ty } => format!("Type {} cannot be indexed", ty),
            ErrorKind::InvalidSwizzle { name } => format!("Invalid vector component '{}'", name),
            ErrorKind::ConstantIndexRequired => {
                "Tuple and task elements need constant indices".to_string()
            }
            ErrorKind::IndexOutOfRange { index, count } => {
                format!("Index {} out of range for {} value(s)", index, count)
            }
            ErrorKind::NotAllPathsReturn => "Not all code paths return a value".to_string(),
            ErrorKind::JumpOutsideLoop { keyword } => format!("'{}' outside of a loop", keyword),
            ErrorKind::JumpLeavesTry { keyword } => {
                format!("'{}' cannot jump out of a 'try' block", keyword)
            }
            ErrorKind::ReturnLeavesFinally => {
                "'return' cannot leave a 'try' block that has 'finally'".to_string()
            }
            ErrorKind::UnusedValue => "Expression value is never used".to_string(),
        }
    }

    pub fn help(&self) -> Option<String> {
        match self {
            ErrorKind::InvalidIndent => {
                Some("Align this line with an enclosing block".to_string())
            }
            ErrorKind::AmbiguousFunction { candidates, .. } => {
                Some(format!("Candidates: {}", candidates.join(", ")))
            }
            ErrorKind::NotAllPathsReturn => {
                Some("Add a 'return' or 'exit' at the end of the function".to_string())
            }
            ErrorKind::CannotInferType => {
                Some("Declare the variable with an explicit type".to_string())
            }
            _ => None,
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorKind::UnusedValue => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub message: String,
    pub anchor: Anchor,
    pub related: Vec<RelatedInfo>,
    pub help: Option<String>,
    pub code: &'static str,
}

impl Diagnostic {
    pub fn new(anchor: &Anchor, kind: ErrorKind) -> Self {
        Diagnostic {
            severity: kind.default_severity(),
            message: kind.message(),
            help: kind.help(),
            code: kind.code(),
            anchor: anchor.clone(),
            related: Vec::new(),
            kind,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] line {}: {}",
            self.severity, self.code, self.anchor.line, self.message
        )?;
        if let Some(ref help) = self.help {
            write!(f, "\nhelp: {}", help)?;
        }
        Ok(())
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic (e.g., "candidate", "in call to").
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedInfo {
    pub anchor: Anchor,
    pub message: String,
}
