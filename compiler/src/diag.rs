// diag.rs — Unified diagnostics model
//
// Provides the diagnostic types reported by synthesis, validation and
// lowering. Every structural finding is attached to the node that caused it
// so the host can highlight it.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::id::NodeId;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0101`, `W0200`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    /// Intent node bound to a function the registry does not know.
    pub const E0100: DiagCode = DiagCode("E0100");
    /// Required input (the type pin of a construct node) has neither literal nor link.
    pub const E0101: DiagCode = DiagCode("E0101");
    /// One or more link moves failed during expansion.
    pub const E0102: DiagCode = DiagCode("E0102");
    /// Finish signature lost its object input after validation.
    pub const E0103: DiagCode = DiagCode("E0103");
    /// Intent node bound to a signature that is not eligible for its kind.
    pub const E0104: DiagCode = DiagCode("E0104");
    /// Persisted pin name does not exist on the refreshed node.
    pub const W0200: DiagCode = DiagCode("W0200");
    /// Lowering certificate failed.
    pub const E0600: DiagCode = DiagCode("E0600");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Cause record ─────────────────────────────────────────────────────────

/// One entry in a cause chain, e.g. a single failed link move.
#[derive(Debug, Clone)]
pub struct CauseRecord {
    pub message: String,
    pub node: Option<NodeId>,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by any pass: `(node, level, message)` plus extras.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub node: Option<NodeId>,
    pub message: String,
    pub hint: Option<String>,
    pub cause_chain: Vec<CauseRecord>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint, or causes.
    pub fn new(level: DiagLevel, node: Option<NodeId>, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            node,
            message: message.into(),
            hint: None,
            cause_chain: Vec::new(),
        }
    }

    pub fn error(node: NodeId, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, Some(node), message)
    }

    pub fn warning(node: NodeId, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, Some(node), message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a cause record to the chain.
    pub fn with_cause(mut self, message: impl Into<String>, node: Option<NodeId>) -> Self {
        self.cause_chain.push(CauseRecord {
            message: message.into(),
            node,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

/// True if any diagnostic in the slice is error-level.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        match &self.code {
            Some(code) => write!(f, "{}[{}]", level, code)?,
            None => write!(f, "{}", level)?,
        }
        if let Some(node) = self.node {
            write!(f, " ({})", node)?;
        }
        write!(f, ": {}", self.message)?;
        for cause in &self.cause_chain {
            write!(f, "\n  caused by: {}", cause.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}
