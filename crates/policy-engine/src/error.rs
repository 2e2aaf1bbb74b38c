use std::fmt;

use crate::location::Location;

/// Error taxonomy (spec.md §7). Each kind gets a stable `Display` name via
/// `strum` rather than hand-rolling `match`-based `Display` for the tag —
/// the message/location/rule-name fields live on `Error` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    Lex,
    Parser,
    Compilation,
    Evaluation,
    ObjectKeyConflict,
}

/// A single error from any pipeline stage. `rule_name` is only ever set for
/// `Evaluation`/`ObjectKeyConflict` errors raised while evaluating a rule
/// group (spec.md §7).
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
    pub rule_name: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), location: None, rule_name: None }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_rule(mut self, rule_name: impl Into<String>) -> Self {
        self.rule_name = Some(rule_name.into());
        self
    }

    pub fn lex(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Lex, message).with_location(location)
    }

    pub fn parser(message: impl Into<String>, location: Location) -> Self {
        Self::new(ErrorKind::Parser, message).with_location(location)
    }

    pub fn compilation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Compilation, message)
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Evaluation, message)
    }

    pub fn object_key_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ObjectKeyConflict, message)
    }

    /// Wraps an unexpected host-level failure per spec.md §7's
    /// `"evaluation failed: <message>"` convention, preserving the cause in
    /// the message text.
    pub fn host_failure(cause: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Evaluation, format!("evaluation failed: {cause}"))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(loc) = self.location {
            write!(f, " at {loc}")?;
        }
        if let Some(rule) = &self.rule_name {
            write!(f, " (in rule `{rule}`)")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}
