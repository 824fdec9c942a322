//! Append-only diagnostics sink.
//!
//! Every fallible step of the pipeline writes here instead of returning an
//! error, so one bad stylesheet or toc entry never stops its siblings.
//! Entries are mirrored to the `log` facade as they are recorded.

use serde::{Deserialize, Serialize};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: None,
            data: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Collected diagnostics for one parse.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Some(Severity::Error) => log::error!("{}", diagnostic.message),
            Some(Severity::Warning) => log::warn!("{}", diagnostic.message),
            Some(Severity::Info) => log::info!("{}", diagnostic.message),
            None => log::debug!("{}", diagnostic.message),
        }
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::new(message).with_severity(Severity::Error));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::new(message).with_severity(Severity::Warning));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::new(message).with_severity(Severity::Info));
    }

    /// Record a warning carrying a structured payload.
    pub fn warn_with(&mut self, message: impl Into<String>, data: serde_json::Value) {
        self.push(
            Diagnostic::new(message)
                .with_severity(Severity::Warning)
                .with_data(data),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Move every entry from `other` into this sink, keeping order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn("first");
        diagnostics.error("second");
        diagnostics.push(Diagnostic::new("third"));

        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let diagnostic = Diagnostic::new("missing title").with_severity(Severity::Error);
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["severity"], "error");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_warn_with_attaches_data() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn_with("unresolved", serde_json::json!({ "href": "a.xhtml#x" }));
        let entry = diagnostics.into_vec().remove(0);
        assert_eq!(entry.severity, Some(Severity::Warning));
        assert_eq!(entry.data.unwrap()["href"], "a.xhtml#x");
    }
}
