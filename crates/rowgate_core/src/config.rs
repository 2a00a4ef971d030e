//! Broker layer configuration.

use std::time::Duration;

/// The volatile sub-parameter stripped from audited configuration text by
/// default: a bookkeeping timestamp rewritten on every store, which would
/// otherwise make every diff non-empty.
pub const DEFAULT_VOLATILE_PARAMETER: &str = "ectrans.lastupdate";

/// The set of volatile sub-parameter names stripped from flagged fields
/// before audit rendering or comparison.
///
/// A sub-parameter is a `name = value` line embedded in a field's
/// configuration text. Stripping removes the whole line. The list is
/// configuration, not business logic; the default contains only
/// [`DEFAULT_VOLATILE_PARAMETER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionList {
    names: Vec<String>,
}

impl Default for RedactionList {
    fn default() -> Self {
        Self {
            names: vec![DEFAULT_VOLATILE_PARAMETER.to_string()],
        }
    }
}

impl RedactionList {
    /// Creates a list from explicit names.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Creates an empty list (no redaction at all).
    #[must_use]
    pub fn none() -> Self {
        Self { names: Vec::new() }
    }

    /// Adds a name to the list.
    pub fn push(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
    }

    /// Returns the configured names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Removes every sub-parameter line naming a listed parameter.
    ///
    /// A line is dropped when, after leading whitespace, it starts with a
    /// listed name followed (possibly after spaces) by `=`. Names match
    /// whole parameters only: `a.b` does not strip `a.bc = 1`.
    #[must_use]
    pub fn strip(&self, text: &str) -> String {
        if self.names.is_empty() || !text.contains('=') {
            return text.to_string();
        }
        text.lines()
            .filter(|line| !self.is_volatile_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_volatile_line(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.names.iter().any(|name| {
            let Some(rest) = trimmed.strip_prefix(name.as_str()) else {
                return false;
            };
            rest.trim_start().starts_with('=')
        })
    }
}

/// Configuration for the broker layer.
#[derive(Debug, Clone)]
pub struct Config {
    /// Iterators held open longer than this emit a debug-level notice on
    /// release. Diagnostic only; iteration is never cut off.
    pub slow_iterator_threshold: Duration,

    /// Emit a result-set close accounting line every Nth close
    /// (0 = never). A sampling policy, not a correctness mechanism.
    pub close_log_interval: u64,

    /// Volatile sub-parameters stripped before audit render/diff.
    pub redactions: RedactionList,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slow_iterator_threshold: Duration::from_secs(60),
            close_log_interval: 1000,
            redactions: RedactionList::default(),
        }
    }
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slow-iterator notice threshold.
    #[must_use]
    pub const fn slow_iterator_threshold(mut self, value: Duration) -> Self {
        self.slow_iterator_threshold = value;
        self
    }

    /// Sets the close accounting sample interval.
    #[must_use]
    pub const fn close_log_interval(mut self, value: u64) -> Self {
        self.close_log_interval = value;
        self
    }

    /// Sets the redaction list.
    #[must_use]
    pub fn redactions(mut self, value: RedactionList) -> Self {
        self.redactions = value;
        self
    }
}
