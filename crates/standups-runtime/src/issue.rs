#![forbid(unsafe_code)]

//! Reporting of broken upstream contracts.
//!
//! Some conditions are structurally impossible when every screen honours the
//! navigation contract. When one occurs anyway, reducers report it through an
//! [`IssueReporter`] instead of silently recovering, then leave state
//! untouched.

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};

/// A reported invariant violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub message: String,
    pub file: &'static str,
    pub line: u32,
}

enum Mode {
    Log,
    Panic,
    Record(Mutex<Vec<Issue>>),
}

/// Sink for invariant violations.
///
/// Clones share the same sink, so a test can keep one handle and inspect
/// what the reducer reported through another.
#[derive(Clone)]
pub struct IssueReporter {
    mode: Arc<Mode>,
}

impl IssueReporter {
    /// Log each issue at `error` level.
    #[must_use]
    pub fn log() -> Self {
        Self {
            mode: Arc::new(Mode::Log),
        }
    }

    /// Panic on the first issue.
    #[must_use]
    pub fn panicking() -> Self {
        Self {
            mode: Arc::new(Mode::Panic),
        }
    }

    /// Collect issues for later inspection.
    #[must_use]
    pub fn recording() -> Self {
        Self {
            mode: Arc::new(Mode::Record(Mutex::new(Vec::new()))),
        }
    }

    /// Report an invariant violation at the caller's location.
    #[track_caller]
    pub fn report(&self, message: impl Into<String>) {
        let location = Location::caller();
        let issue = Issue {
            message: message.into(),
            file: location.file(),
            line: location.line(),
        };
        match &*self.mode {
            Mode::Log => {
                tracing::error!(
                    file = issue.file,
                    line = issue.line,
                    "invariant violation: {}",
                    issue.message
                );
            }
            Mode::Panic => {
                panic!(
                    "invariant violation at {}:{}: {}",
                    issue.file, issue.line, issue.message
                );
            }
            Mode::Record(issues) => {
                tracing::error!(
                    file = issue.file,
                    line = issue.line,
                    "invariant violation: {}",
                    issue.message
                );
                issues
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(issue);
            }
        }
    }

    /// Issues collected so far. Always empty unless [`recording`](Self::recording).
    #[must_use]
    pub fn issues(&self) -> Vec<Issue> {
        match &*self.mode {
            Mode::Record(issues) => issues
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            _ => Vec::new(),
        }
    }
}

impl Default for IssueReporter {
    fn default() -> Self {
        Self::log()
    }
}

impl fmt::Debug for IssueReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &*self.mode {
            Mode::Log => "log",
            Mode::Panic => "panic",
            Mode::Record(_) => "record",
        };
        f.debug_struct("IssueReporter").field("mode", &mode).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_collects_issues_with_location() {
        let reporter = IssueReporter::recording();
        let handle = reporter.clone();
        reporter.report("stack contract broken");

        let issues = handle.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "stack contract broken");
        assert!(issues[0].file.ends_with("issue.rs"));
    }

    #[test]
    fn log_mode_does_not_collect() {
        let reporter = IssueReporter::log();
        reporter.report("ignored");
        assert!(reporter.issues().is_empty());
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    fn panicking_mode_panics() {
        IssueReporter::panicking().report("boom");
    }
}
