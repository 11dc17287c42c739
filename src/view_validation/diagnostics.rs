//! Issue collection and reporting for a view validation pass.
//!
//! Issues are published to every registered [`IssueListener`] the moment they
//! are reported, in emission order. The reporter keeps its own copy so the
//! import driver can return the itemized list with a failed import.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::{error, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// Which phase of validation raised an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationCategory {
    /// The view takes part in a reference cycle
    Structural,
    /// The view query could not be prepared
    Parse,
    /// Missing or mistyped ECInstanceId / ECClassId (or relationship ends)
    SystemColumn,
    /// Missing, extra or mistyped declared property
    ShapeMismatch,
    /// The validated view could not be compiled
    Compilation,
    /// Trailing pass/fail summary
    Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    /// Qualified name of the class the issue is about. `None` for the summary.
    pub class_name: Option<String>,
    pub category: ValidationCategory,
    pub message: String,
}

impl Issue {
    pub fn error(
        class_name: impl Into<String>,
        category: ValidationCategory,
        message: impl Into<String>,
    ) -> Self {
        Issue {
            severity: Severity::Error,
            class_name: Some(class_name.into()),
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

pub trait IssueListener: Send + Sync {
    fn on_issue(&self, issue: &Issue);
}

/// Listener that keeps every issue it is given.
#[derive(Debug, Default)]
pub struct CollectingListener {
    issues: Mutex<Vec<Issue>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.issues.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.issues.lock().unwrap().clear();
    }
}

impl IssueListener for CollectingListener {
    fn on_issue(&self, issue: &Issue) {
        self.issues.lock().unwrap().push(issue.clone());
    }
}

pub fn cycle_message(class_name: &str, chain: &str) -> String {
    // "recusively" is the established wording
    format!(
        "Invalid View Class '{}'. View query references itself recusively ({}).",
        class_name, chain
    )
}

pub fn parse_failed_message(class_name: &str) -> String {
    format!("Invalid View Class '{}'. View ECSQL failed to parse.", class_name)
}

pub fn prepare_failed_message(class_name: &str, query: &str) -> String {
    format!(
        "Invalid view class '{}'. Failed to prepare view query ({})",
        class_name, query
    )
}

pub fn invalid_view_message(class_name: &str, detail: &str) -> String {
    format!("Invalid view class '{}'. {}", class_name, detail)
}

pub fn summary_message(checked: usize, invalid: usize) -> String {
    format!(
        "Total of {} view classes were checked and {} were found to be invalid.",
        checked, invalid
    )
}

/// Result of a validation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Every issue in emission order, summary last
    pub issues: Vec<Issue>,
    pub checked: usize,
    pub invalid: usize,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.invalid == 0
    }

    pub fn messages(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.message.as_str()).collect()
    }

    /// Issues about one class, matched by qualified name ignoring case.
    pub fn issues_for<'a>(&'a self, class_name: &'a str) -> impl Iterator<Item = &'a Issue> {
        self.issues.iter().filter(move |i| {
            i.class_name
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(class_name))
        })
    }
}

/// Collects issues for one pass and forwards them to the listeners.
pub struct IssueReporter {
    listeners: Vec<Arc<dyn IssueListener>>,
    issues: Vec<Issue>,
    log_issues: bool,
}

impl IssueReporter {
    pub fn new(listeners: Vec<Arc<dyn IssueListener>>, log_issues: bool) -> Self {
        IssueReporter {
            listeners,
            issues: Vec::new(),
            log_issues,
        }
    }

    pub fn report(&mut self, issue: Issue) {
        if self.log_issues {
            match issue.severity {
                Severity::Error => error!("{}", issue.message),
                Severity::Warning => warn!("{}", issue.message),
                Severity::Info => info!("{}", issue.message),
            }
        }
        for listener in &self.listeners {
            listener.on_issue(&issue);
        }
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Append the summary and close the pass.
    pub fn finish(mut self, checked: usize, invalid: usize) -> ValidationReport {
        let severity = if invalid > 0 {
            Severity::Error
        } else {
            Severity::Info
        };
        self.report(Issue {
            severity,
            class_name: None,
            category: ValidationCategory::Summary,
            message: summary_message(checked, invalid),
        });
        ValidationReport {
            issues: self.issues,
            checked,
            invalid,
        }
    }
}
