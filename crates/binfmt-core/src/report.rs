//! Per-item outcomes of install and uninstall batches.

use crate::error::BinfmtError;
use std::fmt;
use tracing::info;

/// What was attempted for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Uninstall,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Install => "installing",
            Action::Uninstall => "uninstalling",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome for one requested target.
#[derive(Debug)]
pub struct ItemOutcome {
    pub action: Action,
    pub target: String,
    pub result: Result<(), BinfmtError>,
}

impl ItemOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(()) => write!(f, "{}: {} OK", self.action, self.target),
            Err(e) => write!(f, "{}: {} {}", self.action, self.target, e),
        }
    }
}

/// Outcomes of a batch, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, action: Action, target: impl Into<String>, result: Result<(), BinfmtError>) {
        self.items.push(ItemOutcome {
            action,
            target: target.into(),
            result,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|item| item.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|item| !item.is_ok())
    }

    /// The first error that makes further work pointless, if any.
    pub fn fatal(&self) -> Option<&BinfmtError> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().err())
            .find(|err| err.is_fatal())
    }

    /// Emit one log line per item.
    pub fn log(&self) {
        for item in &self.items {
            info!("{}", item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lines() {
        let mut report = BatchReport::default();
        report.push(Action::Install, "arm64", Ok(()));
        report.push(
            Action::Uninstall,
            "sparc",
            Err(BinfmtError::NotFound {
                target: "sparc".into(),
            }),
        );

        let lines: Vec<String> = report.items.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["installing: arm64 OK", "uninstalling: sparc not found"]);
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.failed().count(), 1);
        assert!(report.fatal().is_none());
    }

    #[test]
    fn test_fatal_error_found_among_items() {
        let mut report = BatchReport::default();
        report.push(
            Action::Install,
            "arm64",
            Err(BinfmtError::AlreadyRegistered {
                name: "qemu-aarch64".into(),
            }),
        );
        report.push(
            Action::Install,
            "riscv64",
            Err(BinfmtError::Mount {
                path: "/proc/sys/fs/binfmt_misc".into(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            }),
        );

        let fatal = report.fatal().unwrap();
        assert!(matches!(fatal, BinfmtError::Mount { .. }));
    }
}
