//! Recipient list validation.

use launchpad_mail::{Address, check_email};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// A recipient that passed validation.
///
/// Only values of this type reach the delivery transport.
pub type RecipientAddress = Address;

/// An input entry that was excluded, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// The raw entry as received.
    pub value: String,
    /// Why it was excluded.
    pub reason: String,
}

/// Outcome of validating a raw recipient list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Valid recipients in input order. Duplicates are kept.
    pub valid: Vec<RecipientAddress>,
    /// Excluded entries in input order.
    pub rejected: Vec<Rejection>,
}

impl ValidationReport {
    /// Drop repeated valid addresses, comparing case-insensitively and
    /// keeping the first occurrence.
    pub fn deduplicated(mut self) -> Self {
        let mut seen = HashSet::new();
        self.valid.retain(|address| seen.insert(address.normalized()));
        self
    }

    /// Whether there is nothing to send to.
    pub fn has_recipients(&self) -> bool {
        !self.valid.is_empty()
    }
}

/// Validate a list of raw strings.
///
/// Excludes exactly the entries that fail the email syntax check; blank
/// entries are rejected as `"empty"`.
pub fn validate<S: AsRef<str>>(raw: &[S]) -> ValidationReport {
    let mut report = ValidationReport::default();
    for entry in raw {
        check(entry.as_ref(), &mut report);
    }
    log(&report);
    report
}

/// Validate a list of arbitrary JSON values.
///
/// Anything that is not a JSON string is rejected as `"not a string"`.
pub fn validate_values(raw: &[Value]) -> ValidationReport {
    let mut report = ValidationReport::default();
    for entry in raw {
        match entry {
            Value::String(s) => check(s, &mut report),
            other => report.rejected.push(Rejection {
                value: other.to_string(),
                reason: "not a string".to_string(),
            }),
        }
    }
    log(&report);
    report
}

fn check(entry: &str, report: &mut ValidationReport) {
    let trimmed = entry.trim();

    let verdict = check_email(trimmed).and_then(|()| Address::new(trimmed).map_err(|_| "invalid"));

    match verdict {
        Ok(address) => report.valid.push(address),
        Err(reason) => report.rejected.push(Rejection {
            value: entry.to_string(),
            reason: reason.to_string(),
        }),
    }
}

fn log(report: &ValidationReport) {
    tracing::debug!(
        valid = report.valid.len(),
        rejected = report.rejected.len(),
        "Validated recipient list"
    );
}
