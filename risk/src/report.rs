//! Risk check report types.

use serde::Serialize;

/// Outcome of validating one trade.
///
/// Checks run in order and stop at the first failure, so a rejected report
/// ends with the failing check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskReport {
    pub checks: Vec<RiskCheck>,
}

/// A single risk check result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCheck {
    pub name: &'static str,
    pub status: RiskStatus,
    pub detail: String,
}

impl RiskCheck {
    pub(crate) fn new(name: &'static str, status: RiskStatus, detail: String) -> Self {
        Self {
            name,
            status,
            detail,
        }
    }

    pub fn passed(&self) -> bool {
        self.status != RiskStatus::Fail
    }
}

/// Whether a check passed, warned, or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskStatus {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskStatus::Pass => write!(f, "PASS"),
            RiskStatus::Warn => write!(f, "WARN"),
            RiskStatus::Fail => write!(f, "FAIL"),
        }
    }
}

impl RiskReport {
    /// True if any check failed.
    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|c| c.status == RiskStatus::Fail)
    }

    /// True if any check warned.
    pub fn has_warnings(&self) -> bool {
        self.checks.iter().any(|c| c.status == RiskStatus::Warn)
    }

    /// True when the trade may proceed.
    pub fn is_approved(&self) -> bool {
        !self.has_failures()
    }

    /// The first failing check, if any.
    pub fn rejection(&self) -> Option<&RiskCheck> {
        self.checks.iter().find(|c| c.status == RiskStatus::Fail)
    }

    /// Rejection reason, or `None` for an approved trade.
    pub fn reason(&self) -> Option<String> {
        self.rejection().map(|c| format!("{}: {}", c.name, c.detail))
    }
}

impl std::fmt::Display for RiskReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RISK CHECKS:")?;
        for check in &self.checks {
            writeln!(f, "  [{}] {}: {}", check.status, check.name, check.detail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_is_first_failure() {
        let report = RiskReport {
            checks: vec![
                RiskCheck::new("Position size", RiskStatus::Pass, "10.0% <= 30.0%".into()),
                RiskCheck::new("Daily loss", RiskStatus::Fail, "-8.00% < -5.00%".into()),
            ],
        };
        assert!(!report.is_approved());
        assert_eq!(report.rejection().unwrap().name, "Daily loss");
        assert_eq!(report.reason().unwrap(), "Daily loss: -8.00% < -5.00%");
        assert!(report.to_string().contains("[FAIL] Daily loss"));
    }

    #[test]
    fn warnings_do_not_reject() {
        let report = RiskReport {
            checks: vec![RiskCheck::new("Trade frequency", RiskStatus::Warn, "9/10".into())],
        };
        assert!(report.is_approved());
        assert!(report.has_warnings());
        assert!(report.reason().is_none());
    }
}
