use std::fmt;

use serde::Serialize;

/// Read-only summary of the service for status messages and tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub enabled: bool,
    pub debug: bool,
    pub rules: usize,
    pub tracked: usize,
    pub scanner_active: bool,
    /// Earliest pending deadline in epoch milliseconds.
    pub next_deadline: Option<u64>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DespawnRate: enabled={} debug={} rules={} tracked={} scanner={}",
            self.enabled,
            self.debug,
            self.rules,
            self.tracked,
            if self.scanner_active { "active" } else { "idle" }
        )?;
        if let Some(next) = self.next_deadline {
            write!(f, " next_deadline={next}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_missing_deadline() {
        let report = StatusReport {
            enabled: true,
            debug: false,
            rules: 2,
            tracked: 0,
            scanner_active: false,
            next_deadline: None,
        };
        assert_eq!(
            report.to_string(),
            "DespawnRate: enabled=true debug=false rules=2 tracked=0 scanner=idle"
        );
    }

    #[test]
    fn display_includes_next_deadline() {
        let report = StatusReport {
            enabled: true,
            debug: true,
            rules: 1,
            tracked: 3,
            scanner_active: true,
            next_deadline: Some(42),
        };
        assert!(report.to_string().ends_with("scanner=active next_deadline=42"));
    }
}
