use std::fs;
use std::path::{Path, PathBuf};

use payoff_core::repository::LedgerRepository;
use payoff_core::{LedgerSnapshot, PayoffError, PayoffResult};
use tracing::debug;

/// Ledger persisted as one pretty-printed JSON document on disk.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl LedgerRepository for JsonFileRepository {
    /// A missing file is an empty ledger.
    fn load(&self) -> PayoffResult<LedgerSnapshot> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "ledger file missing, starting empty");
            return Ok(LedgerSnapshot::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            PayoffError::Repository(format!("Failed to read '{}': {}", self.path.display(), e))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write to a sibling temp file, then rename over the ledger.
    fn save(&mut self, snapshot: &LedgerSnapshot) -> PayoffResult<()> {
        let contents = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(|e| {
            PayoffError::Repository(format!("Failed to write '{}': {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            PayoffError::Repository(format!(
                "Failed to replace '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        debug!(
            path = %self.path.display(),
            debts = snapshot.debts.len(),
            payments = snapshot.payments.len(),
            "ledger saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use payoff_core::{Debt, DebtCategory};
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("ledger.json"));
        assert_eq!(repo.load().unwrap(), LedgerSnapshot::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = JsonFileRepository::new(dir.path().join("ledger.json"));
        let snapshot = LedgerSnapshot {
            debts: vec![Debt {
                id: "visa".into(),
                name: "Visa".into(),
                category: DebtCategory::CreditCard,
                original_balance: dec!(1200),
                current_balance: dec!(1200),
                apr: dec!(0.2199),
                minimum_payment: dec!(40),
                due_day: 12,
                lender: None,
                is_active: true,
                start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            }],
            payments: vec![],
        };
        repo.save(&snapshot).unwrap();
        assert_eq!(repo.load().unwrap(), snapshot);
    }
}
