use crate::ledger::LedgerSnapshot;
use crate::PayoffResult;

/// Storage seam for the ledger. Hosts implement this over whatever they
/// persist to; the core only ever loads and saves whole snapshots.
pub trait LedgerRepository {
    fn load(&self) -> PayoffResult<LedgerSnapshot>;
    fn save(&mut self, snapshot: &LedgerSnapshot) -> PayoffResult<()>;
}

/// Repository kept entirely in memory. Used by tests and by hosts that
/// manage persistence themselves.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    snapshot: LedgerSnapshot,
    saves: usize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self { snapshot, saves: 0 }
    }

    /// Number of times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }
}

impl LedgerRepository for InMemoryRepository {
    fn load(&self) -> PayoffResult<LedgerSnapshot> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, snapshot: &LedgerSnapshot) -> PayoffResult<()> {
        self.snapshot = snapshot.clone();
        self.saves += 1;
        Ok(())
    }
}
