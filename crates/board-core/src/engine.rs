//! Reaction update protocol and highlight toggle.
//!
//! All mutations serialize through one coarse operation lock with a bounded
//! acquisition wait. Column resolution happens inside the critical section
//! so a concurrent header rebuild can never be observed mid-flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use board_types::models::{ReactionAction, ReactionKind};

use crate::codec;
use crate::error::BoardError;
use crate::headers::{DEFAULT_HEADER_TTL, HeaderIndex};
use crate::store::RowStore;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Column header labels for the reserved reaction and highlight columns.
/// Configuration, not protocol: the engine works with whatever labels the
/// sheet was created with.
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub reactions: Vec<(ReactionKind, String)>,
    pub highlight: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            reactions: ReactionKind::ALL
                .iter()
                .map(|k| (*k, k.label().to_string()))
                .collect(),
            highlight: "HIGHLIGHT".to_string(),
        }
    }
}

impl ColumnConfig {
    pub fn reaction_label(&self, kind: ReactionKind) -> Option<&str> {
        self.reactions
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, label)| label.as_str())
    }

    /// All reserved labels, reactions first, highlight last.
    pub fn reserved_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.reactions.iter().map(|(_, l)| l.as_str()).collect();
        labels.push(self.highlight.as_str());
        labels
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionOutcome {
    pub action: ReactionAction,
    /// Size of the target kind's reaction set after the toggle.
    pub count: usize,
}

pub struct BoardEngine<S> {
    store: Arc<S>,
    headers: HeaderIndex,
    columns: ColumnConfig,
    lock: Mutex<()>,
    lock_timeout: Duration,
}

impl<S: RowStore> BoardEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timeouts(store, DEFAULT_LOCK_TIMEOUT, DEFAULT_HEADER_TTL)
    }

    pub fn with_timeouts(store: Arc<S>, lock_timeout: Duration, header_ttl: Duration) -> Self {
        Self {
            store,
            headers: HeaderIndex::new(header_ttl),
            columns: ColumnConfig::default(),
            lock: Mutex::new(()),
            lock_timeout,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn headers(&self) -> &HeaderIndex {
        &self.headers
    }

    pub fn columns(&self) -> &ColumnConfig {
        &self.columns
    }

    /// Toggle `user_email`'s membership in the `kind` reaction set of one
    /// row, enforcing one active reaction kind per user per row. Mutates at
    /// most one cell per configured kind; no other rows are touched.
    pub async fn apply_reaction(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row_index: u32,
        kind: ReactionKind,
        user_email: &str,
    ) -> Result<ReactionOutcome, BoardError> {
        if row_index == 0 {
            return Err(BoardError::InvalidInput(
                "row index is 1-based".to_string(),
            ));
        }
        let user_email = user_email.trim();
        if user_email.is_empty() {
            return Err(BoardError::InvalidInput(
                "acting user identifier is empty".to_string(),
            ));
        }

        // The guard releases on every exit path, including failures below.
        let _guard = tokio::time::timeout(self.lock_timeout, self.lock.lock())
            .await
            .map_err(|_| BoardError::LockTimeout(self.lock_timeout))?;

        let header = self
            .headers
            .resolve(self.store.as_ref(), spreadsheet_id, sheet_name)?;

        let mut columns = Vec::with_capacity(self.columns.reactions.len());
        for (k, label) in &self.columns.reactions {
            let idx = *header
                .get(label.as_str())
                .ok_or_else(|| BoardError::ColumnNotFound(label.clone()))?;
            columns.push((*k, idx));
        }
        let target = columns
            .iter()
            .position(|(k, _)| *k == kind)
            .ok_or_else(|| BoardError::ColumnNotFound(kind.label().to_string()))?;

        self.check_row_exists(spreadsheet_id, sheet_name, row_index)?;

        let cols: Vec<usize> = columns.iter().map(|(_, idx)| *idx).collect();
        let cells = self
            .store
            .batch_get(spreadsheet_id, sheet_name, row_index, &cols)
            .map_err(BoardError::UpdateFailed)?;
        if cells.len() != cols.len() {
            return Err(BoardError::UpdateFailed(anyhow::anyhow!(
                "store returned {} cells for {} columns",
                cells.len(),
                cols.len()
            )));
        }

        let mut sets: Vec<Vec<String>> = cells.iter().map(|c| codec::decode(c)).collect();
        let mut writes: Vec<(usize, String)> = Vec::new();

        let present = sets[target].iter().any(|u| u == user_email);
        let action = if present {
            sets[target].retain(|u| u != user_email);
            ReactionAction::Removed
        } else {
            sets[target].push(user_email.to_string());
            ReactionAction::Added
        };
        let count = sets[target].len();
        writes.push((cols[target], codec::encode(&sets[target])));

        // One active reaction kind per user per row: strip the user from
        // every other kind's set.
        for (i, set) in sets.iter_mut().enumerate() {
            if i == target {
                continue;
            }
            if set.iter().any(|u| u == user_email) {
                set.retain(|u| u != user_email);
                writes.push((cols[i], codec::encode(set)));
            }
        }

        self.store
            .batch_update(spreadsheet_id, sheet_name, row_index, &writes)
            .map_err(|e| {
                warn!(row = row_index, kind = ?kind, "reaction write failed");
                BoardError::UpdateFailed(e)
            })?;

        debug!(row = row_index, kind = ?kind, action = ?action, count, "reaction toggled");
        Ok(ReactionOutcome { action, count })
    }

    /// Flip the highlight flag of one row. Authorization is the caller's
    /// responsibility; serialized through the reaction lock so header
    /// resolution never interleaves with a rebuild.
    pub async fn toggle_highlight(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row_index: u32,
    ) -> Result<bool, BoardError> {
        if row_index == 0 {
            return Err(BoardError::InvalidInput(
                "row index is 1-based".to_string(),
            ));
        }

        let _guard = tokio::time::timeout(self.lock_timeout, self.lock.lock())
            .await
            .map_err(|_| BoardError::LockTimeout(self.lock_timeout))?;

        let header = self
            .headers
            .resolve(self.store.as_ref(), spreadsheet_id, sheet_name)?;
        let idx = *header
            .get(self.columns.highlight.as_str())
            .ok_or_else(|| BoardError::ColumnNotFound(self.columns.highlight.clone()))?;

        self.check_row_exists(spreadsheet_id, sheet_name, row_index)?;

        let cells = self
            .store
            .batch_get(spreadsheet_id, sheet_name, row_index, &[idx])
            .map_err(BoardError::UpdateFailed)?;
        // Anything but the literal "true" (absence included) reads as false.
        let highlighted = !cells.first().is_some_and(|v| v == "true");

        self.store
            .batch_update(
                spreadsheet_id,
                sheet_name,
                row_index,
                &[(idx, highlighted.to_string())],
            )
            .map_err(BoardError::UpdateFailed)?;

        debug!(row = row_index, highlighted, "highlight toggled");
        Ok(highlighted)
    }

    fn check_row_exists(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row_index: u32,
    ) -> Result<(), BoardError> {
        let rows = self
            .store
            .row_count(spreadsheet_id, sheet_name)
            .map_err(BoardError::UpdateFailed)?;
        if row_index > rows {
            return Err(BoardError::InvalidInput(format!(
                "row {row_index} does not exist"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    /// In-memory row-store double. Row 0 of each sheet is the header.
    struct MemStore {
        sheets: StdMutex<HashMap<(String, String), Vec<Vec<String>>>>,
        fail_writes: AtomicBool,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                sheets: StdMutex::new(HashMap::new()),
                fail_writes: AtomicBool::new(false),
            }
        }

        fn with_sheet(headers: &[&str], rows: usize) -> Arc<Self> {
            let store = Self::new();
            let mut grid = vec![headers.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
            for _ in 0..rows {
                grid.push(vec![String::new(); headers.len()]);
            }
            store
                .sheets
                .lock()
                .unwrap()
                .insert(("ss".to_string(), "Sheet1".to_string()), grid);
            Arc::new(store)
        }

        fn cell(&self, row: u32, col: usize) -> String {
            let sheets = self.sheets.lock().unwrap();
            let grid = &sheets[&("ss".to_string(), "Sheet1".to_string())];
            grid[row as usize][col].clone()
        }
    }

    impl RowStore for MemStore {
        fn header_row(&self, spreadsheet_id: &str, sheet_name: &str) -> anyhow::Result<Vec<String>> {
            let sheets = self.sheets.lock().unwrap();
            Ok(sheets
                .get(&(spreadsheet_id.to_string(), sheet_name.to_string()))
                .and_then(|grid| grid.first().cloned())
                .unwrap_or_default())
        }

        fn batch_get(
            &self,
            spreadsheet_id: &str,
            sheet_name: &str,
            row: u32,
            cols: &[usize],
        ) -> anyhow::Result<Vec<String>> {
            let sheets = self.sheets.lock().unwrap();
            let grid = sheets
                .get(&(spreadsheet_id.to_string(), sheet_name.to_string()))
                .ok_or_else(|| anyhow::anyhow!("no such sheet"))?;
            let row = grid
                .get(row as usize)
                .ok_or_else(|| anyhow::anyhow!("no such row"))?;
            Ok(cols
                .iter()
                .map(|c| row.get(*c).cloned().unwrap_or_default())
                .collect())
        }

        fn batch_update(
            &self,
            spreadsheet_id: &str,
            sheet_name: &str,
            row: u32,
            writes: &[(usize, String)],
        ) -> anyhow::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                anyhow::bail!("simulated write failure");
            }
            let mut sheets = self.sheets.lock().unwrap();
            let grid = sheets
                .get_mut(&(spreadsheet_id.to_string(), sheet_name.to_string()))
                .ok_or_else(|| anyhow::anyhow!("no such sheet"))?;
            let row = grid
                .get_mut(row as usize)
                .ok_or_else(|| anyhow::anyhow!("no such row"))?;
            for (col, value) in writes {
                if *col >= row.len() {
                    row.resize(col + 1, String::new());
                }
                row[*col] = value.clone();
            }
            Ok(())
        }

        fn append_row(
            &self,
            spreadsheet_id: &str,
            sheet_name: &str,
            values: &[String],
        ) -> anyhow::Result<u32> {
            let mut sheets = self.sheets.lock().unwrap();
            let grid = sheets
                .get_mut(&(spreadsheet_id.to_string(), sheet_name.to_string()))
                .ok_or_else(|| anyhow::anyhow!("no such sheet"))?;
            grid.push(values.to_vec());
            Ok((grid.len() - 1) as u32)
        }

        fn data_rows(&self, spreadsheet_id: &str, sheet_name: &str) -> anyhow::Result<Vec<Vec<String>>> {
            let sheets = self.sheets.lock().unwrap();
            Ok(sheets
                .get(&(spreadsheet_id.to_string(), sheet_name.to_string()))
                .map(|grid| grid[1..].to_vec())
                .unwrap_or_default())
        }

        fn row_count(&self, spreadsheet_id: &str, sheet_name: &str) -> anyhow::Result<u32> {
            let sheets = self.sheets.lock().unwrap();
            Ok(sheets
                .get(&(spreadsheet_id.to_string(), sheet_name.to_string()))
                .map(|grid| (grid.len() - 1) as u32)
                .unwrap_or(0))
        }
    }

    const HEADERS: [&str; 6] = ["opinion", "class", "UNDERSTAND", "LIKE", "CURIOUS", "HIGHLIGHT"];

    fn engine_with_rows(rows: usize) -> (BoardEngine<MemStore>, Arc<MemStore>) {
        let store = MemStore::with_sheet(&HEADERS, rows);
        (BoardEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn first_reaction_on_empty_row_adds() {
        let (engine, store) = engine_with_rows(5);

        let outcome = engine
            .apply_reaction("ss", "Sheet1", 5, ReactionKind::Like, "a@x.com")
            .await
            .unwrap();

        assert_eq!(outcome.action, ReactionAction::Added);
        assert_eq!(outcome.count, 1);
        assert_eq!(store.cell(5, 3), "a@x.com");
    }

    #[tokio::test]
    async fn switching_kinds_moves_the_user() {
        let (engine, store) = engine_with_rows(5);

        engine
            .apply_reaction("ss", "Sheet1", 5, ReactionKind::Like, "a@x.com")
            .await
            .unwrap();
        let outcome = engine
            .apply_reaction("ss", "Sheet1", 5, ReactionKind::Curious, "a@x.com")
            .await
            .unwrap();

        assert_eq!(outcome.action, ReactionAction::Added);
        assert_eq!(outcome.count, 1);
        assert_eq!(store.cell(5, 3), "", "removed from LIKE");
        assert_eq!(store.cell(5, 4), "a@x.com", "added to CURIOUS");
    }

    #[tokio::test]
    async fn double_apply_is_a_toggle() {
        let (engine, store) = engine_with_rows(1);

        let first = engine
            .apply_reaction("ss", "Sheet1", 1, ReactionKind::Understand, "a@x.com")
            .await
            .unwrap();
        let second = engine
            .apply_reaction("ss", "Sheet1", 1, ReactionKind::Understand, "a@x.com")
            .await
            .unwrap();

        assert_eq!(first.action, ReactionAction::Added);
        assert_eq!(second.action, ReactionAction::Removed);
        assert_eq!(second.count, 0);
        assert!(!codec::decode(&store.cell(1, 2)).iter().any(|u| u == "a@x.com"));
    }

    #[tokio::test]
    async fn other_users_are_untouched() {
        let (engine, store) = engine_with_rows(1);

        engine
            .apply_reaction("ss", "Sheet1", 1, ReactionKind::Like, "a@x.com")
            .await
            .unwrap();
        let outcome = engine
            .apply_reaction("ss", "Sheet1", 1, ReactionKind::Like, "b@x.com")
            .await
            .unwrap();

        assert_eq!(outcome.count, 2);
        assert_eq!(store.cell(1, 3), "a@x.com, b@x.com");
    }

    /// After any sequence of toggles, a user appears in at most one kind's
    /// set per row.
    #[tokio::test]
    async fn mutual_exclusivity_holds_across_sequences() {
        let (engine, store) = engine_with_rows(3);

        let sequence = [
            (1, ReactionKind::Like, "a@x.com"),
            (1, ReactionKind::Understand, "a@x.com"),
            (1, ReactionKind::Curious, "a@x.com"),
            (1, ReactionKind::Curious, "b@x.com"),
            (2, ReactionKind::Like, "a@x.com"),
            (1, ReactionKind::Like, "b@x.com"),
            (1, ReactionKind::Curious, "a@x.com"),
        ];
        for (row, kind, user) in sequence {
            engine
                .apply_reaction("ss", "Sheet1", row, kind, user)
                .await
                .unwrap();
        }

        for row in 1..=3u32 {
            for user in ["a@x.com", "b@x.com"] {
                let memberships = [2usize, 3, 4]
                    .iter()
                    .filter(|col| codec::decode(&store.cell(row, **col)).iter().any(|u| u == user))
                    .count();
                assert!(memberships <= 1, "user {user} in {memberships} sets on row {row}");
            }
        }
    }

    #[tokio::test]
    async fn lock_is_released_after_a_write_failure() {
        let (engine, store) = engine_with_rows(1);

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = engine
            .apply_reaction("ss", "Sheet1", 1, ReactionKind::Like, "a@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::UpdateFailed(_)));
        assert!(err.is_retryable());

        // A subsequent call must still acquire the lock and succeed.
        store.fail_writes.store(false, Ordering::SeqCst);
        let outcome = engine
            .apply_reaction("ss", "Sheet1", 1, ReactionKind::Like, "a@x.com")
            .await
            .unwrap();
        assert_eq!(outcome.action, ReactionAction::Added);
    }

    #[tokio::test]
    async fn missing_reaction_column_is_a_config_error() {
        let store = MemStore::with_sheet(&["opinion", "LIKE", "HIGHLIGHT"], 1);
        let engine = BoardEngine::new(store);

        let err = engine
            .apply_reaction("ss", "Sheet1", 1, ReactionKind::Like, "a@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::ColumnNotFound(ref c) if c == "UNDERSTAND"));
    }

    #[tokio::test]
    async fn zero_row_index_is_invalid() {
        let (engine, _) = engine_with_rows(1);
        let err = engine
            .apply_reaction("ss", "Sheet1", 0, ReactionKind::Like, "a@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidInput(_)));

        let err = engine
            .apply_reaction("ss", "Sheet1", 1, ReactionKind::Like, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn nonexistent_row_is_invalid() {
        let (engine, _) = engine_with_rows(2);
        let err = engine
            .apply_reaction("ss", "Sheet1", 3, ReactionKind::Like, "a@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidInput(_)));

        let err = engine.toggle_highlight("ss", "Sheet1", 3).await.unwrap_err();
        assert!(matches!(err, BoardError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn highlight_toggles_from_empty_cell() {
        let (engine, store) = engine_with_rows(5);

        assert_eq!(store.cell(5, 5), "");
        assert!(engine.toggle_highlight("ss", "Sheet1", 5).await.unwrap());
        assert_eq!(store.cell(5, 5), "true");

        assert!(!engine.toggle_highlight("ss", "Sheet1", 5).await.unwrap());
        assert_eq!(store.cell(5, 5), "false");
    }
}
