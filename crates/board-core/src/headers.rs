//! Header index cache: maps column header labels to 0-based physical column
//! indices for one (spreadsheet, sheet), rebuilt by scanning the header row.
//!
//! The cache is read-through with a TTL; the header row itself stays the
//! source of truth. Invalidation policy: sheet creation and board
//! reconfiguration call [`HeaderIndex::invalidate`]; any out-of-band column
//! change is visible only after the TTL elapses.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::TtlCache;
use crate::error::BoardError;
use crate::store::RowStore;

pub const DEFAULT_HEADER_TTL: Duration = Duration::from_secs(300);

pub struct HeaderIndex {
    cache: TtlCache,
    ttl: Duration,
}

impl HeaderIndex {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(),
            ttl,
        }
    }

    /// Resolve label -> column index for a sheet, from cache when unexpired.
    pub fn resolve<S: RowStore + ?Sized>(
        &self,
        store: &S,
        spreadsheet_id: &str,
        sheet_name: &str,
    ) -> Result<HashMap<String, usize>, BoardError> {
        let key = Self::key(spreadsheet_id, sheet_name);

        if let Some(cached) = self.cache.get(&key) {
            if let Ok(map) = serde_json::from_str(&cached) {
                return Ok(map);
            }
            // Unparseable entry: fall through to a rebuild.
            self.cache.remove(&key);
        }

        self.rebuild(store, spreadsheet_id, sheet_name)
    }

    /// Bypass the cache: re-scan the header row and overwrite the entry.
    pub fn rebuild<S: RowStore + ?Sized>(
        &self,
        store: &S,
        spreadsheet_id: &str,
        sheet_name: &str,
    ) -> Result<HashMap<String, usize>, BoardError> {
        let headers = store
            .header_row(spreadsheet_id, sheet_name)
            .map_err(BoardError::UpdateFailed)?;

        let mut map = HashMap::new();
        for (idx, label) in headers.iter().enumerate() {
            let label = label.trim();
            if label.is_empty() {
                continue;
            }
            // First occurrence wins on duplicate labels.
            map.entry(label.to_string()).or_insert(idx);
        }

        if let Ok(json) = serde_json::to_string(&map) {
            self.cache
                .put(&Self::key(spreadsheet_id, sheet_name), json, self.ttl);
        }
        debug!(spreadsheet_id, sheet_name, columns = map.len(), "header index rebuilt");

        Ok(map)
    }

    /// Drop the cached entry for one sheet. Called when the sheet's columns
    /// are known to have changed (creation, board reconfiguration).
    pub fn invalidate(&self, spreadsheet_id: &str, sheet_name: &str) {
        self.cache.remove(&Self::key(spreadsheet_id, sheet_name));
    }

    fn key(spreadsheet_id: &str, sheet_name: &str) -> String {
        format!("headers_{spreadsheet_id}_{sheet_name}")
    }
}

impl Default for HeaderIndex {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_TTL)
    }
}
