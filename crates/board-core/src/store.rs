use anyhow::Result;

/// Narrow row-store interface the engine operates against. One adapter per
/// backing store: the SQLite adapter in board-store, in-memory doubles in
/// tests.
///
/// Addressing: data rows are 1-based and exclude the header row; column
/// indices are 0-based. Cells that were never written read as `""`.
pub trait RowStore: Send + Sync {
    /// The header row of a sheet. Empty when the sheet does not exist.
    fn header_row(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Vec<String>>;

    /// Read the given columns of one data row in a single round trip.
    /// Returns one value per requested column, in request order.
    fn batch_get(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row: u32,
        cols: &[usize],
    ) -> Result<Vec<String>>;

    /// Write the given (column, value) pairs of one data row in a single
    /// round trip.
    fn batch_update(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row: u32,
        writes: &[(usize, String)],
    ) -> Result<()>;

    /// Append a data row after the current last row. Returns the new row's
    /// 1-based index.
    fn append_row(&self, spreadsheet_id: &str, sheet_name: &str, values: &[String])
    -> Result<u32>;

    /// All data rows in insertion order. Row `i` of the result is data row
    /// `i + 1`.
    fn data_rows(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Vec<Vec<String>>>;

    /// Number of data rows (header excluded).
    fn row_count(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<u32>;
}

/// Persistent per-kind version counters backing cheap cache invalidation:
/// bumping a kind's version makes every previously-cached entry of that kind
/// unreachable without enumerating or deleting anything.
pub trait VersionStore: Send + Sync {
    /// Current version for a cache kind; 0 when never bumped.
    fn cache_version(&self, kind: &str) -> Result<u64>;

    /// Increment and return the new version.
    fn bump_cache_version(&self, kind: &str) -> Result<u64>;
}
