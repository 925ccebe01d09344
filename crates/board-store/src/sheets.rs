use anyhow::Result;

use board_core::store::{RowStore, VersionStore};

use crate::{Database, OptionalExt};

impl Database {
    // -- Sheets --

    /// Create a sheet and write its header row (physical row 0). The
    /// reserved reaction/highlight columns are part of `headers`; they are
    /// appended exactly once here and never again.
    pub fn create_sheet(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        owner_id: &str,
        headers: &[String],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sheets (spreadsheet_id, sheet_name, owner_id) VALUES (?1, ?2, ?3)",
                (spreadsheet_id, sheet_name, owner_id),
            )?;

            let mut stmt = conn.prepare(
                "INSERT INTO cells (spreadsheet_id, sheet_name, row, col, value)
                 VALUES (?1, ?2, 0, ?3, ?4)",
            )?;
            for (col, label) in headers.iter().enumerate() {
                stmt.execute(rusqlite::params![spreadsheet_id, sheet_name, col as i64, label])?;
            }
            Ok(())
        })
    }

    pub fn sheet_owner(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT owner_id FROM sheets WHERE spreadsheet_id = ?1 AND sheet_name = ?2",
                (spreadsheet_id, sheet_name),
                |row| row.get(0),
            )
            .optional()
        })
    }
}

impl RowStore for Database {
    fn header_row(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT col, value FROM cells
                 WHERE spreadsheet_id = ?1 AND sheet_name = ?2 AND row = 0
                 ORDER BY col",
            )?;
            let cells = stmt
                .query_map((spreadsheet_id, sheet_name), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let width = cells.last().map(|(col, _)| *col as usize + 1).unwrap_or(0);
            let mut header = vec![String::new(); width];
            for (col, value) in cells {
                header[col as usize] = value;
            }
            Ok(header)
        })
    }

    fn batch_get(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row: u32,
        cols: &[usize],
    ) -> Result<Vec<String>> {
        if cols.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (0..cols.len()).map(|i| format!("?{}", i + 4)).collect();
            let sql = format!(
                "SELECT col, value FROM cells
                 WHERE spreadsheet_id = ?1 AND sheet_name = ?2 AND row = ?3 AND col IN ({})",
                placeholders.join(", ")
            );

            let row_num = row as i64;
            let col_nums: Vec<i64> = cols.iter().map(|c| *c as i64).collect();
            let mut params: Vec<&dyn rusqlite::types::ToSql> =
                vec![&spreadsheet_id, &sheet_name, &row_num];
            params.extend(col_nums.iter().map(|c| c as &dyn rusqlite::types::ToSql));

            let mut stmt = conn.prepare(&sql)?;
            let found = stmt
                .query_map(params.as_slice(), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // Unwritten cells read as "".
            Ok(cols
                .iter()
                .map(|c| {
                    found
                        .iter()
                        .find(|(col, _)| *col == *c as i64)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default()
                })
                .collect())
        })
    }

    fn batch_update(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        row: u32,
        writes: &[(usize, String)],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO cells (spreadsheet_id, sheet_name, row, col, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(spreadsheet_id, sheet_name, row, col)
                 DO UPDATE SET value = excluded.value",
            )?;
            for (col, value) in writes {
                stmt.execute(rusqlite::params![
                    spreadsheet_id,
                    sheet_name,
                    row as i64,
                    *col as i64,
                    value
                ])?;
            }
            Ok(())
        })
    }

    fn append_row(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        values: &[String],
    ) -> Result<u32> {
        self.with_conn_mut(|conn| {
            let next: i64 = conn.query_row(
                "SELECT COALESCE(MAX(row), 0) + 1 FROM cells
                 WHERE spreadsheet_id = ?1 AND sheet_name = ?2",
                (spreadsheet_id, sheet_name),
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "INSERT INTO cells (spreadsheet_id, sheet_name, row, col, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (col, value) in values.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    spreadsheet_id,
                    sheet_name,
                    next,
                    col as i64,
                    value
                ])?;
            }
            Ok(next as u32)
        })
    }

    fn data_rows(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Vec<Vec<String>>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT row, col, value FROM cells
                 WHERE spreadsheet_id = ?1 AND sheet_name = ?2 AND row >= 1
                 ORDER BY row, col",
            )?;
            let cells = stmt
                .query_map((spreadsheet_id, sheet_name), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let last_row = cells.last().map(|(r, _, _)| *r as usize).unwrap_or(0);
            let mut rows: Vec<Vec<String>> = vec![Vec::new(); last_row];
            for (r, c, value) in cells {
                let row = &mut rows[r as usize - 1];
                if c as usize >= row.len() {
                    row.resize(c as usize + 1, String::new());
                }
                row[c as usize] = value;
            }
            Ok(rows)
        })
    }

    fn row_count(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<u32> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COALESCE(MAX(row), 0) FROM cells
                 WHERE spreadsheet_id = ?1 AND sheet_name = ?2",
                (spreadsheet_id, sheet_name),
                |row| row.get(0),
            )?;
            Ok(count as u32)
        })
    }
}

impl VersionStore for Database {
    fn cache_version(&self, kind: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let version: Option<i64> = conn
                .query_row(
                    "SELECT version FROM cache_versions WHERE kind = ?1",
                    [kind],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(version.unwrap_or(0) as u64)
        })
    }

    fn bump_cache_version(&self, kind: &str) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let version: i64 = conn.query_row(
                "INSERT INTO cache_versions (kind, version) VALUES (?1, 1)
                 ON CONFLICT(kind) DO UPDATE SET version = version + 1
                 RETURNING version",
                [kind],
                |row| row.get(0),
            )?;
            Ok(version as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        ["opinion", "class", "UNDERSTAND", "LIKE", "CURIOUS", "HIGHLIGHT"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn db_with_sheet() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "t@school.example", "hash").unwrap();
        db.create_sheet("ss", "Sheet1", "u1", &headers()).unwrap();
        db
    }

    #[test]
    fn sheet_creation_writes_header_row() {
        let db = db_with_sheet();
        assert_eq!(db.header_row("ss", "Sheet1").unwrap(), headers());
        assert_eq!(db.sheet_owner("ss", "Sheet1").unwrap().as_deref(), Some("u1"));
        assert!(db.sheet_owner("ss", "Other").unwrap().is_none());
    }

    #[test]
    fn duplicate_sheet_is_rejected() {
        let db = db_with_sheet();
        assert!(db.create_sheet("ss", "Sheet1", "u1", &headers()).is_err());
    }

    #[test]
    fn append_assigns_sequential_data_rows() {
        let db = db_with_sheet();

        let first = db
            .append_row("ss", "Sheet1", &["an answer".to_string()])
            .unwrap();
        let second = db
            .append_row("ss", "Sheet1", &["another".to_string()])
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(db.row_count("ss", "Sheet1").unwrap(), 2);

        let rows = db.data_rows("ss", "Sheet1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "an answer");
        assert_eq!(rows[1][0], "another");
    }

    #[test]
    fn batch_get_reads_unwritten_cells_as_empty() {
        let db = db_with_sheet();
        db.append_row("ss", "Sheet1", &["hello".to_string()]).unwrap();

        let values = db.batch_get("ss", "Sheet1", 1, &[0, 3, 4]).unwrap();
        assert_eq!(values, vec!["hello".to_string(), String::new(), String::new()]);

        assert!(db.batch_get("ss", "Sheet1", 1, &[]).unwrap().is_empty());
    }

    #[test]
    fn batch_update_upserts_cells() {
        let db = db_with_sheet();
        db.append_row("ss", "Sheet1", &["hello".to_string()]).unwrap();

        db.batch_update(
            "ss",
            "Sheet1",
            1,
            &[(3, "a@x.com".to_string()), (5, "true".to_string())],
        )
        .unwrap();
        let values = db.batch_get("ss", "Sheet1", 1, &[3, 5]).unwrap();
        assert_eq!(values, vec!["a@x.com".to_string(), "true".to_string()]);

        db.batch_update("ss", "Sheet1", 1, &[(3, String::new())]).unwrap();
        assert_eq!(db.batch_get("ss", "Sheet1", 1, &[3]).unwrap()[0], "");
    }

    #[test]
    fn cache_versions_start_at_zero_and_bump() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.cache_version("users").unwrap(), 0);
        assert_eq!(db.bump_cache_version("users").unwrap(), 1);
        assert_eq!(db.bump_cache_version("users").unwrap(), 2);
        assert_eq!(db.cache_version("users").unwrap(), 2);

        // Kinds are independent counters.
        assert_eq!(db.cache_version("headers").unwrap(), 0);
    }
}
