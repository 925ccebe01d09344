use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            is_active   INTEGER NOT NULL DEFAULT 1,
            config      TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sheets (
            spreadsheet_id  TEXT NOT NULL,
            sheet_name      TEXT NOT NULL,
            owner_id        TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (spreadsheet_id, sheet_name)
        );

        -- Row 0 of each sheet is the header row; data rows are 1-based.
        CREATE TABLE IF NOT EXISTS cells (
            spreadsheet_id  TEXT NOT NULL,
            sheet_name      TEXT NOT NULL,
            row             INTEGER NOT NULL,
            col             INTEGER NOT NULL,
            value           TEXT NOT NULL,
            PRIMARY KEY (spreadsheet_id, sheet_name, row, col)
        );

        CREATE INDEX IF NOT EXISTS idx_cells_row
            ON cells(spreadsheet_id, sheet_name, row);

        CREATE TABLE IF NOT EXISTS cache_versions (
            kind        TEXT PRIMARY KEY,
            version     INTEGER NOT NULL DEFAULT 0
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
