/// Database row types; these map directly to SQLite rows.
/// Distinct from board-types API models to keep the store layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
    pub config: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
