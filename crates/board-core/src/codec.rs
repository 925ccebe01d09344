//! Reaction cell codec: the set of users who reacted to a row is stored as
//! one comma-delimited string cell value.

/// Decode a reaction cell into the list of user identifiers it holds.
/// Splits on `,`, trims whitespace, drops empty tokens and duplicates
/// (first occurrence wins).
pub fn decode(cell: &str) -> Vec<String> {
    let mut users: Vec<String> = Vec::new();
    for token in cell.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if !users.iter().any(|u| u == token) {
            users.push(token.to_string());
        }
    }
    users
}

/// Encode a list of user identifiers back into a cell value.
pub fn encode(users: &[String]) -> String {
    users.join(", ")
}
