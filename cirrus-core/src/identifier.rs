//! Identifier - Composite remote identifiers
//!
//! Resources nested under a parent (a DHCP server inside a workspace, a
//! destination inside an Event Notifications instance) are identified by the
//! parent and child IDs joined with `/`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("Incorrect ID {id}: expected {expected} parts separated by '/', got {got}")]
    WrongPartCount {
        id: String,
        expected: usize,
        got: usize,
    },

    #[error("Incorrect ID {id}: empty part at position {index}")]
    EmptyPart { id: String, index: usize },
}

pub fn join_id(parts: &[&str]) -> String {
    parts.join("/")
}

/// Split a composite identifier into exactly `n` non-empty parts
pub fn split_id(id: &str, n: usize) -> Result<Vec<String>, IdentifierError> {
    let parts: Vec<String> = id.split('/').map(str::to_string).collect();
    if parts.len() != n {
        return Err(IdentifierError::WrongPartCount {
            id: id.to_string(),
            expected: n,
            got: parts.len(),
        });
    }
    if let Some(index) = parts.iter().position(|p| p.is_empty()) {
        return Err(IdentifierError::EmptyPart {
            id: id.to_string(),
            index,
        });
    }
    Ok(parts)
}

/// Split a `parent/child` identifier
pub fn split_pair(id: &str) -> Result<(String, String), IdentifierError> {
    let mut parts = split_id(id, 2)?.into_iter();
    match (parts.next(), parts.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(IdentifierError::WrongPartCount {
            id: id.to_string(),
            expected: 2,
            got: 0,
        }),
    }
}
