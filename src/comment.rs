/// Comment metadata read from the page and the "is this new" decision

use chrono::DateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    /// Unix seconds, `None` when the page gave no parseable date
    pub created: Option<i64>,
    pub depth: u32,
}

impl Comment {
    pub fn new(id: &str, author: &str, created_iso: &str, depth: u32) -> Comment {
        Comment {
            id: id.to_string(),
            author: author.to_string(),
            created: parse_timestamp(created_iso),
            depth,
        }
    }

    /// New means posted after the last visit by someone other than the viewer
    pub fn is_new(&self, last_visit: u64, current_user: Option<&str>) -> bool {
        if let Some(user) = current_user {
            if !user.is_empty() && self.author.eq_ignore_ascii_case(user) {
                return false;
            }
        }

        match self.created {
            Some(created) => created > last_visit as i64,
            None => false,
        }
    }
}

/// Parse an ISO 8601 / RFC 3339 date into Unix seconds
pub fn parse_timestamp(iso: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(iso.trim())
        .ok()
        .map(|date| date.timestamp())
}
