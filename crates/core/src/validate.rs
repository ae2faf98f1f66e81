//! Input validators applied before a request is ever built.
//!
//! Each validator answers "is this value acceptable"; callers turn a `false`
//! into a [`DomainError::Validation`](crate::DomainError) next to the form.

use std::sync::LazyLock;

use regex::Regex;

pub const PERIODS: [&str; 5] = ["24h", "7d", "30d", "90d", "365d"];
pub const ROLES: [&str; 2] = ["admin", "user"];
pub const TICKET_STATUSES: [&str; 4] = ["open", "in_progress", "resolved", "closed"];
pub const TICKET_PRIORITIES: [&str; 4] = ["low", "medium", "high", "urgent"];

static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\w\-. ]+\.(pdf|docx|txt|csv|xlsx)$").expect("file name pattern is valid")
});
static WORKFLOW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("workflow id pattern is valid"));
static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern is valid")
});
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));
static DISPLAY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\s\-'.]{1,100}$").expect("display name pattern is valid")
});

pub fn period(value: &str) -> bool {
    PERIODS.contains(&value)
}

/// Knowledge-base upload names: word characters, dashes, dots and spaces
/// with one of the indexable extensions.
pub fn file_name(value: &str) -> bool {
    FILE_NAME.is_match(value)
}

pub fn workflow_id(value: &str) -> bool {
    WORKFLOW_ID.is_match(value)
}

pub fn uuid(value: &str) -> bool {
    UUID.is_match(value)
}

pub fn email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn role(value: &str) -> bool {
    ROLES.contains(&value)
}

pub fn ticket_status(value: &str) -> bool {
    TICKET_STATUSES.contains(&value)
}

pub fn ticket_priority(value: &str) -> bool {
    TICKET_PRIORITIES.contains(&value)
}

pub fn display_name(value: &str) -> bool {
    DISPLAY_NAME.is_match(value)
}
