//! Support tickets (centralized API).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use axentia_auth::require_admin;
use axentia_core::{DomainError, TicketId, validate};

use crate::context::AppContext;
use crate::endpoint::LogicalPath;
use crate::error::{ClientError, ClientResult};
use crate::lenient;
use crate::request::action;
use crate::response::{Fetched, Mutation, degrade, expect_success};
use crate::storage::{KeyValueStore, keys, read_json, write_json};
use crate::ui::unread_badge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Aperto",
            TicketStatus::InProgress => "In Lavorazione",
            TicketStatus::Resolved => "Risolto",
            TicketStatus::Closed => "Chiuso",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainError::ensure(validate::ticket_status(s), format!("invalid ticket status '{s}'"))?;
        Ok(match s {
            "open" => TicketStatus::Open,
            "in_progress" => TicketStatus::InProgress,
            "resolved" => TicketStatus::Resolved,
            _ => TicketStatus::Closed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketPriority::Low => "Bassa",
            TicketPriority::Medium => "Media",
            TicketPriority::High => "Alta",
            TicketPriority::Urgent => "Urgente",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainError::ensure(validate::ticket_priority(s), format!("invalid ticket priority '{s}'"))?;
        Ok(match s {
            "low" => TicketPriority::Low,
            "medium" => TicketPriority::Medium,
            "high" => TicketPriority::High,
            _ => TicketPriority::Urgent,
        })
    }
}

/// Ticket summary. Status and priority stay raw so an unexpected value from
/// the backend does not hide the ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: TicketId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub subject: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub priority: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::int")]
    pub message_count: i64,
    #[serde(default, deserialize_with = "lenient::int")]
    pub visible_message_count: i64,
}

impl Ticket {
    pub fn status(&self) -> Option<TicketStatus> {
        self.status.parse().ok()
    }

    pub fn priority(&self) -> Option<TicketPriority> {
        self.priority.parse().ok()
    }

    /// Messages the caller can see: admins count internal notes too.
    pub fn countable_messages(&self, is_admin: bool) -> i64 {
        if is_admin { self.message_count } else { self.visible_message_count }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMessage {
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_admin: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_internal: bool,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
}

impl TicketDetail {
    /// Messages shown to the caller; internal notes are admin-only.
    pub fn visible_messages(&self, is_admin: bool) -> Vec<&TicketMessage> {
        self.messages.iter().filter(|m| is_admin || !m.is_internal).collect()
    }
}

/// Accept `{ "tickets": [...] }` or a bare array; entries without a usable
/// `ticket_id` are dropped.
pub fn parse_ticket_list(value: Value) -> Vec<Ticket> {
    lenient::list(value, "tickets")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub search: String,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

impl TicketFilter {
    pub fn is_active(&self) -> bool {
        !self.search.is_empty() || self.status.is_some() || self.priority.is_some()
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        if !self.search.is_empty() {
            let term = self.search.to_lowercase();
            let hit = ticket.ticket_id.as_str().to_lowercase().contains(&term)
                || ticket.subject.to_lowercase().contains(&term)
                || ticket
                    .company_name
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if self.status.is_some_and(|s| ticket.status() != Some(s)) {
            return false;
        }
        if self.priority.is_some_and(|p| ticket.priority() != Some(p)) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, tickets: &'a [Ticket]) -> Vec<&'a Ticket> {
        tickets.iter().filter(|t| self.matches(t)).collect()
    }
}

/// New ticket as entered in the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub category: String,
    pub priority: String,
}

/// Admin extras on a reply; ignored for regular users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyOptions {
    pub internal: bool,
    pub new_status: Option<String>,
}

/// Per-user "messages seen" markers kept in the persistent store.
pub struct UnreadTracker<'a> {
    store: &'a dyn KeyValueStore,
    key: String,
}

impl<'a> UnreadTracker<'a> {
    pub fn new(store: &'a dyn KeyValueStore, uid: &str) -> Self {
        Self {
            store,
            key: keys::ticket_seen(uid),
        }
    }

    fn seen(&self) -> HashMap<String, i64> {
        read_json(self.store, &self.key).unwrap_or_default()
    }

    pub fn mark_seen(&self, ticket_id: &TicketId, message_count: i64) {
        let mut seen = self.seen();
        seen.insert(ticket_id.to_string(), message_count);
        write_json(self.store, &self.key, &seen);
    }

    /// Tickets with more messages than last seen.
    pub fn unread_count(&self, tickets: &[Ticket], is_admin: bool) -> usize {
        let seen = self.seen();
        tickets
            .iter()
            .filter(|t| t.countable_messages(is_admin) > seen.get(t.ticket_id.as_str()).copied().unwrap_or(0))
            .count()
    }
}

pub struct Support {
    ctx: AppContext,
}

impl Support {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    fn url(&self) -> String {
        self.ctx.endpoint(LogicalPath::SupportApi)
    }

    fn uid(&self) -> ClientResult<String> {
        self.ctx
            .session()
            .current_user()
            .map(|u| u.uid.to_string())
            .ok_or_else(|| ClientError::Authentication("no signed-in user".into()))
    }

    pub async fn list(&self) -> ClientResult<Fetched<Vec<Ticket>>> {
        let mut body = action("list_tickets");
        if !self.ctx.is_admin() {
            body.insert("firebase_uid".into(), Value::String(self.uid()?));
        }

        let fetched = self.ctx.requester().load::<Value>(&self.url(), body).await?;
        Ok(fetched.map(parse_ticket_list).non_empty())
    }

    pub async fn get(&self, ticket_id: &TicketId) -> ClientResult<Fetched<TicketDetail>> {
        let body = json!({ "action": "get_ticket", "ticket_id": ticket_id });
        let outcome = self.ctx.requester().post_unscoped(&self.url(), body).await;
        degrade(outcome).await
    }

    /// Open a ticket for the active tenant (or the caller's own).
    pub async fn create(&self, ticket: NewTicket) -> ClientResult<Value> {
        if ticket.subject.trim().is_empty() || ticket.description.trim().is_empty() {
            return Err(DomainError::validation("subject and description are required").into());
        }
        let priority: TicketPriority = ticket.priority.parse()?;
        let company = self
            .ctx
            .active_tenant()
            .or_else(|| self.ctx.claims().tenant_id())
            .ok_or_else(|| DomainError::validation("no company associated with this account"))?;
        let user_id = self.uid()?;

        let body = json!({
            "action": "create_ticket",
            "subject": ticket.subject.trim(),
            "description": ticket.description.trim(),
            "category": ticket.category,
            "priority": priority.as_str(),
            "company_id": company,
            "user_id": user_id,
        });
        let created = expect_success(self.ctx.requester().post_unscoped(&self.url(), body).await).await?;
        tracing::info!(company = %company, "ticket created");
        Ok(created)
    }

    pub async fn add_message(&self, ticket_id: &TicketId, message: &str, options: ReplyOptions) -> ClientResult<Value> {
        if message.trim().is_empty() {
            return Err(DomainError::validation("message is empty").into());
        }
        let user = self
            .ctx
            .session()
            .current_user()
            .ok_or_else(|| ClientError::Authentication("no signed-in user".into()))?;

        let mut body = action("add_message");
        body.insert("ticket_id".into(), json!(ticket_id));
        body.insert("message".into(), json!(message));
        body.insert("user_id".into(), json!(user.uid));
        body.insert(
            "author_name".into(),
            json!(user.display_name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Utente")),
        );

        if self.ctx.is_admin() {
            if options.internal {
                body.insert("is_internal".into(), Value::Bool(true));
            }
            if let Some(status) = options.new_status.as_deref() {
                let status: TicketStatus = status.parse()?;
                body.insert("new_status".into(), json!(status.as_str()));
            }
        }

        expect_success(self.ctx.requester().post_unscoped(&self.url(), Value::Object(body)).await).await
    }

    /// Admin only; a silent no-op for everyone else.
    pub async fn delete(&self, ticket_id: &TicketId) -> ClientResult<Mutation> {
        if require_admin(self.ctx.role()).is_err() {
            return Ok(Mutation::Ignored);
        }
        let body = json!({ "action": "delete_ticket", "ticket_id": ticket_id });
        expect_success(self.ctx.requester().post_unscoped(&self.url(), body).await).await?;
        tracing::info!(ticket = %ticket_id, "ticket deleted");
        Ok(Mutation::Applied)
    }

    /// Remember how many messages the caller has seen on this ticket.
    pub fn mark_seen(&self, detail: &TicketDetail) -> ClientResult<()> {
        let count = detail.visible_messages(self.ctx.is_admin()).len() as i64;
        UnreadTracker::new(self.ctx.persistent_store(), &self.uid()?).mark_seen(&detail.ticket.ticket_id, count);
        Ok(())
    }

    pub fn unread_count(&self, tickets: &[Ticket]) -> ClientResult<usize> {
        Ok(UnreadTracker::new(self.ctx.persistent_store(), &self.uid()?).unread_count(tickets, self.ctx.is_admin()))
    }

    pub fn unread_badge(&self, tickets: &[Ticket]) -> ClientResult<Option<String>> {
        Ok(unread_badge(self.unread_count(tickets)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn tickets() -> Vec<Ticket> {
        parse_ticket_list(json!({
            "tickets": [
                {"ticket_id": "T-1", "subject": "Fattura errata", "status": "open", "priority": "high",
                 "company_name": "Acme", "message_count": 4, "visible_message_count": "2"},
                {"ticket_id": "", "subject": "senza id"},
                {"subject": "nemmeno questo"},
                {"ticket_id": "T-2", "subject": "Accesso", "status": "closed", "priority": "low",
                 "message_count": 1, "visible_message_count": 1}
            ]
        }))
    }

    #[test]
    fn entries_without_ids_are_dropped() {
        let list = tickets();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].visible_message_count, 2);
        assert!(parse_ticket_list(json!("nope")).is_empty());
        assert_eq!(parse_ticket_list(json!([{"ticket_id": "x"}])).len(), 1);
    }

    #[test]
    fn filters_combine() {
        let list = tickets();
        let by_company = TicketFilter {
            search: "acme".into(),
            ..TicketFilter::default()
        };
        assert_eq!(by_company.apply(&list).len(), 1);

        let closed = TicketFilter {
            status: Some(TicketStatus::Closed),
            ..TicketFilter::default()
        };
        assert_eq!(closed.apply(&list)[0].ticket_id.as_str(), "T-2");

        let urgent = TicketFilter {
            priority: Some(TicketPriority::Urgent),
            ..TicketFilter::default()
        };
        assert!(urgent.apply(&list).is_empty());
    }

    #[test]
    fn unread_counts_depend_on_role() {
        let store = MemoryStore::new();
        let tracker = UnreadTracker::new(&store, "u1");
        let list = tickets();

        assert_eq!(tracker.unread_count(&list, false), 2);

        tracker.mark_seen(&list[0].ticket_id, 2);
        tracker.mark_seen(&list[1].ticket_id, 1);
        assert_eq!(tracker.unread_count(&list, false), 0);
        // Admins also count internal notes.
        assert_eq!(tracker.unread_count(&list, true), 1);

        assert!(store.get("ticket_seen_u1").is_some());
    }

    #[test]
    fn internal_notes_are_hidden_from_users() {
        let detail: TicketDetail = serde_json::from_value(json!({
            "ticket": {"ticket_id": "T-1"},
            "messages": [
                {"content": "ciao", "is_admin": false},
                {"content": "nota", "is_admin": true, "is_internal": true}
            ]
        }))
        .unwrap();
        assert_eq!(detail.visible_messages(false).len(), 1);
        assert_eq!(detail.visible_messages(true).len(), 2);
    }

    #[test]
    fn enums_parse_through_the_validators() {
        assert_eq!("in_progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert!("pending".parse::<TicketStatus>().is_err());
        assert_eq!("urgent".parse::<TicketPriority>().unwrap().label(), "Urgente");
    }
}
