//! `axentia-core`: shared primitives for the Axentia dashboard client.
//!
//! Identifiers, the validation error model, input validators and the HTML
//! sanitizer. Nothing in this crate performs IO.

pub mod error;
pub mod id;
pub mod sanitize;
pub mod validate;

pub use error::{DomainError, DomainResult};
pub use id::{TenantId, TicketId, UserId};
pub use sanitize::{escape_for_attribute, escape_for_text, generate_id, sanitize_value};
