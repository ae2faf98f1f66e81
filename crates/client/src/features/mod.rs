//! Dashboard pages as plain modules over [`crate::AppContext`].

pub mod admin;
pub mod knowledge;
pub mod reports;
pub mod support;
pub mod workflows;

pub use admin::Administration;
pub use knowledge::KnowledgeBase;
pub use reports::Reports;
pub use support::Support;
pub use workflows::Workflows;
