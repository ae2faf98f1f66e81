//! Small markup fragments shared by the dashboard pages.
//!
//! Everything interpolated goes through the sanitizer.

use axentia_auth::{Role, UserIdentity};
use axentia_core::{TenantId, escape_for_attribute, escape_for_text};

use crate::tenant::{ALL_TENANTS_LABEL, Tenant};

/// Name plus role badge for the header.
pub fn user_badge(user: &UserIdentity, role: Role) -> String {
    let class = if role.is_admin() { "badge-admin" } else { "badge-user" };
    format!(
        r#"<span class="user-name">{}</span> <span class="role-badge {}">{}</span>"#,
        escape_for_text(user.label()),
        class,
        escape_for_text(role.label()),
    )
}

/// `<option>` list for the admin tenant switcher; the empty value means all.
pub fn tenant_options(tenants: &[Tenant], selected: Option<&TenantId>) -> String {
    let mut out = format!(
        r#"<option value=""{}>{}</option>"#,
        if selected.is_none() { " selected" } else { "" },
        ALL_TENANTS_LABEL
    );
    for tenant in tenants {
        let is_selected = selected == Some(&tenant.id);
        out.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            escape_for_attribute(tenant.id.as_str()),
            if is_selected { " selected" } else { "" },
            escape_for_text(&tenant.name),
        ));
    }
    out
}

/// Unread badge text: hidden at zero, capped at `9+`.
pub fn unread_badge(count: usize) -> Option<String> {
    match count {
        0 => None,
        1..=9 => Some(count.to_string()),
        _ => Some("9+".to_string()),
    }
}
