//! User and company management (admins only, centralized API).
//!
//! Every operation checks the caller's role first. Loads for non-admins come
//! back as [`Fetched::Failed`] with [`ACCESS_DENIED`]; mutations come back as
//! [`Mutation::Ignored`] without touching the network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use axentia_auth::{Role, require_admin};
use axentia_core::{DomainError, TenantId, UserId, escape_for_text, validate};

use crate::context::AppContext;
use crate::endpoint::LogicalPath;
use crate::error::ClientResult;
use crate::lenient;
use crate::request::action;
use crate::response::{Fetched, Mutation, degrade, expect_success};
use crate::tenant::{Tenant, parse_tenant_list};

pub const ACCESS_DENIED: &str = "Accesso negato: sezione riservata agli amministratori.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedUser {
    pub user_id: UserId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub company_id: Option<TenantId>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub role: String,
    /// Only an explicit `false` disables an account.
    #[serde(default = "lenient::default_true", deserialize_with = "lenient::flag_default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl ManagedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}

/// Users as the backend returns them, bare or under `users`. Entries without
/// a usable `user_id` are skipped.
pub fn parse_user_list(value: Value) -> Vec<ManagedUser> {
    lenient::list(value, "users")
}

pub fn role_badge(role: &str) -> String {
    let (class, label) = match role {
        "admin" => ("role-admin", "Admin"),
        "user" => ("role-user", "Utente"),
        _ => ("", role),
    };
    format!(r#"<span class="role-badge {class}">{}</span>"#, escape_for_text(label))
}

pub fn status_badge(is_active: bool) -> &'static str {
    if is_active {
        r#"<span class="status-badge status-active">Attivo</span>"#
    } else {
        r#"<span class="status-badge status-inactive">Disattivato</span>"#
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Usually the admin's active tenant.
    pub tenant: Option<TenantId>,
    pub search: String,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

impl UserFilter {
    pub fn matches(&self, user: &ManagedUser) -> bool {
        if let Some(tenant) = &self.tenant {
            if user.company_id.as_ref() != Some(tenant) {
                return false;
            }
        }
        if !self.search.is_empty() {
            let term = self.search.to_lowercase();
            let contains = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(&term));
            if !contains(Some(user.email.as_str()))
                && !contains(user.display_name.as_deref())
                && !contains(user.company_name.as_deref())
            {
                return false;
            }
        }
        if self.role.is_some_and(|r| r.as_str() != user.role) {
            return false;
        }
        match self.status {
            Some(AccountStatus::Active) => user.is_active,
            Some(AccountStatus::Inactive) => !user.is_active,
            None => true,
        }
    }

    pub fn apply<'a>(&self, users: &'a [ManagedUser]) -> Vec<&'a ManagedUser> {
        users.iter().filter(|u| self.matches(u)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub users: usize,
    pub admins: usize,
    pub active: usize,
    pub companies: usize,
}

impl AdminStats {
    pub fn compute(users: &[ManagedUser], companies: &[Tenant]) -> Self {
        Self {
            users: users.len(),
            admins: users.iter().filter(|u| u.is_admin()).count(),
            active: users.iter().filter(|u| u.is_active).count(),
            companies: companies.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub company_id: String,
    pub role: String,
    pub display_name: Option<String>,
}

impl NewUser {
    fn into_body(self) -> ClientResult<Value> {
        DomainError::ensure(validate::email(&self.email), "invalid email")?;
        let company = TenantId::new(self.company_id).map_err(|_| DomainError::validation("select a company"))?;
        let role: Role = self.role.parse()?;
        let display_name = checked_display_name(self.display_name)?;

        let mut body = action("create_user");
        body.insert("email".into(), json!(self.email.trim()));
        body.insert("company_id".into(), json!(company));
        body.insert("role".into(), json!(role.as_str()));
        if let Some(name) = display_name {
            body.insert("display_name".into(), json!(name));
        }
        Ok(Value::Object(body))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub company_id: Option<TenantId>,
    pub role: String,
    pub is_active: bool,
}

impl UserUpdate {
    fn into_body(self) -> ClientResult<Value> {
        let role: Role = self.role.parse()?;
        let display_name = checked_display_name(self.display_name)?;
        Ok(json!({
            "action": "update_user",
            "user_id": self.user_id,
            "display_name": display_name,
            "company_id": self.company_id,
            "role": role.as_str(),
            "is_active": self.is_active,
        }))
    }
}

/// Company as entered in the create/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyForm {
    pub name: String,
    pub backend_endpoint: Option<String>,
}

impl CompanyForm {
    fn fields(self) -> ClientResult<Map<String, Value>> {
        let name = self.name.trim();
        DomainError::ensure(!name.is_empty(), "company name is required")?;

        let mut fields = Map::new();
        fields.insert("name".into(), json!(name));
        let endpoint = self
            .backend_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        fields.insert("n8n_endpoint".into(), json!(endpoint));
        Ok(fields)
    }
}

fn checked_display_name(name: Option<String>) -> ClientResult<Option<String>> {
    match name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        None => Ok(None),
        Some(name) => {
            DomainError::ensure(validate::display_name(name), "name may only contain letters, spaces and hyphens")?;
            Ok(Some(name.to_string()))
        }
    }
}

pub struct Administration {
    ctx: AppContext,
}

impl Administration {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    fn allowed(&self) -> bool {
        require_admin(self.ctx.role()).is_ok()
    }

    fn url(&self) -> String {
        self.ctx.endpoint(LogicalPath::UserManagement)
    }

    async fn mutate(&self, body: Value) -> ClientResult<Value> {
        expect_success(self.ctx.requester().post_unscoped(&self.url(), body).await).await
    }

    pub async fn list_users(&self) -> ClientResult<Fetched<Vec<ManagedUser>>> {
        if !self.allowed() {
            return Ok(Fetched::Failed(ACCESS_DENIED.to_string()));
        }
        let outcome = self.ctx.requester().post_unscoped(&self.url(), json!({ "action": "list_users" })).await;
        let fetched: Fetched<Value> = degrade(outcome).await?;
        Ok(fetched.map(parse_user_list).non_empty())
    }

    /// Load all companies and keep the session's tenant directory in sync.
    pub async fn list_companies(&self) -> ClientResult<Fetched<Vec<Tenant>>> {
        if !self.allowed() {
            return Ok(Fetched::Failed(ACCESS_DENIED.to_string()));
        }
        let outcome = self
            .ctx
            .requester()
            .post_unscoped(&self.url(), json!({ "action": "list_companies" }))
            .await;
        let fetched: Fetched<Value> = degrade(outcome).await?;
        let fetched = fetched.map(parse_tenant_list);
        if let Fetched::Data(companies) = &fetched {
            self.ctx.directory().replace(companies.clone());
        }
        Ok(fetched.non_empty())
    }

    pub async fn stats(&self) -> ClientResult<Fetched<AdminStats>> {
        let users = self.list_users().await?;
        if let Fetched::Failed(message) = users {
            return Ok(Fetched::Failed(message));
        }
        let companies = self.list_companies().await?.items();
        Ok(Fetched::Data(AdminStats::compute(&users.items(), &companies)))
    }

    pub async fn create_user(&self, user: NewUser) -> ClientResult<Mutation> {
        if !self.allowed() {
            return Ok(Mutation::Ignored);
        }
        self.mutate(user.into_body()?).await?;
        tracing::info!("user invited");
        Ok(Mutation::Applied)
    }

    pub async fn update_user(&self, update: UserUpdate) -> ClientResult<Mutation> {
        if !self.allowed() {
            return Ok(Mutation::Ignored);
        }
        let user_id = update.user_id.clone();
        self.mutate(update.into_body()?).await?;
        tracing::info!(user = %user_id, "user updated");
        Ok(Mutation::Applied)
    }

    pub async fn delete_user(&self, user_id: &UserId) -> ClientResult<Mutation> {
        if !self.allowed() {
            return Ok(Mutation::Ignored);
        }
        self.mutate(json!({ "action": "delete_user", "user_id": user_id })).await?;
        tracing::info!(user = %user_id, "user deleted");
        Ok(Mutation::Applied)
    }

    pub async fn create_company(&self, company: CompanyForm) -> ClientResult<Mutation> {
        if !self.allowed() {
            return Ok(Mutation::Ignored);
        }
        let mut body = action("create_company");
        for (key, value) in company.fields()? {
            if !value.is_null() {
                body.insert(key, value);
            }
        }
        self.mutate(Value::Object(body)).await?;
        self.list_companies().await?;
        Ok(Mutation::Applied)
    }

    pub async fn update_company(&self, company_id: &TenantId, company: CompanyForm) -> ClientResult<Mutation> {
        if !self.allowed() {
            return Ok(Mutation::Ignored);
        }
        let mut body = action("update_company");
        body.insert("company_id".into(), json!(company_id));
        body.extend(company.fields()?);
        self.mutate(Value::Object(body)).await?;
        self.list_companies().await?;
        Ok(Mutation::Applied)
    }

    pub async fn delete_company(&self, company_id: &TenantId) -> ClientResult<Mutation> {
        if !self.allowed() {
            return Ok(Mutation::Ignored);
        }
        self.mutate(json!({ "action": "delete_company", "company_id": company_id })).await?;
        tracing::info!(company = %company_id, "company deleted");
        self.list_companies().await?;
        Ok(Mutation::Applied)
    }
}
