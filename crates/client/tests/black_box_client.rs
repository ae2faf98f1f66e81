use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::post;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Url;
use serde_json::{Value, json};

use axentia_auth::{ClaimsMap, InMemoryIdentityProvider, Role, UserIdentity};
use axentia_client::features::admin::{ACCESS_DENIED, CompanyForm, NewUser};
use axentia_client::features::reports::Period;
use axentia_client::features::support::{NewTicket, ReplyOptions};
use axentia_client::features::workflows::{RunOutcome, RunRequest};
use axentia_client::response::RETRY_MESSAGE;
use axentia_client::storage::keys;
use axentia_client::ui::tenant_options;
use axentia_client::{
    AppContext, ClientConfig, ClientError, Fetched, KeyValueStore, LogicalPath, MemoryNavigator, MemoryStore,
    Mutation,
};
use axentia_core::{TenantId, TicketId, UserId};
use axentia_events::SessionEvent;

const APP_URL: &str = "https://app.axentia.test/index.html";

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    bearer: Option<String>,
    body: Value,
    raw: String,
}

type Calls = Arc<Mutex<Vec<Recorded>>>;

struct TestServer {
    base_url: String,
    calls: Calls,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let calls: Calls = Arc::default();
        let app = Router::new()
            .route("/webhook/:path", post(webhook))
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, calls, handle }
    }

    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, action: &str) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|c| c.body["action"] == action || c.raw.contains(action))
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn webhook(
    State(calls): State<Calls>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let raw = String::from_utf8_lossy(&body).to_string();
    let body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    calls.lock().unwrap().push(Recorded {
        path: path.clone(),
        bearer,
        body: body.clone(),
        raw: raw.clone(),
    });

    respond(&path, &body, &raw)
}

fn ok(value: Value) -> (StatusCode, String) {
    (StatusCode::OK, value.to_string())
}

fn respond(path: &str, body: &Value, raw: &str) -> (StatusCode, String) {
    let action = body["action"].as_str().unwrap_or_default();
    match (path, action) {
        ("dashboard-api", "list_companies") => ok(json!([
            {"company_id": "C1", "name": "Acme <script>alert(1)</script>"},
            {"company_id": null, "name": "Orfana"},
            {"company_id": "C2", "name": "Beta"}
        ])),
        ("dashboard-api", "get_report") => ok(json!([
            {"display_name": "Fatture", "area": "Admin", "total_minutes": "120", "total_executions": 4}
        ])),
        ("dashboard-api", "get_workflows") => (StatusCode::OK, String::new()),
        ("dashboard-api", "get_agents") => (StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
        ("dashboard-api", "post_knowledge") => match body["sub_action"].as_str() {
            Some("list") if body["company_id"] == "C2" => (StatusCode::OK, String::new()),
            Some("list") if body["company_id"] == "C3" => (StatusCode::BAD_GATEWAY, String::new()),
            Some("list") => ok(json!([
                {"name": "listino.pdf", "agent_id": "ag1", "size_kb": "12.5"},
                {"name": "faq.txt", "agent_id": "ag1", "size_kb": 3}
            ])),
            _ => ok(json!({"success": true})),
        },
        ("dashboard-api", _) if raw.contains("run_manual_workflow") && raw.contains("wf_rotto") => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"error": "validation_failed", "message": "Campo cliente obbligatorio"}).to_string(),
        ),
        ("dashboard-api", _) if raw.contains("run_manual_workflow") => ok(json!({"output_display": "Fatto"})),
        ("support-api", "list_tickets") => ok(json!({
            "tickets": [
                {"ticket_id": "T-1", "subject": "Fattura", "status": "open", "priority": "high",
                 "message_count": 3, "visible_message_count": 2},
                {"subject": "senza id"}
            ]
        })),
        ("support-api", "get_ticket") => ok(json!({
            "ticket": {"ticket_id": "T-1", "subject": "Fattura", "message_count": 3, "visible_message_count": 2},
            "messages": [
                {"content": "Buongiorno", "is_admin": false},
                {"content": "Risposta", "is_admin": true},
                {"content": "Nota interna", "is_admin": true, "is_internal": true}
            ]
        })),
        ("support-api", "create_ticket") if body["subject"] == "duplicato" => (
            StatusCode::CONFLICT,
            json!({"error": "Ticket già aperto"}).to_string(),
        ),
        ("support-api", _) => ok(json!({"success": true, "ticket_id": "T-9"})),
        ("user-management", "list_users") => ok(json!({
            "users": [
                {"user_id": "u1", "email": "anna@acme.it", "company_id": "C1", "role": "admin"},
                {"user_id": "u2", "email": "bruno@beta.it", "company_id": "C2", "role": "user", "is_active": false},
                {"email": "fantasma@acme.it", "company_id": null}
            ]
        })),
        ("user-management", "list_companies") => ok(json!({
            "companies": [
                {"company_id": "C1", "name": "Acme"},
                {"company_id": "C2", "name": "Beta"},
                {"company_id": "C3", "name": "Gamma", "n8n_endpoint": "https://gamma.example"},
                {"company_id": "  ", "name": "Vuota"}
            ]
        })),
        ("user-management", "create_user") if body["email"] == "dup@acme.it" => (
            StatusCode::BAD_REQUEST,
            json!({"error": "Email già registrata"}).to_string(),
        ),
        ("user-management", _) => ok(json!({"success": true})),
        _ => (StatusCode::NOT_FOUND, String::new()),
    }
}

fn mint_jwt(uid: &str, role: &str, company: &str) -> String {
    let now = Utc::now();
    let claims = json!({
        "sub": uid,
        "user_id": uid,
        "email": format!("{uid}@example.it"),
        "name": "Carla Verdi",
        "role": role,
        "company_id": company,
        "exp": (now + ChronoDuration::minutes(10)).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("failed to encode jwt")
}

fn claims(role: Option<&str>, company: Option<&str>) -> ClaimsMap {
    let mut map = ClaimsMap::new();
    if let Some(role) = role {
        map.insert("role".into(), json!(role));
    }
    if let Some(company) = company {
        map.insert("company_id".into(), json!(company));
    }
    map
}

fn user(uid: &str) -> UserIdentity {
    UserIdentity::new(UserId::new(uid).unwrap())
        .with_email(format!("{uid}@example.it"))
        .with_display_name("Anna Bianchi")
}

struct Harness {
    ctx: AppContext,
    navigator: Arc<MemoryNavigator>,
    session_store: Arc<MemoryStore>,
}

fn harness(srv: &TestServer, provider: Arc<InMemoryIdentityProvider>, url: &str) -> Harness {
    harness_with_store(srv, provider, url, Arc::new(MemoryStore::new()))
}

fn harness_with_store(
    srv: &TestServer,
    provider: Arc<InMemoryIdentityProvider>,
    url: &str,
    session_store: Arc<MemoryStore>,
) -> Harness {
    let config = ClientConfig::default()
        .with_fallback_host(&srv.base_url)
        .with_central_host(&srv.base_url)
        .with_app_url(url)
        .in_memory();
    let navigator = Arc::new(MemoryNavigator::new(Url::parse(url).unwrap()));

    let ctx = AppContext::builder(config, provider)
        .navigator(navigator.clone())
        .session_store(session_store.clone())
        .build()
        .unwrap();

    Harness {
        ctx,
        navigator,
        session_store,
    }
}

async fn signed_in(srv: &TestServer, role: Option<&str>, company: Option<&str>) -> Harness {
    let provider = Arc::new(InMemoryIdentityProvider::signed_in(user("u1"), claims(role, company)));
    let h = harness(srv, provider, APP_URL);
    assert!(h.ctx.wait_for_auth().await);
    h
}

#[tokio::test]
async fn initialization_is_idempotent() {
    let srv = TestServer::spawn().await;
    let provider = Arc::new(InMemoryIdentityProvider::signed_in(user("u1"), claims(None, Some("C1"))));
    let h = harness(&srv, provider.clone(), APP_URL);

    let first = h.ctx.initialize();
    let second = h.ctx.initialize();
    assert!(first.same_as(&second));
    assert!(h.ctx.wait_for_auth().await);
    assert!(h.ctx.wait_for_auth().await);

    assert_eq!(provider.subscribe_calls(), 1);
    assert_eq!(first.peek(), Some(true));
    assert!(h.ctx.session().is_authenticated());
}

#[tokio::test]
async fn missing_role_claim_means_regular_user() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, None, Some("C1")).await;

    assert_eq!(h.ctx.role(), Role::User);
    assert!(!h.ctx.is_admin());
    // Regular users never load the tenant directory.
    assert!(srv.calls_for("list_companies").is_empty());
}

#[tokio::test]
async fn regular_users_are_pinned_to_their_own_tenant() {
    let srv = TestServer::spawn().await;
    let store = Arc::new(MemoryStore::new());
    store.set(keys::SELECTED_TENANT, "OTHER");

    let provider = Arc::new(InMemoryIdentityProvider::signed_in(user("u1"), claims(Some("user"), Some("C7"))));
    let h = harness_with_store(&srv, provider, APP_URL, store);
    assert!(h.ctx.wait_for_auth().await);

    assert_eq!(h.ctx.active_tenant(), Some(TenantId::new("C7").unwrap()));
    assert_eq!(h.session_store.get(keys::SELECTED_TENANT).as_deref(), Some("C7"));

    assert_eq!(h.ctx.set_active_tenant(Some(TenantId::new("C1").unwrap())), Mutation::Ignored);
    assert_eq!(h.ctx.active_tenant(), Some(TenantId::new("C7").unwrap()));

    h.ctx.reports().load(Period::Month).await.unwrap();
    let call = srv.calls_for("get_report").pop().unwrap();
    assert!(call.body.get("company_id").is_none());
}

#[tokio::test]
async fn admin_scoping_round_trip() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;

    assert!(h.ctx.is_admin());
    assert_eq!(h.ctx.active_tenant(), None);
    assert_eq!(h.ctx.directory().len(), 2);

    h.ctx.reports().load(Period::Week).await.unwrap();
    let unscoped = srv.calls_for("get_report").pop().unwrap();
    assert_eq!(unscoped.body, json!({"action": "get_report", "period": "7d"}));

    let mut events = h.ctx.subscribe();
    assert_eq!(h.ctx.set_active_tenant(Some(TenantId::new("C2").unwrap())), Mutation::Applied);
    assert_eq!(h.session_store.get(keys::SELECTED_TENANT).as_deref(), Some("C2"));
    assert_eq!(
        events.drain(),
        vec![SessionEvent::TenantFilterChanged {
            tenant_id: Some(TenantId::new("C2").unwrap())
        }]
    );

    h.ctx.reports().load(Period::Week).await.unwrap();
    let scoped = srv.calls_for("get_report").pop().unwrap();
    assert_eq!(scoped.body["company_id"], "C2");

    h.ctx.set_active_tenant(None);
    h.ctx.reports().load(Period::Week).await.unwrap();
    let cleared = srv.calls_for("get_report").pop().unwrap();
    assert!(cleared.body.get("company_id").is_none());
    assert!(h.session_store.get(keys::SELECTED_TENANT).is_none());
}

#[tokio::test]
async fn admin_selection_survives_a_token_refresh() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;

    h.ctx.set_active_tenant(Some(TenantId::new("C1").unwrap()));
    h.ctx.session().refresh_token().await.unwrap();
    assert_eq!(h.ctx.active_tenant(), Some(TenantId::new("C1").unwrap()));
}

#[tokio::test]
async fn endpoints_fall_back_and_centralize() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, None, Some("C1")).await;

    assert_eq!(
        h.ctx.endpoint(LogicalPath::DashboardApi),
        format!("{}/webhook/dashboard-api", srv.base_url)
    );
    assert_eq!(
        h.ctx.endpoint(LogicalPath::SupportApi),
        format!("{}/webhook/support-api", srv.base_url)
    );
}

#[tokio::test]
async fn empty_and_failed_responses_degrade() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, None, Some("C1")).await;

    assert!(h.ctx.workflows().load().await.unwrap().is_empty());
    assert_eq!(
        h.ctx.workflows().agents().await.unwrap(),
        Fetched::Failed(RETRY_MESSAGE.to_string())
    );

    let report = h.ctx.reports().load(Period::Month).await.unwrap();
    assert_eq!(report.items()[0].hours(), 2.0);
}

#[tokio::test]
async fn every_request_carries_a_fresh_bearer_token() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;

    h.ctx.reports().load(Period::Month).await.unwrap();
    h.ctx.reports().load(Period::Month).await.unwrap();

    let bearers: Vec<String> = srv.calls().into_iter().map(|c| c.bearer.unwrap()).collect();
    assert!(bearers.len() >= 3);
    assert!(bearers.iter().all(|b| b.starts_with("id-token-u1-")));
    let last = &bearers[bearers.len() - 1];
    let before = &bearers[bearers.len() - 2];
    assert_ne!(last, before);
}

#[tokio::test]
async fn issued_id_token_is_forwarded_verbatim() {
    let srv = TestServer::spawn().await;
    let jwt = mint_jwt("u9", "user", "C5");
    let provider = Arc::new(InMemoryIdentityProvider::from_id_token(&jwt).unwrap());
    let h = harness(&srv, provider, APP_URL);
    assert!(h.ctx.wait_for_auth().await);

    assert_eq!(h.ctx.active_tenant(), Some(TenantId::new("C5").unwrap()));
    assert_eq!(h.ctx.session().user_display_name().as_deref(), Some("Carla Verdi"));

    h.ctx.reports().load(Period::Day).await.unwrap();
    let call = srv.calls_for("get_report").pop().unwrap();
    assert_eq!(call.bearer.as_deref(), Some(jwt.as_str()));
    assert_eq!(call.body["period"], "24h");
}

#[tokio::test]
async fn bootstrap_token_is_exchanged_and_stripped() {
    let srv = TestServer::spawn().await;
    let provider = Arc::new(InMemoryIdentityProvider::new());
    provider.register_custom_token("abc", user("u3"), claims(Some("user"), Some("C1")));

    let url = "https://app.axentia.test/index.html?token=abc&tab=report&token=again#kpi";
    let h = harness(&srv, provider, url);
    assert!(h.ctx.wait_for_auth().await);

    let current = h.navigator.replacements().pop().unwrap();
    assert!(!current.query_pairs().any(|(k, _)| k == "token"));
    assert!(current.query_pairs().any(|(k, v)| k == "tab" && v == "report"));
    assert_eq!(current.fragment(), Some("kpi"));
    assert!(h.navigator.navigations().is_empty());
}

#[tokio::test]
async fn bad_bootstrap_token_is_stripped_anyway() {
    let srv = TestServer::spawn().await;
    let h = harness(&srv, Arc::new(InMemoryIdentityProvider::new()), "https://app.axentia.test/index.html?token=nope");

    assert!(!h.ctx.wait_for_auth().await);
    assert!(h.navigator.replacements()[0].query().is_none());
    assert!(h.navigator.navigations().last().unwrap().path().ends_with("/login.html"));
}

#[tokio::test]
async fn refresh_failure_during_sign_in_resolves_not_ready() {
    let srv = TestServer::spawn().await;
    let provider = Arc::new(InMemoryIdentityProvider::signed_in(user("u1"), claims(Some("admin"), None)));
    provider.set_refresh_failure(true);
    let h = harness(&srv, provider, APP_URL);

    assert!(!h.ctx.wait_for_auth().await);
    assert!(!h.ctx.session().is_authenticated());
    assert!(srv.calls().is_empty());
}

#[tokio::test]
async fn sign_out_clears_session_and_redirects() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;
    h.ctx.set_active_tenant(Some(TenantId::new("C1").unwrap()));

    h.ctx.session().sign_out().await;

    assert!(!h.ctx.session().is_authenticated());
    assert!(h.session_store.is_empty());
    assert!(h.ctx.directory().is_empty());
    assert_eq!(h.ctx.active_tenant(), None);
    assert!(h.navigator.navigations().last().unwrap().path().ends_with("/login.html"));

    let err = h.ctx.reports().load(Period::Month).await.unwrap_err();
    assert!(matches!(err, ClientError::Authentication(_)));
}

#[tokio::test]
async fn tenant_switcher_escapes_backend_names() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;

    let markup = tenant_options(&h.ctx.directory().all(), None);
    assert!(markup.contains("Acme &lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!markup.contains("<script>"));
}

#[tokio::test]
async fn knowledge_delete_removes_locally() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, None, Some("C1")).await;

    let kb = h.ctx.knowledge_base();
    assert_eq!(kb.load().await.unwrap().items().len(), 2);
    assert_eq!(kb.delete("faq.txt").await.unwrap(), Mutation::Applied);
    assert_eq!(kb.files().len(), 1);
    assert_eq!(kb.delete("ghost.pdf").await.unwrap(), Mutation::Ignored);

    let deletes = srv.calls_for("post_knowledge");
    let delete = deletes.iter().find(|c| c.body["sub_action"] == "delete").unwrap();
    assert_eq!(delete.body["workflow_id"], "ag1");
    assert_eq!(delete.body["file_name"], "faq.txt");
}

#[tokio::test]
async fn knowledge_reload_never_keeps_stale_files() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;
    let kb = h.ctx.knowledge_base();

    h.ctx.set_active_tenant(Some(TenantId::new("C1").unwrap()));
    assert_eq!(kb.load().await.unwrap().items().len(), 2);

    h.ctx.set_active_tenant(Some(TenantId::new("C2").unwrap()));
    assert!(kb.load().await.unwrap().is_empty());
    assert!(kb.files().is_empty());
    assert_eq!(kb.delete("listino.pdf").await.unwrap(), Mutation::Ignored);

    h.ctx.set_active_tenant(Some(TenantId::new("C1").unwrap()));
    assert_eq!(kb.load().await.unwrap().items().len(), 2);

    h.ctx.set_active_tenant(Some(TenantId::new("C3").unwrap()));
    assert!(kb.load().await.unwrap().is_failed());
    assert!(kb.files().is_empty());

    let deletes: Vec<_> = srv
        .calls_for("post_knowledge")
        .into_iter()
        .filter(|c| c.body["sub_action"] == "delete")
        .collect();
    assert!(deletes.is_empty());
}

#[tokio::test]
async fn failed_manual_run_reports_the_backend_message() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, None, Some("C1")).await;

    let err = h.ctx.workflows().run(RunRequest::new("wf_rotto")).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 422, .. }));
    assert_eq!(err.user_message(), "Campo cliente obbligatorio");
}

#[tokio::test]
async fn manual_run_is_multipart_and_scoped() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;
    h.ctx.set_active_tenant(Some(TenantId::new("C2").unwrap()));

    let outcome = h
        .ctx
        .workflows()
        .run(RunRequest::new("wf1").input("cliente", json!("Acme")))
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Output("Fatto".into()));

    let call = srv.calls_for("run_manual_workflow").pop().unwrap();
    assert_eq!(call.path, "dashboard-api");
    assert!(call.raw.contains("name=\"company_id\""));
    assert!(call.raw.contains("C2"));
    assert!(call.raw.contains("cliente"));
}

#[tokio::test]
async fn user_tickets_are_filtered_by_uid() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("user"), Some("C1")).await;
    let support = h.ctx.support();

    let tickets = support.list().await.unwrap().items();
    assert_eq!(tickets.len(), 1);
    assert_eq!(support.unread_count(&tickets).unwrap(), 1);

    let call = srv.calls_for("list_tickets").pop().unwrap();
    assert_eq!(call.path, "support-api");
    assert_eq!(call.body["firebase_uid"], "u1");
    assert!(call.body.get("company_id").is_none());

    let detail = support.get(&TicketId::new("T-1").unwrap()).await.unwrap().into_data().unwrap();
    assert_eq!(detail.visible_messages(false).len(), 2);
    support.mark_seen(&detail).unwrap();
    assert_eq!(support.unread_count(&tickets).unwrap(), 0);
}

#[tokio::test]
async fn ticket_mutations_follow_role_rules() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("user"), Some("C1")).await;
    let support = h.ctx.support();
    let id = TicketId::new("T-1").unwrap();

    support
        .create(NewTicket {
            subject: " Fattura errata ".into(),
            description: "Importo sbagliato".into(),
            category: "billing".into(),
            priority: "high".into(),
        })
        .await
        .unwrap();
    let created = srv.calls_for("create_ticket").pop().unwrap();
    assert_eq!(created.body["subject"], "Fattura errata");
    assert_eq!(created.body["company_id"], "C1");
    assert_eq!(created.body["user_id"], "u1");

    let err = support
        .create(NewTicket {
            subject: "duplicato".into(),
            description: "x".into(),
            priority: "low".into(),
            ..NewTicket::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Ticket già aperto");

    support
        .add_message(
            &id,
            "Grazie",
            ReplyOptions {
                internal: true,
                new_status: Some("closed".into()),
            },
        )
        .await
        .unwrap();
    let reply = srv.calls_for("add_message").pop().unwrap();
    assert_eq!(reply.body["author_name"], "Anna Bianchi");
    assert!(reply.body.get("is_internal").is_none());
    assert!(reply.body.get("new_status").is_none());

    assert!(support.add_message(&id, "   ", ReplyOptions::default()).await.is_err());

    let before = srv.calls().len();
    assert_eq!(support.delete(&id).await.unwrap(), Mutation::Ignored);
    assert_eq!(srv.calls().len(), before);
}

#[tokio::test]
async fn admin_replies_can_be_internal() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;
    let support = h.ctx.support();
    let id = TicketId::new("T-1").unwrap();

    support
        .add_message(
            &id,
            "Verifico",
            ReplyOptions {
                internal: true,
                new_status: Some("in_progress".into()),
            },
        )
        .await
        .unwrap();
    let reply = srv.calls_for("add_message").pop().unwrap();
    assert_eq!(reply.body["is_internal"], true);
    assert_eq!(reply.body["new_status"], "in_progress");

    assert_eq!(support.delete(&id).await.unwrap(), Mutation::Applied);
    assert_eq!(srv.calls_for("delete_ticket").len(), 1);
}

#[tokio::test]
async fn administration_is_admin_only() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("user"), Some("C1")).await;
    let admin = h.ctx.administration();

    assert_eq!(admin.list_users().await.unwrap(), Fetched::Failed(ACCESS_DENIED.to_string()));
    assert_eq!(
        admin.delete_user(&UserId::new("u2").unwrap()).await.unwrap(),
        Mutation::Ignored
    );
    assert!(srv.calls_for("list_users").is_empty());
    assert!(srv.calls_for("delete_user").is_empty());
}

#[tokio::test]
async fn administration_manages_users_and_companies() {
    let srv = TestServer::spawn().await;
    let h = signed_in(&srv, Some("admin"), None).await;
    h.ctx.set_active_tenant(Some(TenantId::new("C2").unwrap()));
    let admin = h.ctx.administration();

    let users = admin.list_users().await.unwrap().items();
    assert_eq!(users.len(), 2);
    let call = srv.calls_for("list_users").pop().unwrap();
    assert_eq!(call.path, "user-management");
    assert!(call.body.get("company_id").is_none());

    let err = admin
        .create_user(NewUser {
            email: "dup@acme.it".into(),
            company_id: "C1".into(),
            role: "user".into(),
            display_name: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Email già registrata");

    let invalid = admin
        .create_user(NewUser {
            email: "not-an-email".into(),
            company_id: "C1".into(),
            role: "user".into(),
            display_name: None,
        })
        .await;
    assert!(matches!(invalid, Err(ClientError::Validation(_))));

    let created = admin
        .create_company(CompanyForm {
            name: "Gamma".into(),
            backend_endpoint: Some("https://gamma.example/".into()),
        })
        .await
        .unwrap();
    assert!(created.is_applied());
    assert_eq!(h.ctx.directory().len(), 3);
    assert_eq!(
        h.ctx.directory().endpoint_of(&TenantId::new("C3").unwrap()).as_deref(),
        Some("https://gamma.example")
    );

    let create = srv.calls_for("create_company").pop().unwrap();
    assert_eq!(create.body["name"], "Gamma");
    assert_eq!(create.body["n8n_endpoint"], "https://gamma.example/");
}
