use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};

use axentia_auth::InMemoryIdentityProvider;
use axentia_client::features::knowledge;
use axentia_client::features::reports::{KpiSummary, Period};
use axentia_client::features::support::TicketDetail;
use axentia_client::features::workflows::{RunOutcome, RunRequest};
use axentia_client::storage::{FileStore, KeyValueStore, MemoryStore};
use axentia_client::{AppContext, ClientConfig, Fetched, LogicalPath};
use axentia_core::{TenantId, TicketId};

const SESSION_STORE_FILE: &str = "session.json";

#[derive(Debug, Parser)]
#[command(name = "axentia", version, about = "Axentia automation dashboard client")]
struct Cli {
    /// ID token issued by the identity provider.
    #[arg(long, env = "AXENTIA_ID_TOKEN", hide_env_values = true)]
    token: String,

    /// Page URL the session starts on; may carry a cross-domain `token`.
    #[arg(long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the signed-in user, role, tenant and backend endpoint.
    Whoami,
    /// Savings report with KPIs.
    Report {
        #[arg(long, default_value = "30d")]
        period: String,
    },
    Workflows,
    Agents,
    /// Run a workflow manually; inputs as `name=value`.
    Run {
        workflow_id: String,
        #[arg(long = "input", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
    },
    Knowledge,
    /// Upload documents to an agent's knowledge base.
    Upload {
        agent_id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Tickets,
    Ticket {
        ticket_id: String,
    },
    Users,
    Companies,
    /// Switch the active tenant (admins only); `all` clears it.
    SelectTenant {
        tenant: String,
    },
    SignOut,
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_fetched<T: Serialize>(fetched: Fetched<T>) -> anyhow::Result<()> {
    match fetched {
        Fetched::Data(value) => print_json(&value),
        Fetched::Empty => {
            eprintln!("Nessun dato disponibile.");
            Ok(())
        }
        Fetched::Failed(message) => bail!(message),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    axentia_observability::init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.url {
        config = config.with_app_url(url);
    }

    let provider = InMemoryIdentityProvider::from_id_token(&cli.token).context("unusable ID token")?;
    let session_store: Arc<dyn KeyValueStore> = match &config.state_dir {
        Some(dir) => Arc::new(FileStore::open(dir.join(SESSION_STORE_FILE))),
        None => Arc::new(MemoryStore::new()),
    };

    let ctx = AppContext::builder(config, Arc::new(provider))
        .session_store(session_store)
        .build()?;

    if !ctx.wait_for_auth().await {
        bail!("not signed in");
    }

    run(&ctx, cli.command).await
}

async fn run(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Whoami => {
            let user = ctx.session().current_user();
            print_json(&json!({
                "user": user,
                "role": ctx.role().as_str(),
                "active_tenant": ctx.active_tenant(),
                "tenant_name": ctx.directory().name_of(ctx.active_tenant().as_ref()),
                "dashboard_api": ctx.endpoint(LogicalPath::DashboardApi),
            }))
        }
        Command::Report { period } => {
            let period: Period = period.parse()?;
            let rows = ctx.reports().load(period).await?;
            let kpi = KpiSummary::from_rows(rows.data().into_iter().flatten());
            print_fetched(rows.map(|rows| json!({ "kpi": kpi, "rows": rows })))
        }
        Command::Workflows => print_fetched(ctx.workflows().load().await?),
        Command::Agents => print_fetched(ctx.workflows().agents().await?),
        Command::Run { workflow_id, inputs } => {
            let request = inputs
                .into_iter()
                .fold(RunRequest::new(workflow_id), |req, (name, value)| req.input(name, Value::String(value)));
            match ctx.workflows().run(request).await? {
                RunOutcome::Output(output) => println!("{output}"),
                RunOutcome::Completed => eprintln!("Workflow completato."),
            }
            Ok(())
        }
        Command::Knowledge => print_fetched(ctx.knowledge_base().load().await?),
        Command::Upload { agent_id, files } => {
            let mut documents = Vec::with_capacity(files.len());
            for path in files {
                let name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .with_context(|| format!("no file name in {}", path.display()))?
                    .to_string();
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                documents.push(knowledge::document(name, bytes));
            }
            print_fetched(ctx.knowledge_base().upload(&agent_id, documents).await?)
        }
        Command::Tickets => {
            let support = ctx.support();
            let tickets = support.list().await?;
            if let Some(badge) = support.unread_badge(tickets.data().map_or(&[][..], Vec::as_slice))? {
                eprintln!("Ticket con nuovi messaggi: {badge}");
            }
            print_fetched(tickets)
        }
        Command::Ticket { ticket_id } => {
            let support = ctx.support();
            let detail: Fetched<TicketDetail> = support.get(&TicketId::new(ticket_id)?).await?;
            if let Some(detail) = detail.data() {
                support.mark_seen(detail)?;
            }
            print_fetched(detail)
        }
        Command::Users => print_fetched(ctx.administration().list_users().await?),
        Command::Companies => print_fetched(ctx.administration().list_companies().await?),
        Command::SelectTenant { tenant } => {
            let tenant = match tenant.as_str() {
                "all" => None,
                id => Some(TenantId::new(id)?),
            };
            if !ctx.set_active_tenant(tenant).is_applied() {
                bail!("only administrators can switch tenant");
            }
            eprintln!("Azienda attiva: {}", ctx.directory().name_of(ctx.active_tenant().as_ref()));
            Ok(())
        }
        Command::SignOut => {
            ctx.session().sign_out().await;
            Ok(())
        }
    }
}
