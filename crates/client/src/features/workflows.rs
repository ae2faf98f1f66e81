//! Workflow catalog, agents and manual execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use axentia_core::{DomainError, validate};

use crate::context::AppContext;
use crate::endpoint::LogicalPath;
use crate::error::ClientResult;
use crate::lenient;
use crate::request::{RequestOptions, UploadFile, action};
use crate::response::{Fetched, RUN_ERROR_FIELDS, expect_success_reporting};

/// Placeholder field the backend uses to keep empty schemas non-null.
pub const DUMMY_FIELD: &str = "dummy";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Boolean,
    File,
    Object,
}

impl FieldKind {
    /// Unknown types render as plain text inputs.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "number" => FieldKind::Number,
            "boolean" => FieldKind::Boolean,
            "file" => FieldKind::File,
            "object" => FieldKind::Object,
            _ => FieldKind::Text,
        }
    }

    /// Fields sent as a file part rather than inside `inputs`.
    pub fn is_upload(&self) -> bool {
        matches!(self, FieldKind::File | FieldKind::Object)
    }
}

/// Raw schema entry; `id` is `tech_id` or `tech_id:description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub id: String,
    #[serde(default, rename = "type", deserialize_with = "field_kind")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

fn field_kind<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<FieldKind, D::Error> {
    Ok(FieldKind::parse(&lenient::string(deserializer)?))
}

/// Schema entry split into its technical id and optional description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowField {
    pub tech_id: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub required: bool,
}

impl From<&SchemaField> for WorkflowField {
    fn from(field: &SchemaField) -> Self {
        let mut parts = field.id.splitn(2, ':');
        let tech_id = parts.next().unwrap_or_default().trim().to_string();
        let description = parts.next().map(str::trim).filter(|d| !d.is_empty()).map(str::to_string);
        Self {
            tech_id,
            description,
            kind: field.kind,
            required: field.required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub area: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub active: bool,
    /// `None` (JSON null or missing) means the flow cannot be run manually.
    #[serde(default)]
    pub full_schema: Option<Vec<SchemaField>>,
}

impl Workflow {
    pub fn is_executable(&self) -> bool {
        self.full_schema.is_some()
    }

    /// Visible input fields, without the placeholder entry.
    pub fn fields(&self) -> Vec<WorkflowField> {
        self.full_schema
            .iter()
            .flatten()
            .filter(|f| f.id != DUMMY_FIELD)
            .map(WorkflowField::from)
            .collect()
    }

    pub fn status_label(&self) -> &'static str {
        if self.active { "Attivo" } else { "Pausa" }
    }
}

pub fn executable(workflows: &[Workflow]) -> Vec<&Workflow> {
    workflows.iter().filter(|w| w.is_executable()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub area: String,
    #[serde(default)]
    pub webhook_path: Option<String>,
}

/// Outcome of a manual run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The flow returned something to show.
    Output(String),
    Completed,
}

/// One manual run: scalar inputs go into the `inputs` JSON, files as parts.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub workflow_id: String,
    pub inputs: Map<String, Value>,
    pub files: Vec<UploadFile>,
}

impl RunRequest {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            ..Self::default()
        }
    }

    pub fn input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    pub fn file(mut self, file: UploadFile) -> Self {
        self.files.push(file);
        self
    }
}

pub struct Workflows {
    ctx: AppContext,
}

impl Workflows {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn load(&self) -> ClientResult<Fetched<Vec<Workflow>>> {
        let url = self.ctx.endpoint(LogicalPath::DashboardApi);
        Ok(self.ctx.requester().load::<Vec<Workflow>>(&url, action("get_workflows")).await?.non_empty())
    }

    pub async fn agents(&self) -> ClientResult<Fetched<Vec<Agent>>> {
        let url = self.ctx.endpoint(LogicalPath::DashboardApi);
        Ok(self.ctx.requester().load::<Vec<Agent>>(&url, action("get_agents")).await?.non_empty())
    }

    /// Run a workflow manually. A non-OK response surfaces the backend's
    /// `message` (or `error`) as [`crate::ClientError::Status`].
    pub async fn run(&self, request: RunRequest) -> ClientResult<RunOutcome> {
        if !validate::workflow_id(&request.workflow_id) {
            return Err(DomainError::validation("invalid workflow id").into());
        }

        let requester = self.ctx.requester();
        let inputs = serde_json::to_string(&Value::Object(request.inputs))
            .map_err(|err| DomainError::validation(format!("inputs not serializable: {err}")))?;
        let form = requester.scoped_form(
            &[
                ("action", "run_manual_workflow".to_string()),
                ("workflow_id", request.workflow_id.clone()),
                ("inputs", inputs),
            ],
            request.files,
        )?;

        let url = self.ctx.endpoint(LogicalPath::DashboardApi);
        let outcome = requester.fetch_with_auth(&url, RequestOptions::post_multipart(form)).await;
        let body = expect_success_reporting(outcome, &RUN_ERROR_FIELDS).await?;

        tracing::info!(workflow = %request.workflow_id, "manual workflow run completed");
        Ok(match body.get("output_display").and_then(Value::as_str) {
            Some(output) if !output.is_empty() => RunOutcome::Output(output.to_string()),
            _ => RunOutcome::Completed,
        })
    }
}
