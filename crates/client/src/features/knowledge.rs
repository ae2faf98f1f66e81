//! Knowledge-base documents indexed per agent.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use axentia_core::{DomainError, validate};

use crate::context::AppContext;
use crate::endpoint::LogicalPath;
use crate::error::ClientResult;
use crate::features::workflows::Agent;
use crate::lenient;
use crate::request::{RequestOptions, UploadFile, action};
use crate::response::{Fetched, Mutation, expect_success};

pub const UNKNOWN_AGENT: &str = "Sconosciuto";
pub const UNKNOWN_AREA: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeFile {
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub agent_id: String,
    #[serde(default, deserialize_with = "lenient::float")]
    pub size_kb: f64,
}

impl KnowledgeFile {
    /// `12.34 KB`, switching to MB above 1000 KB.
    pub fn size_display(&self) -> String {
        if self.size_kb > 1000.0 {
            format!("{:.2} MB", self.size_kb / 1024.0)
        } else {
            format!("{:.2} KB", self.size_kb)
        }
    }
}

/// Content type for an accepted document extension.
pub fn mime_for(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => return None,
    })
}

/// A document ready for [`KnowledgeBase::upload`], typed by its extension.
pub fn document(file_name: impl Into<String>, bytes: Vec<u8>) -> UploadFile {
    let file_name = file_name.into();
    let file = UploadFile::new("file", file_name.clone(), bytes);
    match mime_for(&file_name) {
        Some(mime) => file.with_mime(mime),
        None => file,
    }
}

/// A file joined with the agent that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeRow {
    pub file: KnowledgeFile,
    pub agent_name: String,
    pub area: String,
}

pub fn join_agents(files: &[KnowledgeFile], agents: &[Agent]) -> Vec<KnowledgeRow> {
    files
        .iter()
        .map(|file| {
            let agent = agents.iter().find(|a| a.id == file.agent_id);
            KnowledgeRow {
                file: file.clone(),
                agent_name: agent.map_or(UNKNOWN_AGENT, |a| a.display_name.as_str()).to_string(),
                area: agent.map_or(UNKNOWN_AREA, |a| a.area.as_str()).to_string(),
            }
        })
        .collect()
}

/// Search on file or agent name, exact area match.
pub fn filter_rows<'a>(rows: &'a [KnowledgeRow], search: &str, area: &str) -> Vec<&'a KnowledgeRow> {
    let search = search.to_lowercase();
    rows.iter()
        .filter(|row| {
            let matches_search =
                row.file.name.to_lowercase().contains(&search) || row.agent_name.to_lowercase().contains(&search);
            matches_search && (area.is_empty() || row.area == area)
        })
        .collect()
}

pub struct KnowledgeBase {
    ctx: AppContext,
    files: Mutex<Vec<KnowledgeFile>>,
}

impl KnowledgeBase {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            files: Mutex::new(Vec::new()),
        }
    }

    /// Files as last loaded, minus optimistic deletions.
    pub fn files(&self) -> Vec<KnowledgeFile> {
        self.files.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn load(&self) -> ClientResult<Fetched<Vec<KnowledgeFile>>> {
        let mut body = action("post_knowledge");
        body.insert("sub_action".into(), Value::String("list".into()));
        body.insert("workflow_id".into(), Value::String("all".into()));

        let url = self.ctx.endpoint(LogicalPath::DashboardApi);
        let fetched = self.ctx.requester().load::<Vec<KnowledgeFile>>(&url, body).await?.non_empty();
        // Empty and failed loads clear the list; nothing stale stays deletable.
        *self.files.lock().unwrap_or_else(|e| e.into_inner()) = fetched.data().cloned().unwrap_or_default();
        Ok(fetched)
    }

    /// Upload documents for an agent. File names are checked before anything
    /// is sent; on success the list is reloaded.
    pub async fn upload(&self, agent_id: &str, files: Vec<UploadFile>) -> ClientResult<Fetched<Vec<KnowledgeFile>>> {
        if agent_id.trim().is_empty() {
            return Err(DomainError::validation("no agent selected").into());
        }
        if files.is_empty() {
            return Err(DomainError::validation("no files selected").into());
        }
        if let Some(bad) = files.iter().find(|f| !validate::file_name(&f.file_name)) {
            return Err(DomainError::validation(format!("unsupported file '{}'", bad.file_name)).into());
        }

        let parts = files
            .into_iter()
            .enumerate()
            .map(|(i, mut file)| {
                file.field = format!("file_{i}");
                file
            })
            .collect();

        let requester = self.ctx.requester();
        let form = requester.scoped_form(
            &[
                ("action", "post_knowledge".to_string()),
                ("sub_action", "upload".to_string()),
                ("workflow_id", agent_id.to_string()),
            ],
            parts,
        )?;

        let url = self.ctx.endpoint(LogicalPath::DashboardApi);
        expect_success(requester.fetch_with_auth(&url, RequestOptions::post_multipart(form)).await).await?;
        tracing::info!(agent = agent_id, "knowledge files uploaded");
        self.load().await
    }

    /// Delete a loaded document. On success it is removed locally without a
    /// reload; unknown names are ignored.
    pub async fn delete(&self, file_name: &str) -> ClientResult<Mutation> {
        let agent_id = match self.files().into_iter().find(|f| f.name == file_name) {
            Some(file) => file.agent_id,
            None => {
                tracing::warn!(file = file_name, "delete requested for a file that is not loaded");
                return Ok(Mutation::Ignored);
            }
        };

        let mut body = action("post_knowledge");
        body.insert("sub_action".into(), Value::String("delete".into()));
        body.insert("workflow_id".into(), Value::String(agent_id));
        body.insert("file_name".into(), Value::String(file_name.to_string()));

        let url = self.ctx.endpoint(LogicalPath::DashboardApi);
        expect_success(self.ctx.requester().post_action(&url, body).await).await?;

        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|f| f.name != file_name);
        Ok(Mutation::Applied)
    }
}
