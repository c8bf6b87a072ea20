//! Pluggable exporters for retrieved channel history

mod html;
mod json;
mod markdown;

pub use html::HtmlExporter;
pub use json::JsonExporter;
pub use markdown::MarkdownExporter;

use crate::discord::{Message, Role, RoleId, ServerInfo};
use crate::error::Result;
use crate::retrieval::Retrieval;
use chrono::{DateTime, Local};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-]").expect("file name pattern is valid"));

/// What an exporter renders
#[derive(Debug, Clone)]
pub struct ExportDocument<'a> {
    pub channel_name: &'a str,
    pub server: Option<&'a ServerInfo>,
    pub roles: &'a [Role],
    pub messages: &'a [Message],
    pub exported_at: DateTime<Local>,
}

impl<'a> ExportDocument<'a> {
    pub fn from_retrieval(retrieval: &'a Retrieval) -> Self {
        Self {
            channel_name: &retrieval.channel_name,
            server: retrieval.server.as_ref(),
            roles: &retrieval.roles,
            messages: &retrieval.messages,
            exported_at: Local::now(),
        }
    }

    /// Messages oldest first
    pub fn chronological(&self) -> Vec<&'a Message> {
        let mut messages: Vec<&Message> = self.messages.iter().collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        messages
    }

    /// Server roles, most significant first
    pub fn ranked_roles(&self) -> Vec<&'a Role> {
        let mut roles: Vec<&Role> = self.roles.iter().collect();
        roles.sort_by(|a, b| b.position.cmp(&a.position));
        roles
    }

    /// Highest-positioned server role among `role_ids`
    pub fn top_role(&self, role_ids: &[RoleId]) -> Option<&'a Role> {
        self.roles
            .iter()
            .filter(|role| role_ids.contains(&role.id))
            .max_by_key(|role| role.position)
    }
}

pub trait Exporter {
    fn extension(&self) -> &'static str;

    fn render(&self, document: &ExportDocument<'_>) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Markdown,
    Json,
    Html,
}

impl ExportFormat {
    pub fn exporter(&self) -> Box<dyn Exporter> {
        match self {
            Self::Markdown => Box::new(MarkdownExporter),
            Self::Json => Box::new(JsonExporter),
            Self::Html => Box::new(HtmlExporter),
        }
    }
}

/// `discord_messages_{channel}_{YYYYmmdd_HHMMSS}.{ext}` with unsafe characters replaced
pub fn default_file_name(channel_name: &str, exported_at: &DateTime<Local>, extension: &str) -> String {
    let safe_name = UNSAFE_FILE_CHARS.replace_all(channel_name, "_");
    format!(
        "discord_messages_{}_{}.{}",
        safe_name,
        exported_at.format("%Y%m%d_%H%M%S"),
        extension
    )
}

/// Render `document` and write it to `output`, or a default file name in the
/// working directory
pub async fn save(
    document: &ExportDocument<'_>,
    exporter: &dyn Exporter,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(default_file_name(
            document.channel_name,
            &document.exported_at,
            exporter.extension(),
        )),
    };

    let rendered = exporter.render(document)?;
    tokio::fs::write(&path, rendered).await?;

    tracing::info!(
        path = %path.display(),
        messages = document.messages.len(),
        format = exporter.extension(),
        "Export written"
    );
    Ok(path)
}

/// Export a finished retrieval; nothing is written when it holds no messages
pub async fn export_retrieval(
    retrieval: &Retrieval,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<Option<PathBuf>> {
    if retrieval.messages.is_empty() {
        tracing::warn!(channel = %retrieval.channel_name, "No messages retrieved, skipping export");
        return Ok(None);
    }

    let document = ExportDocument::from_retrieval(retrieval);
    let path = save(&document, format.exporter().as_ref(), output).await?;
    Ok(Some(path))
}
