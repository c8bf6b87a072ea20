use crate::discord::{Message, Role, ServerInfo};
use crate::error::Result;
use crate::export::{ExportDocument, Exporter};
use serde::Serialize;

pub struct JsonExporter;

#[derive(Serialize)]
struct JsonExport<'a> {
    channel_name: &'a str,
    export_time: String,
    message_count: usize,
    messages: Vec<&'a Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guild_info: Option<&'a ServerInfo>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    guild_roles: &'a [Role],
}

impl Exporter for JsonExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, document: &ExportDocument<'_>) -> Result<String> {
        let export = JsonExport {
            channel_name: document.channel_name,
            export_time: document.exported_at.to_rfc3339(),
            message_count: document.messages.len(),
            messages: document.chronological(),
            guild_info: document.server,
            guild_roles: document.roles,
        };

        Ok(serde_json::to_string_pretty(&export)?)
    }
}
