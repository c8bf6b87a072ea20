use crate::discord::Message;
use crate::error::Result;
use crate::export::{ExportDocument, Exporter};
use std::fmt::{self, Write};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, document: &ExportDocument<'_>) -> Result<String> {
        let mut out = String::new();
        write_header(&mut out, document)?;
        for message in document.chronological() {
            write_message(&mut out, document, message)?;
        }
        Ok(out)
    }
}

fn write_header(out: &mut String, document: &ExportDocument<'_>) -> fmt::Result {
    writeln!(out, "# Discord Messages - #{}\n", document.channel_name)?;
    writeln!(out, "Exported: {}", document.exported_at.format(TIME_FORMAT))?;
    writeln!(out, "Total messages: {}\n", document.messages.len())?;

    if !document.roles.is_empty() {
        out.push_str("## Server Roles\n\n");
        for role in document.ranked_roles() {
            match role.hex_color() {
                Some(color) => writeln!(out, "- <span style='color:{}'>**{}**</span>", color, role.name)?,
                None => writeln!(out, "- **{}**", role.name)?,
            }
        }
    }
    out.push_str("\n---\n\n");
    Ok(())
}

fn write_message(out: &mut String, document: &ExportDocument<'_>, message: &Message) -> fmt::Result {
    let role_label = match document.top_role(&message.author.roles) {
        Some(role) => match role.hex_color() {
            Some(color) => format!(" <span style='color:{}'>**[{}]**</span>", color, role.name),
            None => format!(" **[{}]**", role.name),
        },
        None => String::new(),
    };

    write!(
        out,
        "### {}{} - {}\n\n",
        message.author.username,
        role_label,
        message.timestamp.format(TIME_FORMAT)
    )?;

    if message.content.is_empty() {
        out.push_str("*[no text content]*");
    } else {
        out.push_str(&message.content);
    }

    if !message.attachments.is_empty() {
        out.push_str("\n\n**Attachments:**\n");
        for attachment in &message.attachments {
            writeln!(out, "- [{}]({})", attachment.filename, attachment.url)?;
        }
    }

    if !message.embeds.is_empty() {
        out.push_str("\n\n**Embeds:**\n");
        for embed in &message.embeds {
            if let Some(title) = &embed.title {
                writeln!(out, "- **{}**", title)?;
            }
            if let Some(description) = &embed.description {
                writeln!(out, "  {}", description)?;
            }
        }
    }

    if !message.reactions.is_empty() {
        out.push_str("\n\n**Reactions:**\n");
        for reaction in &message.reactions {
            writeln!(out, "- {}: {}", reaction.emoji.markup(), reaction.count)?;
        }
    }

    out.push_str("\n\n---\n\n");
    Ok(())
}
