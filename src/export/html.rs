use crate::discord::{Message, Role};
use crate::error::Result;
use crate::export::{ExportDocument, Exporter};
use std::fmt::{self, Write};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const UNCOLORED_ROLE: &str = "#333333";

const STYLE: &str = r#"        body { font-family: Arial, sans-serif; line-height: 1.6; max-width: 900px; margin: 0 auto; padding: 20px; color: #333; }
        h1, h2, h3 { color: #5865F2; }
        .message { margin-bottom: 20px; border-bottom: 1px solid #eee; padding-bottom: 15px; }
        .message-header { display: flex; align-items: baseline; }
        .author { font-weight: bold; margin-right: 10px; }
        .role { margin-right: 10px; padding: 2px 6px; border-radius: 3px; font-size: 0.8em; color: white; }
        .timestamp { color: #888; font-size: 0.9em; }
        .content { margin-top: 5px; white-space: pre-wrap; }
        .attachments, .embeds, .reactions { margin-top: 10px; font-size: 0.9em; }
        .attachments h4, .embeds h4, .reactions h4 { margin-bottom: 5px; color: #555; }
        .roles-list { display: flex; flex-wrap: wrap; gap: 10px; margin-bottom: 20px; }
        .role-item { padding: 3px 8px; border-radius: 3px; font-size: 0.9em; font-weight: bold; color: white; }
"#;

/// Standalone HTML page with role chips
pub struct HtmlExporter;

impl Exporter for HtmlExporter {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, document: &ExportDocument<'_>) -> Result<String> {
        let mut out = String::new();
        write_head(&mut out, document)?;
        for message in document.chronological() {
            write_message(&mut out, document, message)?;
        }
        out.push_str("</body>\n</html>\n");
        Ok(out)
    }
}

/// Escape text for element content and quoted attribute values
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn role_color(role: &Role) -> String {
    role.hex_color()
        .unwrap_or_else(|| UNCOLORED_ROLE.to_string())
}

fn write_head(out: &mut String, document: &ExportDocument<'_>) -> fmt::Result {
    let channel = escape(document.channel_name);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("    <meta charset=\"UTF-8\">\n");
    out.push_str("    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    writeln!(out, "    <title>Discord Messages - #{}</title>", channel)?;
    writeln!(out, "    <style>\n{}    </style>\n</head>\n<body>", STYLE)?;
    writeln!(out, "    <h1>Discord Messages - #{}</h1>", channel)?;
    writeln!(
        out,
        "    <p>Exported: {}</p>",
        document.exported_at.format(TIME_FORMAT)
    )?;
    writeln!(out, "    <p>Total messages: {}</p>", document.messages.len())?;

    if !document.roles.is_empty() {
        out.push_str("    <h2>Server Roles</h2>\n    <div class=\"roles-list\">\n");
        for role in document.ranked_roles() {
            writeln!(
                out,
                "        <div class=\"role-item\" style=\"background-color: {};\">{}</div>",
                role_color(role),
                escape(&role.name)
            )?;
        }
        out.push_str("    </div>\n");
    }
    out.push_str("    <hr>\n\n");
    Ok(())
}

fn write_message(out: &mut String, document: &ExportDocument<'_>, message: &Message) -> fmt::Result {
    out.push_str("    <div class=\"message\">\n        <div class=\"message-header\">\n");
    writeln!(
        out,
        "            <span class=\"author\">{}</span>",
        escape(&message.author.username)
    )?;
    if let Some(role) = document.top_role(&message.author.roles) {
        writeln!(
            out,
            "            <span class=\"role\" style=\"background-color: {};\">{}</span>",
            role_color(role),
            escape(&role.name)
        )?;
    }
    writeln!(
        out,
        "            <span class=\"timestamp\">{}</span>\n        </div>",
        message.timestamp.format(TIME_FORMAT)
    )?;

    if message.content.is_empty() {
        out.push_str("        <div class=\"content\"><em>[no text content]</em></div>\n");
    } else {
        writeln!(
            out,
            "        <div class=\"content\">{}</div>",
            escape(&message.content).replace('\n', "<br>")
        )?;
    }

    if !message.attachments.is_empty() {
        out.push_str("        <div class=\"attachments\">\n            <h4>Attachments:</h4>\n            <ul>\n");
        for attachment in &message.attachments {
            writeln!(
                out,
                "                <li><a href=\"{}\" target=\"_blank\">{}</a></li>",
                escape(&attachment.url),
                escape(&attachment.filename)
            )?;
        }
        out.push_str("            </ul>\n        </div>\n");
    }

    if !message.embeds.is_empty() {
        out.push_str("        <div class=\"embeds\">\n            <h4>Embeds:</h4>\n            <ul>\n");
        for embed in &message.embeds {
            let title = embed.title.as_deref().map(|t| format!("<strong>{}</strong>", escape(t)));
            let description = embed.description.as_deref().map(escape);
            let item = match (title, description) {
                (Some(title), Some(description)) => format!("{}<br>{}", title, description),
                (Some(title), None) => title,
                (None, Some(description)) => description,
                (None, None) => continue,
            };
            writeln!(out, "                <li>{}</li>", item)?;
        }
        out.push_str("            </ul>\n        </div>\n");
    }

    if !message.reactions.is_empty() {
        out.push_str("        <div class=\"reactions\">\n            <h4>Reactions:</h4>\n            <ul>\n");
        for reaction in &message.reactions {
            writeln!(
                out,
                "                <li>{}: {}</li>",
                escape(reaction.emoji.name.as_deref().unwrap_or_default()),
                reaction.count
            )?;
        }
        out.push_str("            </ul>\n        </div>\n");
    }

    out.push_str("    </div>\n");
    Ok(())
}
