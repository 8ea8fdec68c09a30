//! Markup fragments for the conversation view and their Discord rendition.

/// Whether backend-provided text may be inserted as live markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trust {
    /// Backend output is inserted as-is.
    Markup,
    /// Backend output is escaped before insertion.
    Escape,
}

impl Trust {
    pub fn from_flag(trusted: bool) -> Self {
        if trusted {
            Trust::Markup
        } else {
            Trust::Escape
        }
    }

    /// Apply this policy to backend-provided text.
    pub fn apply(self, text: &str) -> String {
        match self {
            Trust::Markup => text.to_string(),
            Trust::Escape => escape_html(text),
        }
    }
}

pub const LOADING_TEXT: &str = "Retrieving information...";
pub const ONLINE_STATUS: &str = "ONLINE MODE - Connected to Technical Order database";
pub const OFFLINE_STATUS: &str = "OFFLINE MODE - Using cached Technical Order information";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// User input is always plain text.
pub fn user_message(text: &str) -> String {
    format!(
        r#"<div class="message user"><div class="message-content"><p>{}</p></div></div>"#,
        escape_html(text)
    )
}

/// `content` must already have the trust policy applied.
pub fn assistant_message(content: &str) -> String {
    format!(
        r#"<div class="message assistant"><div class="message-content"><div class="message-text">{}</div></div></div>"#,
        content
    )
}

pub fn system_message(text: &str) -> String {
    format!(
        r#"<div class="message system"><div class="message-content"><p>{}</p></div></div>"#,
        text
    )
}

pub fn loading_indicator() -> String {
    format!(
        r#"<div id="loading-indicator" class="message system"><div class="message-content"><p>{}</p></div></div>"#,
        LOADING_TEXT
    )
}

pub fn connection_status(online: bool) -> String {
    let (class, text) = if online {
        ("online", ONLINE_STATUS)
    } else {
        ("offline", OFFLINE_STATUS)
    };
    format!(r#"<span class="status-indicator {}">{}</span>"#, class, text)
}

/// Render markup as plain text wrapped at `width` columns.
/// Falls back to the raw markup when the renderer rejects it.
pub fn to_text(markup: &str, width: usize) -> String {
    html2text::from_read(markup.as_bytes(), width.max(20))
        .map(|text| text.trim_end().to_string())
        .unwrap_or_else(|_| markup.to_string())
}
