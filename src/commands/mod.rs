mod ask;
mod config;
mod document;
mod manage;
mod sources;

use crate::state::Context;

/// Discord messages are capped at 2000 chars; leave headroom.
const CHUNK_LIMIT: usize = 1990;

/// TOA - Technical Order assistant
#[poise::command(
    slash_command,
    subcommands(
        "ask::ask",
        "sources::sources",
        "sources::cite",
        "document::document",
        "manage::status",
        "manage::reset",
        "config::config"
    )
)]
pub async fn toa(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Split text into Discord-sized chunks, preferring line then word breaks.
pub(crate) fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let mut chunk_len = remaining.len().min(limit);
        while !remaining.is_char_boundary(chunk_len) {
            chunk_len -= 1;
        }
        if chunk_len == 0 {
            chunk_len = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }
        let split_at = if chunk_len < remaining.len() {
            remaining[..chunk_len]
                .rfind('\n')
                .or_else(|| remaining[..chunk_len].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(chunk_len)
        } else {
            chunk_len
        };
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

/// Send text in Discord-safe chunks. Uses ctx.say() for every chunk so
/// follow-ups go through the interaction webhook.
pub(crate) async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in split_chunks(text, CHUNK_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(split_chunks("hello", 10), vec!["hello"]);
        assert!(split_chunks("", 10).is_empty());
    }

    #[test]
    fn test_prefers_line_breaks() {
        let chunks = split_chunks("aaaa\nbbbb cccc", 8);
        assert_eq!(chunks, vec!["aaaa\n", "bbbb ", "cccc"]);
    }

    #[test]
    fn test_never_splits_inside_a_char() {
        let text = "é".repeat(10);
        let chunks = split_chunks(&text, 5);
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), text);
    }
}
