use poise::CreateReply;
use tracing::info;

use super::{send_chunked, split_chunks, CHUNK_LIMIT};
use crate::chat::citations::CitationLink;
use crate::chat::markup::{to_text, LOADING_TEXT};
use crate::chat::{Submission, TurnOutcome};
use crate::state::{Context, TurnReply};

/// Ask the Technical Order assistant a question
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
) -> Result<(), anyhow::Error> {
    let channel = ctx.channel_id().get();
    let data = ctx.data();

    let (id, request) = match data.sessions.submit(channel, &question).await {
        Submission::Started { id, request } => (id, request),
        Submission::Empty => {
            ctx.say("Please enter a question.").await?;
            return Ok(());
        }
        Submission::Busy => {
            ctx.say("Still working on the previous question in this channel. Please wait for it to finish.")
                .await?;
            return Ok(());
        }
    };

    info!(
        user = ctx.author().name,
        channel,
        turn = id,
        document = request.document.as_deref(),
        "Chat request started"
    );

    let (trust, width) = {
        let config = data.render_config.read().await;
        (config.trust(), config.render_width)
    };

    // Loading indicator; replaced by the first chunk of the answer.
    let handle = match ctx.say(LOADING_TEXT).await {
        Ok(handle) => handle,
        Err(e) => {
            data.sessions
                .finish(channel, id, Err(anyhow::anyhow!("loading reply failed: {}", e)), trust)
                .await;
            return Err(e.into());
        }
    };

    let result = data.client.send(&request).await;
    let reply = data.sessions.finish(channel, id, result, trust).await;

    let text = match reply {
        Some(TurnReply::Answered(outcome)) => {
            info!(
                turn = id,
                online = outcome.online,
                citations = outcome.citations.len(),
                "Chat request complete"
            );
            format_outcome(&outcome, width)
        }
        Some(TurnReply::Failed(apology)) => apology,
        // Session was reset under us; nothing left to show.
        None => String::from("This conversation was reset before the answer arrived."),
    };

    let mut chunks = split_chunks(&text, CHUNK_LIMIT).into_iter();
    let first = chunks.next().unwrap_or("(empty answer)");
    handle
        .edit(ctx, CreateReply::default().content(first))
        .await?;
    let rest: String = chunks.collect();
    if !rest.is_empty() {
        send_chunked(&ctx, &rest).await?;
    }
    Ok(())
}

/// Discord rendition of a completed turn: answer, sources panel, then
/// the citation index usable with `/toa cite`.
pub(crate) fn format_outcome(outcome: &TurnOutcome, width: usize) -> String {
    let mut full = to_text(&outcome.answer, width);

    full.push_str("\n\n**Sources:**\n");
    full.push_str(&to_text(&outcome.sources, width));

    if !outcome.citations.is_empty() {
        full.push_str("\n\n**Citations:**\n");
        for (i, link) in outcome.citations.iter().enumerate() {
            full.push_str(&format_citation(i, link));
            full.push('\n');
        }
    }

    let titled: Vec<_> = outcome
        .document_refs
        .iter()
        .filter_map(|r| r.title.as_ref().map(|t| format!("`{}`: {}", r.document, t)))
        .collect();
    if !titled.is_empty() {
        full.push_str("\n**Referenced documents:** ");
        full.push_str(&titled.join(", "));
    }

    full
}

pub(crate) fn format_citation(index: usize, link: &CitationLink) -> String {
    let citation = &link.citation;
    let mut line = format!("`{}` {}", index + 1, citation.text);
    if let Some(document) = &citation.document {
        line.push_str(&format!(" {}", document));
    }
    if let Some(page) = &citation.page {
        line.push_str(&format!(" p.{}", page));
    }
    match link.group {
        Some(pos) => line.push_str(&format!(" (source panel {})", pos + 1)),
        None => line.push_str(" (not in sources)"),
    }
    line
}
