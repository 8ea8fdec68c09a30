use tracing::info;

use crate::state::Context;

/// Choose the Technical Order sent along with questions (omit to clear)
#[poise::command(slash_command, guild_only)]
pub async fn document(
    ctx: Context<'_>,
    #[description = "Document id, e.g. TO-00-25-172"]
    #[autocomplete = "autocomplete_document"]
    id: Option<String>,
) -> Result<(), anyhow::Error> {
    let channel = ctx.channel_id().get();
    let selected = ctx
        .data()
        .sessions
        .with(channel, |s| {
            s.select_document(id);
            s.selected_document().map(str::to_string)
        })
        .await;

    info!(channel, document = selected.as_deref(), "Document selection changed");

    match selected {
        Some(doc) => ctx.say(format!("Questions in this channel now target `{}`.", doc)).await?,
        None => ctx.say("Document selection cleared.").await?,
    };
    Ok(())
}

/// Autocomplete from the documents cited by the last answer.
async fn autocomplete_document(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let channel = ctx.channel_id().get();
    let documents: Vec<String> = ctx
        .data()
        .sessions
        .read(channel, |s| s.groups().iter().map(|(doc, _)| doc.clone()).collect())
        .await
        .unwrap_or_default();

    let partial = partial.to_lowercase();
    documents
        .into_iter()
        .filter(|d| d.to_lowercase().contains(&partial))
        .take(25)
        .collect()
}
