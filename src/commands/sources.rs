use tracing::info;

use super::ask::format_citation;
use super::send_chunked;
use crate::chat::markup::to_text;
use crate::state::Context;

/// Show the sources cited by the last answer in this channel
#[poise::command(slash_command, guild_only)]
pub async fn sources(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let channel = ctx.channel_id().get();
    let width = ctx.data().render_config.read().await.render_width;

    let markup = ctx
        .data()
        .sessions
        .read(channel, |s| s.sources_markup().to_string())
        .await
        .unwrap_or_default();

    if markup.is_empty() {
        ctx.say("No answer yet in this channel. Use `/toa ask` first.")
            .await?;
        return Ok(());
    }

    let output = format!("**Sources**\n\n{}", to_text(&markup, width));
    send_chunked(&ctx, &output).await
}

/// Follow a citation from the last answer to its source panel
#[poise::command(slash_command, guild_only)]
pub async fn cite(
    ctx: Context<'_>,
    #[description = "Citation number from the last answer"]
    #[min = 1]
    number: u32,
) -> Result<(), anyhow::Error> {
    let channel = ctx.channel_id().get();
    let (trust, width) = {
        let config = ctx.data().render_config.read().await;
        (config.trust(), config.render_width)
    };

    let index = (number as usize).saturating_sub(1);
    let activated = ctx
        .data()
        .sessions
        .update(channel, |s| s.activate_citation(index, trust))
        .await
        .flatten();

    let Some((link, markup)) = activated else {
        ctx.say(format!("There is no citation {} in the last answer.", number))
            .await?;
        return Ok(());
    };

    info!(
        user = ctx.author().name,
        channel,
        document = link.citation.document.as_deref(),
        "Citation followed"
    );

    let mut output = format_citation(index, &link);
    if let Some(document) = &link.citation.document {
        output.push_str(&format!("\nSelected document: `{}`", document));
    }
    match markup {
        Some(markup) => {
            output.push_str("\n\n");
            output.push_str(&to_text(&markup, width));
        }
        None => output.push_str("\n\nThis citation has no matching source panel."),
    }

    send_chunked(&ctx, &output).await
}
