use crate::chat::markup::{connection_status, to_text};
use crate::chat::session::{Role, TurnState};
use crate::chat::Session;
use crate::state::Context;

struct StatusSummary {
    online: bool,
    document: Option<String>,
    turn: TurnState,
    questions: usize,
    citations: usize,
    last_at: Option<i64>,
}

impl StatusSummary {
    fn of(s: &Session) -> Self {
        Self {
            online: s.is_online(),
            document: s.selected_document().map(str::to_string),
            turn: s.turn(),
            questions: s.transcript().iter().filter(|e| e.role == Role::User).count(),
            citations: s.citations().len(),
            last_at: s.transcript().last().map(|e| e.at),
        }
    }
}

/// Show connection status and session state for this channel
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let channel = ctx.channel_id().get();
    let width = ctx.data().render_config.read().await.render_width;

    let summary = ctx.data().sessions.read(channel, StatusSummary::of).await;
    // A channel that never asked anything reports a fresh session's state.
    let StatusSummary {
        online,
        document,
        turn,
        questions,
        citations,
        last_at,
    } = summary.unwrap_or_else(|| StatusSummary::of(&Session::new()));

    let last_activity = last_at
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let turn = match turn {
        TurnState::Idle => "idle",
        TurnState::Pending(_) => "waiting for an answer",
        TurnState::Done => "ready",
    };

    ctx.say(format!(
        "{}\n**Document:** {}\n**State:** {}\n**Questions:** {} | **Citations in last answer:** {}\n**Last activity:** {}",
        to_text(&connection_status(online), width),
        document.as_deref().unwrap_or("all"),
        turn,
        questions,
        citations,
        last_activity
    ))
    .await?;
    Ok(())
}

/// Start a fresh conversation in this channel
#[poise::command(slash_command, guild_only)]
pub async fn reset(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let channel = ctx.channel_id().get();
    if ctx.data().sessions.reset(channel).await {
        ctx.say("Conversation cleared.").await?;
    } else {
        ctx.say("A question is still being answered; try again once it finishes.")
            .await?;
    }
    Ok(())
}
