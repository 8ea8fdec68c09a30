use tracing::info;

use crate::state::{parse_flag, Context};

/// Configure rendering (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "trust_markup | render_width"] param: Option<String>,
    #[description = "New value"] value: Option<String>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value.as_deref()) {
        // Show current config
        (None, _) => {
            let config = ctx.data().render_config.read().await;
            ctx.say(format!(
                "**Render Configuration:**\n\
                 `trust_markup`: {}\n\
                 `render_width`: {}",
                config.trust_markup, config.render_width
            ))
            .await?;
        }
        (Some(key), Some(val)) => {
            let mut config = ctx.data().render_config.write().await;
            let reply = match key {
                "trust_markup" => match parse_flag(val) {
                    Some(flag) => {
                        config.trust_markup = flag;
                        format!("`trust_markup` set to {}", flag)
                    }
                    None => format!("`{}` is not a boolean. Use `true` or `false`.", val),
                },
                "render_width" => match val.trim().parse::<usize>() {
                    Ok(width) if (20..=400).contains(&width) => {
                        config.render_width = width;
                        format!("`render_width` set to {}", width)
                    }
                    _ => format!("`{}` is not a width between 20 and 400.", val),
                },
                _ => format!(
                    "Unknown param `{}`. Valid: `trust_markup`, `render_width`",
                    key
                ),
            };
            info!(user = ctx.author().name, key, val, "Render config updated");
            drop(config);
            ctx.say(reply).await?;
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/toa config render_width 80`")
                .await?;
        }
    }

    Ok(())
}
