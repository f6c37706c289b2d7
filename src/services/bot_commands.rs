//! Commands answered by the shared default bot.
//!
//! `/start` tells a user the chat id to paste into their notification
//! settings; `/help` lists the commands and `/status` confirms the bot is up.

use teloxide::prelude::*;
use teloxide::types::{BotCommand, ParseMode};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Help,
    Status,
}

/// Parses `/start`, `/help` or `/status`, also in the `/cmd@BotName args` form.
pub fn parse_command(text: &str) -> Option<ChatCommand> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);

    match name.to_ascii_lowercase().as_str() {
        "start" => Some(ChatCommand::Start),
        "help" => Some(ChatCommand::Help),
        "status" => Some(ChatCommand::Status),
        _ => None,
    }
}

pub fn command_menu() -> Vec<(&'static str, &'static str)> {
    vec![
        ("start", "Get your chat id"),
        ("help", "Show help"),
        ("status", "Check that the bot is running"),
    ]
}

/// HTML reply for `command` sent from `chat_id`.
pub fn command_response(command: ChatCommand, chat_id: i64) -> String {
    match command {
        ChatCommand::Start => format!(
            "🎉 <b>Welcome to StockPulse!</b>\n\n\
             📱 Your chat id: <code>{chat_id}</code>\n\n\
             Copy this number into the app's Telegram settings to receive:\n\
             • 📈 price and entry alerts\n\
             • 📊 daily, weekly and monthly portfolio summaries"
        ),
        ChatCommand::Help => {
            let mut out = String::from("📚 <b>StockPulse bot</b>\n\nAvailable commands:\n");
            for (cmd, desc) in command_menu() {
                out.push_str(&format!("/{cmd} - {desc}\n"));
            }
            out.push_str("\n💡 Make sure notifications are enabled in the app.");
            out
        }
        ChatCommand::Status => "✅ The bot is running and connected!".to_string(),
    }
}

async fn register_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<BotCommand> = command_menu()
        .into_iter()
        .map(|(cmd, desc)| BotCommand::new(cmd, desc))
        .collect();

    bot.set_my_commands(commands).await?;
    Ok(())
}

/// Long-polls the default bot and answers its commands until the process exits.
pub fn spawn_command_listener(token: String) {
    tokio::spawn(async move {
        let bot = Bot::new(token);

        if let Err(e) = register_commands(&bot).await {
            warn!(error = %e, "failed to register bot commands");
        }
        info!("telegram command listener started");

        teloxide::repl(bot, |bot: Bot, msg: Message| async move {
            let Some(command) = msg.text().and_then(parse_command) else {
                return respond(());
            };

            let reply = command_response(command, msg.chat.id.0);
            if let Err(e) = bot
                .send_message(msg.chat.id, reply)
                .parse_mode(ParseMode::Html)
                .await
            {
                error!(chat_id = msg.chat.id.0, error = %e, "failed to answer bot command");
            }

            respond(())
        })
        .await;
    });
}
