// src/telegram/mod.rs
pub mod poller;

use std::io;
use std::time::Duration;
use log::info;
use teloxide::prelude::*;
use teloxide::types::{ AllowedUpdate, MessageId };
use teloxide::utils::command::BotCommands;
use teloxide::RequestError;
use crate::config::Config;
use crate::dispatch::{ Command, Reply };

/// Telegram's message limit, counted in UTF-16 code units.
const MAX_MESSAGE_UNITS: usize = 4096;
/// Added on top of the long-poll timeout for the HTTP client.
const REQUEST_SLACK: Duration = Duration::from_secs(15);

/// Bot handle whose HTTP timeout outlasts a long poll.
pub fn build_bot(config: &Config) -> io::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(config.poll_timeout_secs) + REQUEST_SLACK)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    Ok(Bot::with_client(&config.telegram_token, client).set_api_url(config.telegram_api_url.clone()))
}

/// Looks up the bot's own username and publishes the command menu.
pub async fn introduce(bot: &Bot) -> Result<String, RequestError> {
    let me = bot.get_me().await?;
    bot.set_my_commands(Command::bot_commands()).await?;
    info!("Logged in as @{}", me.username());
    Ok(me.username().to_string())
}

pub async fn register_webhook(bot: &Bot, url: reqwest::Url, secret: Option<&str>) -> Result<(), RequestError> {
    let mut request = bot
        .set_webhook(url)
        .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);
    if let Some(secret) = secret {
        request = request.secret_token(secret);
    }
    request.await?;
    Ok(())
}

pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &Reply) -> Result<(), RequestError> {
    let mut request = bot.send_message(chat_id, clip(&reply.text));
    if let Some(markup) = reply.markup() {
        request = request.reply_markup(markup);
    }
    request.await?;
    Ok(())
}

pub async fn edit_reply(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    reply: &Reply
) -> Result<(), RequestError> {
    let mut request = bot.edit_message_text(chat_id, message_id, clip(&reply.text));
    if let Some(markup) = reply.markup() {
        request = request.reply_markup(markup);
    }
    request.await?;
    Ok(())
}

fn clip(text: &str) -> String {
    if text.encode_utf16().count() <= MAX_MESSAGE_UNITS {
        return text.to_string();
    }
    let budget = MAX_MESSAGE_UNITS - '…'.len_utf16();
    let mut used = 0;
    let mut clipped = String::new();
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        clipped.push(c);
    }
    clipped.push('…');
    clipped
}
