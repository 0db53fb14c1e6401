// src/handlers/update.rs
use std::sync::Arc;
use std::time::Duration;
use governor::{ RateLimiter, clock::DefaultClock };
use governor::state::keyed::DefaultKeyedStateStore;
use log::{ debug, error, warn };
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use crate::dispatch::{ Dispatcher, Inbound };
use crate::telegram::{ edit_reply, send_reply };

pub type CommandLimiter = RateLimiter<i64, DefaultKeyedStateStore<i64>, DefaultClock>;

const PRUNE_INTERVAL: Duration = Duration::from_secs(300);

/// Everything an update needs, shared read-only across tasks.
pub struct BotContext {
    pub dispatcher: Dispatcher,
    pub bot: Bot,
    /// Own username, without the `@`.
    pub bot_name: String,
    pub limiter: CommandLimiter,
}

impl BotContext {
    fn allow(&self, user_id: i64) -> bool {
        if self.limiter.check_key(&user_id).is_err() {
            warn!("Rate limit exceeded for user {}", user_id);
            return false;
        }
        true
    }
}

/// Drops limiter entries for users whose quota has fully replenished.
pub fn prune_limiter(limiter: &CommandLimiter) {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    debug!("Rate limiter tracks {} user(s)", limiter.len());
}

pub fn spawn_limiter_pruning(ctx: Arc<BotContext>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            prune_limiter(&ctx.limiter);
        }
    });
}

/// Entry point for webhook deliveries.
pub async fn handle_update(ctx: Arc<BotContext>, update: Update) {
    let id = update.id;
    match update.kind {
        UpdateKind::Message(message) => handle_message(&ctx, message).await,
        UpdateKind::CallbackQuery(query) => handle_callback(&ctx, query).await,
        _ => debug!("Ignoring update {:?}", id),
    }
}

pub async fn handle_message(ctx: &BotContext, message: Message) {
    let inbound = match message.text().and_then(|text| Inbound::parse_command(text, &ctx.bot_name)) {
        Some(inbound) => inbound,
        None => return,
    };
    let user_id = match &message.from {
        Some(user) => {
            debug!("{:?} from {} (@{})", inbound, user.id, user.username.as_deref().unwrap_or("-"));
            user.id.0 as i64
        }
        None => return,
    };
    if !ctx.allow(user_id) {
        return;
    }

    let reply = match ctx.dispatcher.dispatch(user_id, &inbound).await {
        Some(reply) => reply,
        None => return,
    };
    if let Err(e) = send_reply(&ctx.bot, message.chat.id, &reply).await {
        error!("Failed to send reply to chat {}: {}", message.chat.id, e);
    }
}

pub async fn handle_callback(ctx: &BotContext, query: CallbackQuery) {
    // Stops the client-side spinner whatever happens next.
    if let Err(e) = ctx.bot.answer_callback_query(query.id.clone()).await {
        warn!("Failed to answer callback query {}: {}", query.id, e);
    }
    let token = match query.data {
        Some(token) => token,
        None => return,
    };
    let user_id = query.from.id.0 as i64;
    if !ctx.allow(user_id) {
        return;
    }

    let reply = match ctx.dispatcher.dispatch(user_id, &Inbound::Button(token.clone())).await {
        Some(reply) => reply,
        None => {
            debug!("Ignoring unknown button {:?} from {}", token, user_id);
            return;
        }
    };
    match &query.message {
        Some(message) => {
            let chat_id = message.chat().id;
            if let Err(e) = edit_reply(&ctx.bot, chat_id, message.id(), &reply).await {
                error!("Failed to edit message {:?} in chat {}: {}", message.id(), chat_id, e);
            }
        }
        None => debug!("Callback {} has no message to edit", query.id),
    }
}
