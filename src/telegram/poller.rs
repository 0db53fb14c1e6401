// src/telegram/poller.rs
use std::sync::Arc;
use std::time::Duration;
use log::{ debug, info };
use teloxide::dispatching::{ Dispatcher, UpdateFilterExt };
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use crate::handlers::update::{ handle_callback, handle_message, BotContext };

/// Long polls Telegram until the process stops. Each update runs in its own task.
pub async fn run_polling(ctx: Arc<BotContext>, timeout_secs: u64) {
    // getUpdates is refused while a webhook is registered.
    let listener = Polling::builder(ctx.bot.clone())
        .timeout(Duration::from_secs(timeout_secs))
        .delete_webhook().await
        .build();

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("Polling Telegram for updates");
    Dispatcher::builder(ctx.bot.clone(), handler)
        .dependencies(dptree::deps![ctx])
        .default_handler(|update| async move {
            debug!("Ignoring update {:?}", update.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("Error in update handler"))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("Error while polling Telegram")
        ).await;
}

async fn on_message(message: Message, ctx: Arc<BotContext>) -> ResponseResult<()> {
    handle_message(&ctx, message).await;
    Ok(())
}

async fn on_callback(query: CallbackQuery, ctx: Arc<BotContext>) -> ResponseResult<()> {
    handle_callback(&ctx, query).await;
    Ok(())
}
