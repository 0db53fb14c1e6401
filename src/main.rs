// src/main.rs
mod config;
mod dispatch;
mod handlers;
mod models;
mod protocol;
mod resolver;
mod telegram;
mod telegram_ranges;
mod utils;

use std::sync::Arc;
use actix_web::{ web, App, HttpServer };
use env_logger::Env;
use governor::RateLimiter;
use log::{ error, info, warn };
use crate::config::{ BotMode, Config };
use crate::dispatch::Dispatcher;
use crate::handlers::update::{ spawn_limiter_pruning, BotContext };
use crate::protocol::{ JavaStatusProbe, RconTransport };
use crate::resolver::{ CommandResolver, StatusResolver };

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    if config.admins.is_open() {
        warn!("ADMIN_USERS is empty: every user may run admin commands");
    } else {
        info!("{} admin user(s) configured", config.admins.len());
    }
    info!("Target server: {} (RCON {})", config.server, config.server.console_endpoint());

    let dispatcher = Dispatcher::new(
        config.server.clone(),
        config.admins.clone(),
        StatusResolver::new(Arc::new(JavaStatusProbe), config.probe_timeout()),
        CommandResolver::new(Arc::new(RconTransport), config.probe_timeout()),
    );
    let bot = telegram::build_bot(&config)?;
    let bot_name = match telegram::introduce(&bot).await {
        Ok(name) => name,
        Err(e) => {
            error!("Could not reach Telegram with the configured token: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };
    let ctx = Arc::new(BotContext {
        dispatcher,
        bot,
        bot_name,
        limiter: RateLimiter::keyed(config.command_quota()),
    });
    spawn_limiter_pruning(ctx.clone());

    match config.mode {
        BotMode::Polling => {
            telegram::poller::run_polling(ctx, config.poll_timeout_secs).await;
            Ok(())
        }
        BotMode::Webhook => serve_webhook(ctx, config).await,
    }
}

async fn serve_webhook(ctx: Arc<BotContext>, config: Config) -> std::io::Result<()> {
    match &config.webhook_url {
        Some(url) => match telegram::register_webhook(&ctx.bot, url.clone(), config.webhook_secret.as_deref()).await {
            Ok(()) => info!("Webhook registered at {}", url),
            Err(e) => error!("Failed to register webhook at {}: {}", url, e),
        },
        None => warn!("WEBHOOK_URL not set; assuming the webhook is registered elsewhere"),
    }

    let bind = format!("{}:{}", config.bind_address, config.port);
    let ctx = web::Data::from(ctx);
    let config = web::Data::new(config);

    info!("Starting webhook server on {}", bind);
    HttpServer::new(move || {
        App::new()
            .app_data(ctx.clone())
            .app_data(config.clone())
            .route("/", web::get().to(handlers::index::index))
            .route("/telegram/webhook", web::post().to(handlers::webhook::handle_webhook))
    })
        .bind(&bind)?
        .run().await
}
