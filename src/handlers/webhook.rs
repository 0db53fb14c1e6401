// src/handlers/webhook.rs
use actix_web::{ web, HttpRequest, HttpResponse };
use log::{ debug, error };
use teloxide::types::Update;
use crate::config::Config;
use crate::handlers::update::{ handle_update, BotContext };
use crate::telegram_ranges::is_telegram_ip;
use crate::utils::{ extract_client_ip, RequestError };

const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

pub async fn handle_webhook(
    req: HttpRequest,
    ctx: web::Data<BotContext>,
    config: web::Data<Config>,
    update: web::Json<Update>
) -> Result<HttpResponse, RequestError> {
    verify_webhook(&req, &config)?;

    let update = update.into_inner();
    debug!("Webhook delivered update {:?}", update.id);
    // Answer Telegram right away; the reply goes out through the Bot API.
    tokio::spawn(handle_update(ctx.into_inner(), update));
    Ok(HttpResponse::Ok().finish())
}

fn verify_webhook(req: &HttpRequest, config: &Config) -> Result<(), RequestError> {
    if let Some(expected) = &config.webhook_secret {
        let presented = req.headers().get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            error!("Webhook call with missing or wrong secret token");
            return Err(RequestError::InvalidSecretToken);
        }
    }

    if config.webhook_verify_source {
        let ip = extract_client_ip(req, config.webhook_trust_forwarded)?;
        if !is_telegram_ip(ip) {
            error!("Webhook call from non-Telegram IP {}", ip);
            return Err(RequestError::UntrustedSource(ip.to_string()));
        }
    }
    Ok(())
}
