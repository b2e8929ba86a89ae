//! Telegram transport for the chat bot
//!
//! Uses the Telegram Bot API with long polling (`getUpdates`), so no public
//! endpoint is needed. Every text message is handed to [`Bot::handle`] and the
//! reply, if any, is sent back to the same chat.
//!
//! # Setup
//!
//! 1. Create a bot via @BotFather on Telegram
//! 2. Set `CADENCE_BOT_TOKEN` (or `bot.bot_token` in the config file)
//! 3. Optionally set `bot.owner_id` to your Telegram user ID to allow `saveall`/`kill`

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{Bot, Caller};
use crate::config::BotConfig;

/// Telegram API base URL
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Delay before polling again after a failed request
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Minimal Bot API client
#[derive(Debug, Clone)]
pub struct TelegramClient {
    bot_token: String,
    api_base: String,
    poll_timeout_secs: u64,
    http_client: reqwest::Client,
}

/// Telegram API response envelope
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i32>,
}

impl<T> TelegramResponse<T> {
    fn into_result(self) -> Result<T> {
        if self.ok {
            self.result.context("No result in response")
        } else {
            let error_msg = self.description.unwrap_or_else(|| "Unknown error".to_string());
            bail!("Telegram API error: {} (code: {:?})", error_msg, self.error_code)
        }
    }
}

/// Telegram message info
#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub text: Option<String>,
    pub chat: TelegramChat,
    pub from: Option<TelegramUser>,
}

/// Telegram chat info
#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Telegram user info
#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

impl TelegramUser {
    fn caller(&self) -> Caller {
        Caller {
            id: self.id.to_string(),
            name: self.username.clone().unwrap_or_else(|| self.first_name.clone()),
        }
    }
}

/// Telegram update (incoming message/event)
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

/// Send message request
#[derive(Debug, Serialize)]
struct SendMessageRequest {
    chat_id: i64,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

impl SendMessageRequest {
    /// Request carrying `text` rendered as Telegram HTML
    fn html(chat_id: i64, text: &str) -> Self {
        Self {
            chat_id,
            text: to_html(text),
            parse_mode: Some("HTML"),
        }
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render bot reply text as Telegram HTML
///
/// Balanced ```fences``` become `<pre>` blocks and balanced `backticks` become
/// `<code>`; unbalanced ones stay literal. Everything else is escaped.
fn to_html(text: &str) -> String {
    let escaped = escape_html(text);
    let blocks: Vec<&str> = escaped.split("```").collect();
    if blocks.len() % 2 == 0 {
        return inline_code(&escaped);
    }

    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            if i % 2 == 1 {
                format!("<pre>{}</pre>", block.trim_matches('\n'))
            } else {
                inline_code(block)
            }
        })
        .collect()
}

fn inline_code(text: &str) -> String {
    let spans: Vec<&str> = text.split('`').collect();
    if spans.len() % 2 == 0 {
        return text.to_string();
    }

    spans
        .iter()
        .enumerate()
        .map(|(i, span)| {
            if i % 2 == 1 {
                format!("<code>{}</code>", span)
            } else {
                span.to_string()
            }
        })
        .collect()
}

/// Get updates request
#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

impl TelegramClient {
    /// Create a client from bot settings
    pub fn new(config: &BotConfig) -> Result<Self> {
        let bot_token = config.token()?;
        if !bot_token.contains(':') {
            bail!("Bot token looks malformed (expected '<id>:<secret>')");
        }

        // The HTTP timeout has to outlast the long poll
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            bot_token,
            api_base: TELEGRAM_API_BASE.to_string(),
            poll_timeout_secs: config.poll_timeout_secs,
            http_client,
        })
    }

    /// Get API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Test the bot token and get bot info
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response: TelegramResponse<TelegramUser> = self.http_client
            .get(self.api_url("getMe"))
            .send()
            .await
            .context("Failed to connect to Telegram API")?
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        response.into_result()
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>, timeout: u64) -> Result<Vec<TelegramUpdate>> {
        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: &["message"],
        };

        let response: TelegramResponse<Vec<TelegramUpdate>> = self.http_client
            .post(self.api_url("getUpdates"))
            .json(&request)
            .send()
            .await
            .context("Failed to fetch Telegram updates")?
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        response.into_result()
    }

    /// Send a text message, rendered as HTML
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<TelegramMessage> {
        let request = SendMessageRequest::html(chat_id, text);

        debug!("Sending Telegram message to {}", chat_id);

        let response: TelegramResponse<TelegramMessage> = self.http_client
            .post(self.api_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .context("Failed to send Telegram message")?
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        response.into_result()
    }
}

/// Run the bot until `kill` or Ctrl-C, then save every open session
pub async fn run(mut bot: Bot, config: &BotConfig) -> Result<()> {
    let client = TelegramClient::new(config)?;
    let me = client.get_me().await?;
    info!(
        "Logged in as {} (ID: {})",
        me.username.as_deref().unwrap_or(&me.first_name),
        me.id
    );

    let mut offset: Option<i64> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    'poll: loop {
        let updates = tokio::select! {
            updates = client.get_updates(offset, client.poll_timeout_secs) => updates,
            _ = &mut ctrl_c => {
                info!("Interrupted, logging out");
                break;
            }
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Polling failed: {:#}", e);
                tokio::select! {
                    _ = tokio::time::sleep(RETRY_DELAY) => continue,
                    _ = &mut ctrl_c => {
                        info!("Interrupted, logging out");
                        break;
                    }
                }
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);

            let Some(message) = update.message else { continue };
            let (Some(text), Some(from)) = (message.text.as_deref(), message.from.as_ref()) else {
                continue;
            };
            if from.is_bot {
                continue;
            }

            let Some(reply) = bot.handle(&from.caller(), text) else { continue };
            tokio::select! {
                sent = client.send_message(message.chat.id, &reply.text) => {
                    if let Err(e) = sent {
                        warn!("Failed to reply in chat {}: {:#}", message.chat.id, e);
                    }
                }
                _ = &mut ctrl_c => {
                    info!("Interrupted, logging out");
                    break 'poll;
                }
            }
            if reply.shutdown {
                break 'poll;
            }
        }
    }

    // Confirm processed updates so they are not redelivered on the next start
    if offset.is_some() {
        if let Err(e) = client.get_updates(offset, 0).await {
            debug!("Could not acknowledge final updates: {:#}", e);
        }
    }

    for (user, result) in bot.save_all() {
        match result {
            Ok(()) => info!("{} saved", user),
            Err(e) => error!("Failed to save {}: {}", user, e),
        }
    }

    info!("Logged out");
    Ok(())
}
