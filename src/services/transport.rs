//! Message Transport.
//!
//! Resolves which bot delivers a message (shared default bot or a per-user
//! bot token) and sends pre-rendered HTML to a chat.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use tokio::time;

use crate::config::PLACEHOLDER_BOT_TOKEN;
use crate::error::TransportError;

/// A client able to deliver one HTML message to one chat.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_html(&self, chat_id: &str, html: &str) -> Result<(), TransportError>;
}

pub type ClientFactory = Arc<dyn Fn(&str) -> Arc<dyn ChatClient> + Send + Sync>;

pub fn is_usable_token(token: &str) -> bool {
    let t = token.trim();
    !t.is_empty() && t != PLACEHOLDER_BOT_TOKEN
}

pub struct TelegramChatClient {
    bot: Bot,
}

impl TelegramChatClient {
    pub fn new(token: &str) -> Self {
        Self { bot: Bot::new(token) }
    }
}

fn recipient(chat_id: &str) -> Result<Recipient, TransportError> {
    let raw = chat_id.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if raw.starts_with('@') && raw.len() > 1 {
        return Ok(Recipient::ChannelUsername(raw.to_string()));
    }
    Err(TransportError::InvalidChatId(chat_id.to_string()))
}

#[async_trait]
impl ChatClient for TelegramChatClient {
    async fn send_html(&self, chat_id: &str, html: &str) -> Result<(), TransportError> {
        let to = recipient(chat_id)?;
        self.bot
            .send_message(to, html)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Provider(e.to_string()))
    }
}

/// Bot clients keyed by credential.
///
/// The default client is built once; per-token clients are created lazily on
/// first use and cached for the life of the registry.
pub struct BotClientRegistry {
    default: Option<Arc<dyn ChatClient>>,
    per_token: Mutex<HashMap<String, Arc<dyn ChatClient>>>,
    factory: ClientFactory,
}

impl BotClientRegistry {
    pub fn new(default_token: &str, factory: ClientFactory) -> Self {
        let default = is_usable_token(default_token).then(|| factory(default_token.trim()));
        Self {
            default,
            per_token: Mutex::new(HashMap::new()),
            factory,
        }
    }

    pub fn telegram(default_token: &str) -> Self {
        Self::new(
            default_token,
            Arc::new(|token: &str| Arc::new(TelegramChatClient::new(token)) as Arc<dyn ChatClient>),
        )
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn cached_clients(&self) -> usize {
        self.per_token.lock().len()
    }

    pub fn can_resolve(&self, credential: Option<&str>) -> bool {
        credential.is_some_and(is_usable_token) || self.default.is_some()
    }

    pub fn resolve(&self, credential: Option<&str>) -> Result<Arc<dyn ChatClient>, TransportError> {
        if let Some(token) = credential.map(str::trim).filter(|t| is_usable_token(t)) {
            let mut cache = self.per_token.lock();
            let client = cache
                .entry(token.to_string())
                .or_insert_with(|| (self.factory)(token));
            return Ok(Arc::clone(client));
        }

        self.default.clone().ok_or(TransportError::NotConfigured)
    }
}

#[derive(Clone)]
pub struct MessageTransport {
    registry: Arc<BotClientRegistry>,
    timeout: Duration,
}

impl MessageTransport {
    pub fn new(registry: Arc<BotClientRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &BotClientRegistry {
        &self.registry
    }

    pub fn can_send(&self, credential: Option<&str>) -> bool {
        self.registry.can_resolve(credential)
    }

    pub async fn send(&self, chat_id: &str, html: &str, credential: Option<&str>) -> Result<(), TransportError> {
        if chat_id.trim().is_empty() {
            return Err(TransportError::InvalidChatId(chat_id.to_string()));
        }

        let client = self.registry.resolve(credential)?;

        match time::timeout(self.timeout, client.send_html(chat_id.trim(), html)).await {
            Ok(res) => res,
            Err(_) => Err(TransportError::Timeout(self.timeout.as_secs())),
        }
    }
}
