use crate::config::AssistantConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

const SYSTEM_PROMPT: &str = "You are a friendly movie and TV show recommendation assistant. \
Suggest a few titles that fit the request, each with a one-line reason. Keep answers short.";

/// Text in, text out. Callers only display the reply.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn ask(&self, message: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatClient {
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let user_agent = format!("reelmark/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .context("Failed to build assistant HTTP client")?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub async fn try_ask(&self, message: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": message }
            ]
        });

        let mut req = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req.send().await.context("Assistant request failed")?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .context("Failed to read assistant body")?;
        if !status.is_success() {
            return Err(anyhow!(
                "Assistant HTTP error (status {}): {}",
                status,
                String::from_utf8_lossy(&bytes)
            ));
        }

        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).context("Failed to parse assistant JSON")?;
        first_reply(parsed).ok_or_else(|| anyhow!("Assistant returned no reply"))
    }
}

fn first_reply(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .filter_map(|c| c.message.and_then(|m| m.content))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

#[async_trait]
impl AssistantApi for ChatClient {
    async fn ask(&self, message: &str) -> Option<String> {
        self.try_ask(message)
            .await
            .map_err(|e| warn!("Assistant call failed: {:#}", e))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_non_empty_choice() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [
                { "message": { "content": "  " } },
                { "message": { "content": " Try Heat (1995). " } }
            ]
        }))
        .expect("response");
        assert_eq!(first_reply(response).as_deref(), Some("Try Heat (1995)."));
    }

    #[test]
    fn no_choices_means_no_reply() {
        let response: ChatResponse = serde_json::from_value(json!({})).expect("response");
        assert_eq!(first_reply(response), None);
    }
}
