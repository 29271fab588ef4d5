//! Assistant chat for parkmark.
//!
//! A small conversation wrapper over a text-generation endpoint. The session
//! keeps a running transcript seeded with a description of the tool, so the
//! assistant can explain the commands and stay on topic.

use std::time::Duration;

use tracing::debug;
use ureq::Agent;

use crate::config::AssistConfig;
use crate::error::{Error, Result};

/// Per-exchange timeout, matching the endpoint's slower responses.
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transcript seed describing what the tool can do.
const PREAMBLE: &str = "\
The assistant helps people use parkmark, a command-line tool that remembers \
where they parked their car. The tool can: save the current spot (park), \
show the saved spot with a map link (where), list past spots (list), share \
the spot as text (share), search for nearby parking facilities (nearby), \
mark the car as moved (depart), set a reminder alarm or calendar event \
(remind), push spots to a personal cloud collection (sync), and change \
settings such as the search radius (config). The assistant knows these \
commands in detail and answers other questions in a friendly tone.

User:";

/// Greeting shown before the first exchange.
pub const GREETING: &str =
    "Hello! I'm the parkmark assistant. Ask me anything about saving, finding, \
     or sharing your parking spots.";

/// A conversation with the text-generation endpoint.
#[derive(Debug)]
pub struct ChatSession {
    agent: Agent,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    transcript: String,
}

impl ChatSession {
    /// Start a session from the assist configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured.
    pub fn new(config: &AssistConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(Error::MissingApiKey { endpoint: "assist" })?;

        let agent = Agent::config_builder()
            .timeout_global(Some(CHAT_TIMEOUT))
            .build()
            .new_agent();

        let mut transcript = String::from(PREAMBLE);
        transcript.push_str("\nAssistant: ");
        transcript.push_str(GREETING);
        transcript.push('\n');

        Ok(Self {
            agent,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            transcript,
        })
    }

    /// Send one user message and return the assistant's reply.
    ///
    /// The transcript only grows when the exchange succeeds, so a failed
    /// call can simply be retried.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// response that doesn't carry a generation.
    pub fn send(&mut self, message: &str) -> Result<String> {
        let prompt = format!("{}\nUser: {message}\nAssistant:", self.transcript);

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "k": 0,
            "p": 0.75,
        });

        debug!("Sending chat request to {}", self.endpoint);
        let mut response = match self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(Error::RemoteStatus {
                    endpoint: "assist",
                    status: code,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = response
            .body_mut()
            .read_json()
            .map_err(|e| Error::remote_format("assist", e.to_string()))?;

        let reply = value
            .get("generations")
            .and_then(serde_json::Value::as_array)
            .and_then(|generations| generations.first())
            .and_then(|generation| generation.get("text"))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| Error::remote_format("assist", "missing generations"))?
            .trim()
            .to_string();

        self.transcript
            .push_str(&format!("\nUser: {message}\nAssistant: {reply}\n"));
        Ok(reply)
    }

    /// The transcript so far, including the preamble.
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}
