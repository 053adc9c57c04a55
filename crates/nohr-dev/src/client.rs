//! Reconnecting update listener
//!
//! [`ReconnectPolicy`] is shared with the browser runtime served by
//! [`crate::ws`], so both sides back off the same way.

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::channel::UpdateMessage;
use crate::error::{DevError, Result};

/// Exponential reconnection backoff: `base × factor^(attempt-1)`
///
/// ```
/// use std::time::Duration;
/// use nohr_dev::ReconnectPolicy;
///
/// let policy = ReconnectPolicy::default();
/// assert_eq!(policy.delay_for(1), Some(Duration::from_millis(1000)));
/// assert_eq!(policy.delay_for(2), Some(Duration::from_millis(1500)));
/// assert_eq!(policy.delay_for(11), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub base_delay_ms: u64,
    pub factor: f64,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            factor: 1.5,
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnection attempt `attempt` (1-based); `None` once exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let millis = self.base_delay_ms as f64 * self.factor.powi(exponent);
        Some(Duration::from_millis(millis.round() as u64))
    }

    /// Every delay the policy allows, in order
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_attempts).filter_map(move |attempt| self.delay_for(attempt))
    }
}

/// Listens to an update channel server, reconnecting per the policy
#[derive(Debug, Clone)]
pub struct UpdateClient {
    url: String,
    policy: ReconnectPolicy,
}

impl UpdateClient {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Delivers every message to `on_message` until reconnection gives up
    ///
    /// The attempt counter resets after each successful connection. Returns
    /// [`DevError::Connection`] once the policy is exhausted.
    pub async fn run<F>(&self, mut on_message: F) -> Result<()>
    where
        F: FnMut(UpdateMessage),
    {
        let mut attempt = 0u32;

        loop {
            tracing::debug!("Connecting to {}", self.url);

            match connect_async(self.url.as_str()).await {
                Ok((mut stream, _)) => {
                    attempt = 0;

                    while let Some(frame) = stream.next().await {
                        match frame {
                            Ok(Message::Text(text)) => match serde_json::from_str(&text) {
                                Ok(message) => on_message(message),
                                Err(e) => tracing::warn!("Ignoring malformed update: {}", e),
                            },
                            Ok(Message::Close(_)) => break,
                            Ok(_) => continue,
                            Err(e) => {
                                tracing::debug!("Update channel read error: {}", e);
                                break;
                            }
                        }
                    }
                    tracing::info!("Disconnected from {}", self.url);
                }
                Err(e) => tracing::debug!("Connection to {} failed: {}", self.url, e),
            }

            attempt += 1;
            let Some(delay) = self.policy.delay_for(attempt) else {
                return Err(DevError::Connection(format!(
                    "gave up on {} after {} reconnection attempts",
                    self.url, self.policy.max_attempts
                )));
            };

            tracing::info!(
                "Reconnecting in {}ms (attempt {}/{})",
                delay.as_millis(),
                attempt,
                self.policy.max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }
}
