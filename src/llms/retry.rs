//! Bounded retry for generation, with a single profile-less fallback.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Attempting(n) --ok--------------------------> Done
//! Attempting(n) --non-retryable---------------> Failed
//! Attempting(n) --retryable, n < max----------> Attempting(n + 1)
//! Attempting(max) --retryable, profile set----> Fallback
//! Attempting(max) --retryable, no profile-----> Failed(Exhausted)
//! Fallback --ok-------------------------------> Done
//! Fallback --err------------------------------> Failed
//! ```

use std::time::Duration;

use super::{GenerationRequest, LanguageModel};
use crate::config::OutfitConfig;
use crate::utilities::errors::GenerationError;

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &OutfitConfig) -> Self {
        Self::new(config.attempts(), config.retry_delay())
    }
}

/// Position in the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    /// About to make attempt `attempt` (1-based) on the request's profile.
    Attempting { attempt: u32 },
    /// About to make the one profile-less attempt.
    Fallback,
    Done(String),
    Failed(GenerationError),
}

/// Generate with retries. Empty or whitespace-only responses and transport
/// errors are retried; anything else fails at once. The returned text is
/// trimmed.
pub async fn generate_with_retry(
    model: &dyn LanguageModel,
    request: &GenerationRequest,
    policy: RetryPolicy,
) -> Result<String, GenerationError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut made = 0u32;
    let mut state = RetryState::Attempting { attempt: 1 };

    loop {
        state = match state {
            RetryState::Attempting { attempt } => {
                made += 1;
                match attempt_once(model, request, request.profile.as_deref()).await {
                    Ok(text) => RetryState::Done(text),
                    Err(e) if !e.is_retryable() => RetryState::Failed(e),
                    Err(e) => {
                        log::warn!(
                            "generate_with_retry: attempt {}/{} failed: {}",
                            attempt,
                            max_attempts,
                            e
                        );
                        if attempt < max_attempts {
                            pause(policy.delay).await;
                            RetryState::Attempting {
                                attempt: attempt + 1,
                            }
                        } else if request.profile.is_some() {
                            log::warn!(
                                "generate_with_retry: profile path exhausted, falling back to default"
                            );
                            pause(policy.delay).await;
                            RetryState::Fallback
                        } else {
                            RetryState::Failed(GenerationError::Exhausted {
                                attempts: made,
                                last: Box::new(e),
                            })
                        }
                    }
                }
            }
            RetryState::Fallback => {
                made += 1;
                match attempt_once(model, request, None).await {
                    Ok(text) => RetryState::Done(text),
                    Err(e) if !e.is_retryable() => RetryState::Failed(e),
                    Err(e) => {
                        log::warn!("generate_with_retry: fallback failed: {}", e);
                        RetryState::Failed(GenerationError::Exhausted {
                            attempts: made,
                            last: Box::new(e),
                        })
                    }
                }
            }
            RetryState::Done(text) => return Ok(text),
            RetryState::Failed(e) => return Err(e),
        };
    }
}

async fn attempt_once(
    model: &dyn LanguageModel,
    request: &GenerationRequest,
    profile: Option<&str>,
) -> Result<String, GenerationError> {
    let text = model
        .generate(&request.prompt, &request.system_prompt, profile)
        .await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text.to_string())
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
