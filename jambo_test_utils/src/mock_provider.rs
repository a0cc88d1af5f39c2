//! Completion provider with pre-configured replies.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use jambo_core::{CompletionProvider, Prompt};
use tokio::sync::Mutex;

enum Step {
    Reply(String),
    Fail(String),
    Hang,
}

/// Replies are popped from a FIFO queue. When the queue is empty a default
/// reply is returned. Every prompt is recorded.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_replies(replies: &[&str]) -> Self {
        Self {
            steps: Mutex::new(
                replies
                    .iter()
                    .map(|r| Step::Reply((*r).to_string()))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_reply(&self, reply: &str) {
        self.steps
            .lock()
            .await
            .push_back(Step::Reply(reply.to_string()));
    }

    pub async fn push_failure(&self, message: &str) {
        self.steps
            .lock()
            .await
            .push_back(Step::Fail(message.to_string()));
    }

    /// The next call never returns, so the caller's timeout fires.
    pub async fn push_hang(&self) {
        self.steps.lock().await.push_back(Step::Hang);
    }

    pub async fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &Prompt) -> anyhow::Result<String> {
        self.prompts.lock().await.push(prompt.clone());
        let step = self.steps.lock().await.pop_front();
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(message)) => Err(anyhow::anyhow!(message)),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(anyhow::anyhow!("scripted hang elapsed"))
            }
            None => Ok("Thanks! Could you tell me a bit more?".to_string()),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
