use super::error::BackendError;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// A backend that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    /// Whether the backend is reachable; backends without a probe are always
    /// considered healthy
    async fn health_check(&self) -> Result<bool, BackendError> {
        Ok(true)
    }

    fn model(&self) -> &str;
}

/// Scripted generator for tests
///
/// Replies are matched by substring against the prompt, first rule wins;
/// unmatched prompts get the fallback reply.
pub struct MockTextGenerator {
    model: String,
    rules: Mutex<Vec<(String, Result<String, BackendError>)>>,
    fallback: Result<String, BackendError>,
    prompts: Mutex<Vec<String>>,
    healthy: bool,
}

impl MockTextGenerator {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            model: "mock".to_string(),
            rules: Mutex::new(Vec::new()),
            fallback: Ok(fallback.into()),
            prompts: Mutex::new(Vec::new()),
            healthy: true,
        }
    }

    /// Generator whose every call fails with `error`
    pub fn failing(error: BackendError) -> Self {
        Self {
            fallback: Err(error),
            ..Self::new(String::new())
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn reply_when(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.push_rule(needle.into(), Ok(reply.into()));
        self
    }

    pub fn fail_when(self, needle: impl Into<String>, error: BackendError) -> Self {
        self.push_rule(needle.into(), Err(error));
        self
    }

    fn push_rule(&self, needle: String, reply: Result<String, BackendError>) {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((needle, reply));
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let rules = self.rules.lock().unwrap_or_else(PoisonError::into_inner);
        rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn health_check(&self) -> Result<bool, BackendError> {
        Ok(self.healthy)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_match_by_substring() {
        let mock = MockTextGenerator::new("fallback")
            .reply_when("summary", "A web service")
            .fail_when("architecture", BackendError::TimeoutError { seconds: 1 });

        assert_eq!(mock.generate("write a summary").await.unwrap(), "A web service");
        assert!(mock.generate("describe the architecture").await.is_err());
        assert_eq!(mock.generate("anything else").await.unwrap(), "fallback");
        assert_eq!(mock.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_unhealthy() {
        let mock = MockTextGenerator::new("x").unhealthy();
        assert!(!mock.health_check().await.unwrap());
    }
}
