//! Configuration types.

use std::time::Duration;

/// Backend configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot name for identification.
    pub name: String,
    /// Bounded timeout for a single answer-generator call.
    pub generator_timeout: Duration,
    /// Fixed reply substituted when the answer generator fails.
    pub fallback_reply: String,
    /// Default database path (overridable via env in main).
    pub db_path: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "nutri-assist".to_string(),
            generator_timeout: Duration::from_secs(20),
            fallback_reply:
                "Sorry, I couldn't come up with an answer right now. Please try again in a moment."
                    .to_string(),
            db_path: "./data/nutri-assist.db".to_string(),
        }
    }
}
