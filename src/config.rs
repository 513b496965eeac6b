use std::env;

use tracing::{debug, error};

use crate::error::AIError;

/// Environment variable that overrides the model used by the Claude client.
pub const MODEL_OVERRIDE_VAR: &str = "QUIZSMITH_MODEL";

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        // First try to load .env file (silently fail if not found)
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Find the API key or fail before any remote call is attempted.
    fn require_key() -> Result<String, AIError> {
        match Self::find_key() {
            Some(key) => {
                debug!(key_name = Self::KEY_NAME, "Found API credential");
                Ok(key)
            }
            None => {
                error!(key_name = Self::KEY_NAME, "API credential missing");
                Err(AIError::CredentialMissing(Self::KEY_NAME))
            }
        }
    }
}

/// Reads the optional model override, ignoring blank values.
pub fn model_override() -> Option<String> {
    let _ = dotenvy::dotenv();
    env::var(MODEL_OVERRIDE_VAR)
        .ok()
        .map(|model| model.trim().to_string())
        .filter(|model| !model.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unset;

    impl KeyFromEnv for Unset {
        const KEY_NAME: &'static str = "QUIZSMITH_TEST_KEY_THAT_IS_NEVER_SET";
    }

    #[test]
    fn missing_key_fails_fast() {
        let err = Unset::require_key().unwrap_err();
        assert!(matches!(err, AIError::CredentialMissing("QUIZSMITH_TEST_KEY_THAT_IS_NEVER_SET")));
    }
}
