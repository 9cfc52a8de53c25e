use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to the user by the chat client.
///
/// Configuration errors are fatal and reported before a session starts.
/// Remote and timeout errors are reported per turn and the session continues.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("openai API key is not provided, set env $OPENAI_API_KEY or use --api-key")]
    MissingApiKey,

    #[error("model {0} is not supported (known: {1})")]
    UnsupportedModel(String, String),

    #[error("render style {0} is not supported (known: dark, light, ascii)")]
    UnsupportedStyle(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("empty response")]
    EmptyResponse,

    #[error("no response within {}", fmt_duration(.0))]
    Timeout(Duration),
}

/// "60s" for whole seconds, "250ms" otherwise.
pub fn fmt_duration(d: &Duration) -> String {
    if d.subsec_millis() == 0 && d.as_secs() > 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_names_duration() {
        let err = ChatError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "no response within 60s");

        let err = ChatError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "no response within 250ms");
    }

    #[test]
    fn test_unsupported_model_lists_known_aliases() {
        let err = ChatError::UnsupportedModel("GPT9".into(), "GPT3.5, GPT4".into());
        assert_eq!(err.to_string(), "model GPT9 is not supported (known: GPT3.5, GPT4)");
    }
}
