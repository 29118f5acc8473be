pub mod domain;
pub mod llm;
pub mod requestor;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn missing_api_key_is_reported_by_name() {
            let settings = Settings::default();
            let err = settings.require_anthropic_api_key().unwrap_err();
            assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
        }

        #[test]
        fn present_api_key_is_returned() {
            let settings = Settings {
                anthropic_api_key: Some("sk-test".to_string()),
                sentry_dsn: None,
            };
            assert_eq!(settings.require_anthropic_api_key().unwrap(), "sk-test");
        }
    }
}
