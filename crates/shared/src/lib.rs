pub mod error;
pub mod review;
pub mod transcript;

pub mod settings {
    use serde::{Deserialize, Serialize};

    pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
    pub const DEFAULT_TIMEZONE: &str = "America/Mexico_City";
    pub const DEFAULT_GEOLOCATION_URL: &str = "http://ip-api.com/json";

    /// Where the assistant backend lives and how requests are shaped
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct BackendSettings {
        pub base_url: String,
        /// No timeout unless set; a hung request keeps the input disabled
        pub request_timeout_secs: Option<u64>,
        /// Keep only the most recent N history entries in each request
        pub max_history_turns: Option<usize>,
    }

    /// Fixed strings shown in the timeline
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Phrases {
        pub greeting: String,
        pub fallback_reply: String,
        pub connection_error: String,
        pub typing_indicator: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct GeolocationSettings {
        pub enabled: bool,
        /// Skip the lookup and always report this position
        pub fixed: Option<crate::transcript::Location>,
        pub lookup_url: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct TranscriptSettings {
        /// IANA zone that decides where one civil day ends
        pub timezone: String,
        /// Keep today's transcript on disk instead of in process memory
        pub persist_across_restarts: bool,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ClientSettings {
        pub backend: BackendSettings,
        pub phrases: Phrases,
        pub geolocation: GeolocationSettings,
        pub transcript: TranscriptSettings,
    }

    impl Default for BackendSettings {
        fn default() -> Self {
            Self {
                base_url: DEFAULT_BASE_URL.into(),
                request_timeout_secs: None,
                max_history_turns: None,
            }
        }
    }

    impl Default for Phrases {
        fn default() -> Self {
            Self {
                greeting: "¡Hola! Soy Naaj-IA. ¿En qué puedo ayudarte hoy?".into(),
                fallback_reply: "Lo siento, no entendí.".into(),
                connection_error: "Error de conexión. Intenta de nuevo.".into(),
                typing_indicator: "Naaj está escribiendo...".into(),
            }
        }
    }

    impl Default for GeolocationSettings {
        fn default() -> Self {
            Self {
                enabled: true,
                fixed: None,
                lookup_url: DEFAULT_GEOLOCATION_URL.into(),
            }
        }
    }

    impl Default for TranscriptSettings {
        fn default() -> Self {
            Self {
                timezone: DEFAULT_TIMEZONE.into(),
                persist_across_restarts: false,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_partial_settings_fill_defaults() {
            let json = r#"{"backend": {"base_url": "http://10.0.0.2:3000"}}"#;
            let settings: ClientSettings = serde_json::from_str(json).unwrap();
            assert_eq!(settings.backend.base_url, "http://10.0.0.2:3000");
            assert!(settings.backend.request_timeout_secs.is_none());
            assert_eq!(settings.transcript.timezone, DEFAULT_TIMEZONE);
            assert!(settings.geolocation.enabled);
            assert_eq!(settings.phrases.fallback_reply, "Lo siento, no entendí.");
        }
    }
}
