use crate::Assistant;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::error::ClientError;
use shared::review::ReviewSubmission;
use shared::settings::{BackendSettings, Phrases};
use shared::transcript::{Location, ReplyTurn, Turn, TurnKind};
use std::env;
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    text: &'a str,
    #[serde(rename = "isUser")]
    is_user: bool,
}

#[derive(Debug, Serialize)]
struct NaajRequest<'a> {
    question: &'a str,
    history: Vec<HistoryEntry<'a>>,
    lat: Option<f64>,
    lng: Option<f64>,
}

impl<'a> NaajRequest<'a> {
    /// History keeps only text and authorship to bound the payload.
    fn new(
        question: &'a str,
        prior_turns: &'a [Turn],
        location: Option<Location>,
        max_history: Option<usize>,
    ) -> Self {
        let start = max_history
            .map(|max| prior_turns.len().saturating_sub(max))
            .unwrap_or(0);
        let history = prior_turns[start..]
            .iter()
            .map(|t| HistoryEntry {
                text: &t.text,
                is_user: t.is_user,
            })
            .collect();
        Self {
            question,
            history,
            lat: location.map(|l| l.lat),
            lng: location.map(|l| l.lng),
        }
    }
}

/// One bubble of a multi-message reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplyItem {
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawReply {
    #[serde(default)]
    messages: Option<Vec<ReplyItem>>,
    #[serde(default)]
    answer: Option<String>,
}

/// The two reply shapes the backend produces
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantReply {
    Multi(Vec<ReplyItem>),
    Single(Option<String>),
}

impl AssistantReply {
    /// Decode a response body. Only non-JSON bodies are errors; JSON of an
    /// unexpected shape decodes to an empty `Single`.
    pub fn decode(body: &[u8]) -> Result<Self, ClientError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        let raw: RawReply = serde_json::from_value(value).unwrap_or_default();
        Ok(raw.into())
    }

    /// Always yields at least one turn.
    pub fn into_turns(self, fallback: &str) -> Vec<ReplyTurn> {
        match self {
            AssistantReply::Multi(items) if !items.is_empty() => items
                .into_iter()
                .map(|item| ReplyTurn {
                    kind: TurnKind::from_wire(item.kind.as_deref()),
                    text: item.content,
                    alt_text: item.alt_text,
                })
                .collect(),
            AssistantReply::Multi(_) | AssistantReply::Single(None) => {
                vec![ReplyTurn::text(fallback)]
            }
            AssistantReply::Single(Some(answer)) => {
                if answer.trim().is_empty() {
                    vec![ReplyTurn::text(fallback)]
                } else {
                    vec![ReplyTurn::text(answer)]
                }
            }
        }
    }
}

impl From<RawReply> for AssistantReply {
    fn from(raw: RawReply) -> Self {
        match raw.messages {
            Some(items) if !items.is_empty() => AssistantReply::Multi(items),
            _ => AssistantReply::Single(raw.answer),
        }
    }
}

/// HTTP client for the Naaj backend (`/naaj` and `/review`)
pub struct NaajClient {
    http: Client,
    base: Url,
    fallback_reply: String,
    max_history_turns: Option<usize>,
}

impl NaajClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::build(base_url, &BackendSettings::default(), &Phrases::default())
    }

    /// `NAAJ_BASE_URL` wins over the configured base URL.
    pub fn from_settings(backend: &BackendSettings, phrases: &Phrases) -> Result<Self, ClientError> {
        let base_url = env::var("NAAJ_BASE_URL").unwrap_or_else(|_| backend.base_url.clone());
        Self::build(&base_url, backend, phrases)
    }

    fn build(
        base_url: &str,
        backend: &BackendSettings,
        phrases: &Phrases,
    ) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(secs) = backend.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder
                .build()
                .map_err(|e| ClientError::Transport(e.to_string()))?,
            base: parse_base(base_url)?,
            fallback_reply: phrases.fallback_reply.clone(),
            max_history_turns: backend.max_history_turns,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn endpoint(&self, name: &str) -> Result<Url, ClientError> {
        self.base
            .join(name)
            .map_err(|_| ClientError::InvalidBaseUrl(self.base.to_string()))
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        body: &T,
    ) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(name)?;
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        if !status.is_success() {
            tracing::warn!(endpoint = name, status = status.as_u16(), "backend request failed");
            return Err(ClientError::status(
                status.as_u16(),
                &String::from_utf8_lossy(&bytes),
            ));
        }
        Ok(bytes.to_vec())
    }

    /// Post a place review. The reply body is passed through untouched.
    pub async fn submit_review(
        &self,
        review: &ReviewSubmission,
    ) -> Result<serde_json::Value, ClientError> {
        review.validate()?;
        let bytes = self.post_json("review", review).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Assistant for NaajClient {
    async fn send(
        &self,
        question: &str,
        prior_turns: &[Turn],
        location: Option<Location>,
    ) -> Result<Vec<ReplyTurn>, ClientError> {
        let request = NaajRequest::new(question, prior_turns, location, self.max_history_turns);
        tracing::debug!(
            history = request.history.len(),
            has_location = location.is_some(),
            "asking naaj"
        );
        let bytes = self.post_json("naaj", &request).await?;
        let reply = AssistantReply::decode(&bytes)?;
        let turns = reply.into_turns(&self.fallback_reply);
        tracing::debug!(bubbles = turns.len(), "naaj replied");
        Ok(turns)
    }
}

fn parse_base(raw: &str) -> Result<Url, ClientError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|_| ClientError::InvalidBaseUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidBaseUrl(raw.to_string()));
    }
    // join() replaces the last path segment unless the path ends in '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "Lo siento, no entendí.";

    #[test]
    fn test_request_trims_history() {
        let turns = vec![
            Turn::assistant_text(1, "¡Hola!"),
            Turn::from_reply(
                2,
                ReplyTurn {
                    text: "https://img.example/a.png".into(),
                    kind: TurnKind::Image,
                    alt_text: Some("A".into()),
                },
            ),
        ];
        let req = NaajRequest::new("¿Dónde como?", &turns, None, None);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "question": "¿Dónde como?",
                "history": [
                    {"text": "¡Hola!", "isUser": false},
                    {"text": "https://img.example/a.png", "isUser": false}
                ],
                "lat": null,
                "lng": null
            })
        );
    }

    #[test]
    fn test_request_caps_history_and_sends_location() {
        let turns: Vec<Turn> = (1..=5).map(|i| Turn::user(i, format!("m{i}"))).collect();
        let loc = Location { lat: 19.84, lng: -90.53 };
        let req = NaajRequest::new("q", &turns, Some(loc), Some(2));
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.history[0].text, "m4");
        assert_eq!(req.lat, Some(19.84));
        assert_eq!(req.lng, Some(-90.53));
    }

    #[test]
    fn test_multi_reply_takes_precedence() {
        let body = br#"{
            "messages": [
                {"content": "A"},
                {"content": "img.png", "type": "image", "alt_text": "X"}
            ],
            "answer": "ignored"
        }"#;
        let turns = AssistantReply::decode(body).unwrap().into_turns(FALLBACK);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], ReplyTurn::text("A"));
        assert_eq!(turns[1].kind, TurnKind::Image);
        assert_eq!(turns[1].alt_text.as_deref(), Some("X"));
    }

    #[test]
    fn test_empty_messages_fall_back_to_answer() {
        let body = r#"{"messages": [], "answer": "Visita Edzná"}"#;
        let reply = AssistantReply::decode(body.as_bytes()).unwrap();
        assert_eq!(reply, AssistantReply::Single(Some("Visita Edzná".into())));
        assert_eq!(reply.into_turns(FALLBACK), vec![ReplyTurn::text("Visita Edzná")]);
    }

    #[test]
    fn test_missing_or_blank_answer_uses_fallback() {
        let bodies: [&[u8]; 4] = [br#"{}"#, br#"{"answer": ""}"#, br#"{"answer": null}"#, b"[1, 2]"];
        for body in bodies {
            let turns = AssistantReply::decode(body).unwrap().into_turns(FALLBACK);
            assert_eq!(turns, vec![ReplyTurn::text(FALLBACK)]);
        }
    }

    #[test]
    fn test_non_json_body_is_decode_error() {
        let err = AssistantReply::decode(b"<html>502</html>").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let client = NaajClient::new("http://example.test/api").unwrap();
        assert_eq!(client.endpoint("naaj").unwrap().as_str(), "http://example.test/api/naaj");
        assert!(matches!(
            NaajClient::new("ftp://example.test"),
            Err(ClientError::InvalidBaseUrl(_))
        ));
    }
}
