pub mod geolocation;
pub mod naaj;

use async_trait::async_trait;
use shared::error::ClientError;
use shared::transcript::{Location, ReplyTurn, Turn};

/// A remote assistant that answers one question per round trip.
///
/// Implementations normalize whatever the backend returns into at least one
/// reply turn, and report transport problems as errors without retrying.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn send(
        &self,
        question: &str,
        prior_turns: &[Turn],
        location: Option<Location>,
    ) -> Result<Vec<ReplyTurn>, ClientError>;
}
