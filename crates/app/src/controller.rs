//! Conversation flow for one chat session
//!
//! Owns today's transcript and the in-flight flag. A submission is two
//! halves: `begin_submit` (optimistic user turn, guard up) and
//! `finish_submit` (reply or error turn, guard down). The UI runs the
//! network call in between on the runtime; tests use `submit_user_text`.

use providers::geolocation::LocationCell;
use providers::Assistant;
use services::clock::Clock;
use services::transcript_store::TranscriptStore;
use shared::error::ClientError;
use shared::settings::Phrases;
use shared::transcript::{Location, ReplyTurn, Session, Turn};
use std::sync::Arc;

/// Everything the network half of a submission needs
#[derive(Debug, Clone)]
pub struct OutgoingTurn {
    pub question: String,
    /// Transcript as it was before the user turn was appended
    pub history: Vec<Turn>,
    pub location: Option<Location>,
}

impl OutgoingTurn {
    /// The network half: ask the assistant and hand back the raw outcome.
    pub async fn send(&self, assistant: &dyn Assistant) -> Result<Vec<ReplyTurn>, ClientError> {
        assistant
            .send(&self.question, &self.history, self.location)
            .await
    }
}

pub struct ConversationController {
    store: TranscriptStore,
    session: Session,
    pending: bool,
    clock: Arc<dyn Clock>,
    location: LocationCell,
    phrases: Phrases,
}

impl ConversationController {
    /// Load (or start) today's session. Called once per client lifetime.
    pub fn start(
        store: TranscriptStore,
        clock: Arc<dyn Clock>,
        location: LocationCell,
        phrases: Phrases,
    ) -> Self {
        let session = store.load(clock.today());
        Self {
            store,
            session,
            pending: false,
            clock,
            location,
            phrases,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn turns(&self) -> &[Turn] {
        self.session.turns()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Transient "typing" line shown while a reply is outstanding
    pub fn typing_indicator(&self) -> Option<&str> {
        self.pending.then_some(self.phrases.typing_indicator.as_str())
    }

    /// Append the user turn and raise the in-flight guard.
    ///
    /// Returns `None` (and changes nothing) for blank text or while another
    /// request is outstanding.
    pub fn begin_submit(&mut self, text: &str) -> Option<OutgoingTurn> {
        if text.trim().is_empty() {
            return None;
        }
        if self.pending {
            tracing::debug!("dropping submission while a reply is pending");
            return None;
        }

        let history = self.session.turns().to_vec();
        self.session.append_user(text, self.clock.now_millis());
        self.pending = true;
        self.persist();

        Some(OutgoingTurn {
            question: text.to_string(),
            history,
            location: self.location.get(),
        })
    }

    /// Apply the outcome of the request started by `begin_submit`.
    pub fn finish_submit(&mut self, outcome: Result<Vec<ReplyTurn>, ClientError>) {
        if !self.pending {
            tracing::warn!("reply arrived with no request in flight; ignoring");
            return;
        }

        match outcome {
            Ok(replies) if !replies.is_empty() => {
                for reply in replies {
                    self.session.append_reply(reply, self.clock.now_millis());
                }
            }
            Ok(_) => {
                let fallback = ReplyTurn::text(self.phrases.fallback_reply.as_str());
                self.session.append_reply(fallback, self.clock.now_millis());
            }
            Err(e) => {
                tracing::warn!("assistant request failed: {}", e);
                let error = ReplyTurn::text(self.phrases.connection_error.as_str());
                self.session.append_reply(error, self.clock.now_millis());
            }
        }

        self.pending = false;
        self.persist();
    }

    /// Full round trip for one user turn, awaited in place. Returns whether
    /// it was accepted. The window splits the same steps across frames.
    #[cfg(test)]
    pub async fn submit_user_text(&mut self, text: &str, assistant: &dyn Assistant) -> bool {
        let Some(outgoing) = self.begin_submit(text) else {
            return false;
        };
        let outcome = outgoing.send(assistant).await;
        self.finish_submit(outcome);
        true
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.session) {
            tracing::warn!("could not persist transcript: {:#}", e);
        }
    }
}
