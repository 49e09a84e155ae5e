//! Transcript data model: turns, the day-scoped session and reply drafts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Text shown in place of an image the assistant could not find
pub const NO_IMAGE_SENTINEL: &str = "no image available";

/// Payload kind of a turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    #[default]
    Text,
    Image,
}

impl TurnKind {
    /// Map a wire `type` value; anything unrecognised is text.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("image") => TurnKind::Image,
            _ => TurnKind::Text,
        }
    }
}

/// One message in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: i64,
    pub text: String,
    pub is_user: bool,
    #[serde(rename = "type", default)]
    pub kind: TurnKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

impl Turn {
    pub fn user(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            is_user: true,
            kind: TurnKind::Text,
            alt_text: None,
        }
    }

    pub fn assistant_text(id: i64, text: impl Into<String>) -> Self {
        Self::from_reply(id, ReplyTurn::text(text))
    }

    pub fn from_reply(id: i64, reply: ReplyTurn) -> Self {
        Self {
            id,
            text: reply.text,
            is_user: false,
            kind: reply.kind,
            alt_text: reply.alt_text,
        }
    }
}

/// A normalized assistant reply bubble, not yet placed in a session
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyTurn {
    pub text: String,
    pub kind: TurnKind,
    pub alt_text: Option<String>,
}

impl ReplyTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: TurnKind::Text,
            alt_text: None,
        }
    }
}

/// Geographic position reported alongside a question
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// The transcript for one civil day
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    date: NaiveDate,
    turns: Vec<Turn>,
}

impl Session {
    /// Empty session for `date`. Callers seed it before showing it.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            turns: Vec::new(),
        }
    }

    /// Fresh session holding only the assistant greeting
    pub fn with_greeting(date: NaiveDate, greeting: &str) -> Self {
        Self {
            date,
            turns: vec![Turn::assistant_text(1, greeting)],
        }
    }

    /// Rebuild a stored session. Turns out of id order are dropped.
    pub fn restore(date: NaiveDate, turns: Vec<Turn>) -> Self {
        let mut session = Self::new(date);
        for turn in turns {
            if session.last_id().map_or(true, |last| turn.id > last) {
                session.turns.push(turn);
            }
        }
        session
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_id(&self) -> Option<i64> {
        self.turns.last().map(|t| t.id)
    }

    /// Next id: the timestamp, unless that would not be greater than the last id.
    fn next_id(&self, now_millis: i64) -> i64 {
        match self.last_id() {
            Some(last) if now_millis <= last => last + 1,
            _ => now_millis,
        }
    }

    pub fn append_user(&mut self, text: impl Into<String>, now_millis: i64) -> &Turn {
        let id = self.next_id(now_millis);
        self.turns.push(Turn::user(id, text));
        &self.turns[self.turns.len() - 1]
    }

    pub fn append_reply(&mut self, reply: ReplyTurn, now_millis: i64) -> &Turn {
        let id = self.next_id(now_millis);
        self.turns.push(Turn::from_reply(id, reply));
        &self.turns[self.turns.len() - 1]
    }
}
