pub mod clock;
pub mod transcript_store;
