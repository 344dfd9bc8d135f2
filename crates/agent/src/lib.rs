//! Sales conversation state machine
//!
//! Tracks where a call is in the outreach script and what pain points the
//! prospect has mentioned. Stage advancement and pain-point detection are
//! keyword heuristics over the transcribed user utterance; no model
//! inference is involved.

pub mod stage;
pub mod tracker;

pub use stage::{PainPoint, SalesStage};
pub use tracker::{ConversationSummary, SalesTracker};
