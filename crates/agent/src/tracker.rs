//! Per-call progress through the outreach script
//!
//! One tracker per session. Mutated only by the session's own turn
//! pipeline after each transcribed utterance; callers serialize access.

use serde::Serialize;
use std::collections::HashMap;

use crate::stage::{PainPoint, SalesStage};

/// Serializable snapshot of a call's progress
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub stage: SalesStage,
    pub pain_points: Vec<&'static str>,
    pub meeting_scheduled: bool,
    pub user_info: HashMap<String, String>,
}

/// Sales conversation state for one call
#[derive(Debug, Default)]
pub struct SalesTracker {
    current_stage: SalesStage,
    // Insertion order preserved; no duplicates
    identified_pain_points: Vec<PainPoint>,
    meeting_scheduled: bool,
    // Reserved for slot filling, currently never written
    user_info: HashMap<String, String>,
}

impl SalesTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_stage(&self) -> SalesStage {
        self.current_stage
    }

    pub fn pain_points(&self) -> &[PainPoint] {
        &self.identified_pain_points
    }

    pub fn meeting_scheduled(&self) -> bool {
        self.meeting_scheduled
    }

    /// Advance the state machine from one transcribed user utterance
    ///
    /// Runs the pain-point pass on every utterance, then advances at most
    /// one stage when the utterance contains one of the current stage's
    /// trigger keywords. Matching is substring containment over the
    /// case-folded text.
    pub fn observe_user_utterance(&mut self, text: &str) {
        let folded = text.to_lowercase();

        self.extract_pain_points(&folded);

        let triggered = self
            .current_stage
            .advance_keywords()
            .iter()
            .any(|kw| folded.contains(kw));
        if !triggered {
            return;
        }

        if let Some(next) = self.current_stage.next() {
            tracing::info!(
                from = self.current_stage.tag(),
                to = next.tag(),
                "Sales stage advanced"
            );
            self.current_stage = next;
            if next == SalesStage::Closing {
                // The only transition with a side effect
                self.meeting_scheduled = true;
            }
        }
    }

    fn extract_pain_points(&mut self, folded: &str) {
        for pain in PainPoint::ALL {
            if self.identified_pain_points.contains(&pain) {
                continue;
            }
            if pain.keywords().iter().any(|kw| folded.contains(kw)) {
                tracing::info!(pain_point = pain.tag(), "Pain point identified");
                self.identified_pain_points.push(pain);
            }
        }
    }

    /// True once the script has run to completion and a meeting is booked
    ///
    /// Both conditions are checked so that a future transition rule that
    /// reaches closing without booking does not silently end calls.
    pub fn should_close_conversation(&self) -> bool {
        self.current_stage == SalesStage::Closing && self.meeting_scheduled
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            stage: self.current_stage,
            pain_points: self.identified_pain_points.iter().map(|p| p.tag()).collect(),
            meeting_scheduled: self.meeting_scheduled,
            user_info: self.user_info.clone(),
        }
    }
}
