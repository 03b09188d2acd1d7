//! The rule-based conversational engine.
//!
//! This is the deterministic stand-in that answers when the external
//! generative API is unavailable: classify the mood, tag topics, fold the
//! message into the conversational context, then pick a response from the
//! bucket table with the no-repeat discipline. Total over all inputs.

pub mod context;
pub mod mood;
pub mod onboarding;
pub mod reflection;
pub mod select;
pub mod text;
pub mod topics;
pub mod variation;

use chrono::{DateTime, Utc};

use crate::profile::Relationship;
use crate::store::UserState;
use mood::Mood;
use select::Selector;
use variation::SelectionContext;

pub struct EngineReply {
    pub text: String,
    pub mood: Mood,
}

pub struct RuleEngine {
    selector: Selector,
}

impl RuleEngine {
    pub fn new(selector: Selector) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Run the full rule pipeline for one inbound message. Advances the
    /// conversation count, updates context, and always produces a reply.
    pub fn respond(&self, state: &mut UserState, message: &str, now: DateTime<Utc>) -> EngineReply {
        let reading = mood::classify(message);
        let tags = topics::extract(message);

        state.profile.conversation_count += 1;
        state.profile.last_interaction = now;
        let flow = state.context.update(message, &reading, &tags, now);
        tracing::debug!(
            mood = reading.mood.as_str(),
            flow = flow.as_str(),
            count = state.profile.conversation_count,
            "engine turn"
        );

        if state.profile.relationship == Relationship::New
            && state.profile.conversation_count <= onboarding::ONBOARDING_STEPS
        {
            let text = onboarding::step_reply(&mut state.profile, message, &reading, now);
            return EngineReply {
                text,
                mood: reading.mood,
            };
        }

        if !reading.matched_keywords.is_empty() {
            state.profile.record_mood(&reading, now);
        }

        let text = self.pick_response(state, message, now);
        EngineReply {
            text,
            mood: reading.mood,
        }
    }

    fn pick_response(&self, state: &mut UserState, message: &str, now: DateTime<Utc>) -> String {
        let bucket = variation::bucket_for(message);
        let acquainted = state.profile.relationship == Relationship::Acquainted;
        let mut candidates = bucket.candidates(acquainted);
        if bucket.name == "general" && acquainted {
            candidates.extend(variation::interest_candidates(&state.profile.interests));
        }

        let ctx = SelectionContext {
            conversation_length: state.context.message_count,
            emotional_state: state.context.emotional_state,
        };
        let template = variation::select(
            &self.selector,
            &mut state.history,
            bucket.name,
            &candidates,
            &ctx,
            now,
        );
        variation::render(&template, state.profile.name.as_deref())
    }
}
