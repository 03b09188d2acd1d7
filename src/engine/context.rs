//! Per-user conversational context.
//!
//! The context is ephemeral and rebuildable: flow classification is a pure
//! function of the current message, the last three stored topics, and the
//! last mood entry. Nothing here accumulates independently of those inputs.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::mood::{Mood, MoodReading};
use super::text::{contains_term, normalize};
use super::topics::Topic;

const RECENT_TOPIC_WINDOW: usize = 5;
const FLOW_TOPIC_LOOKBACK: usize = 3;
const MOOD_RECENCY_MINUTES: i64 = 5;

const TRANSITION_PHRASES: &[&str] = &[
    "speaking of",
    "by the way",
    "anyway",
    "on another note",
    "that reminds me",
    "changing the subject",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationFlow {
    NewThread,
    Continuous,
    Transitioning,
    EmotionallyContinuous,
}

impl ConversationFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationFlow::NewThread => "new_thread",
            ConversationFlow::Continuous => "continuous",
            ConversationFlow::Transitioning => "transitioning",
            ConversationFlow::EmotionallyContinuous => "emotionally_continuous",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodStability {
    Stable,
    Changing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub recent_topics: VecDeque<Topic>,
    pub emotional_state: Option<Mood>,
    pub mood_stability: MoodStability,
    pub message_count: u32,
    pub flow: ConversationFlow,
    last_mood: Option<Mood>,
    last_mood_at: Option<DateTime<Utc>>,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self {
            recent_topics: VecDeque::new(),
            emotional_state: None,
            mood_stability: MoodStability::Changing,
            message_count: 0,
            flow: ConversationFlow::NewThread,
            last_mood: None,
            last_mood_at: None,
        }
    }
}

impl ConversationContext {
    /// Fold one inbound message into the context. Flow is classified against
    /// the *previous* state before counters and windows advance.
    pub fn update(
        &mut self,
        message: &str,
        reading: &MoodReading,
        topics: &[Topic],
        now: DateTime<Utc>,
    ) -> ConversationFlow {
        let flow = self.classify_flow(message, reading, topics, now);
        self.flow = flow;
        self.message_count += 1;

        for topic in topics {
            self.recent_topics.push_back(*topic);
            if self.recent_topics.len() > RECENT_TOPIC_WINDOW {
                self.recent_topics.pop_front();
            }
        }

        if !reading.mood.is_neutral() {
            if self.emotional_state == Some(reading.mood) {
                self.mood_stability = MoodStability::Stable;
            } else {
                self.mood_stability = MoodStability::Changing;
                self.emotional_state = Some(reading.mood);
            }
            self.last_mood = Some(reading.mood);
            self.last_mood_at = Some(now);
        }

        flow
    }

    /// Priority order: topic continuity, then an explicit transition phrase,
    /// then emotional continuity within the recency window, else a new thread.
    fn classify_flow(
        &self,
        message: &str,
        reading: &MoodReading,
        topics: &[Topic],
        now: DateTime<Utc>,
    ) -> ConversationFlow {
        let lookback: Vec<Topic> = self
            .recent_topics
            .iter()
            .rev()
            .take(FLOW_TOPIC_LOOKBACK)
            .copied()
            .collect();
        if topics.iter().any(|t| lookback.contains(t)) {
            return ConversationFlow::Continuous;
        }

        let lower = normalize(message);
        if TRANSITION_PHRASES.iter().any(|p| contains_term(&lower, p)) {
            return ConversationFlow::Transitioning;
        }

        if !reading.mood.is_neutral() {
            if let (Some(last), Some(at)) = (self.last_mood, self.last_mood_at) {
                if last == reading.mood && now - at < Duration::minutes(MOOD_RECENCY_MINUTES) {
                    return ConversationFlow::EmotionallyContinuous;
                }
            }
        }

        ConversationFlow::NewThread
    }
}
