//! Response selection with a no-immediate-repeat discipline.
//!
//! Candidates live in a declarative bucket table; `select` filters recently
//! emitted texts, applies contextual weighting, and records what it returned.
//! It always comes back with exactly one non-empty string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mood::Mood;
use super::select::Selector;
use super::text::{contains_term, normalize};

/// Exclusion window: the last N texts emitted for a user+bucket.
const REPEAT_WINDOW: usize = 3;
/// Rolling history cap per user.
const HISTORY_CAP: usize = 20;
/// Below this many turns a user gets no false continuity claims.
const NEW_USER_TURNS: u32 = 3;

/// The hardcoded floor if a bucket ever comes back empty. Selection is built
/// so this cannot happen, but degrading beats propagating.
pub const SUPPORTIVE_FLOOR: &str =
    "I'm here with you. Tell me more about what's on your mind.";

const MEMORY_PHRASES: &[&str] = &["remember", "last time", "as we discussed"];
const SUPPORTIVE_MARKERS: &[&str] = &["here for you", "listen", "support", "no judgment"];
const ENERGETIC_MARKERS: &[&str] = &["energy", "excited", "wonderful", "great"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHistoryEntry {
    pub bucket: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Rolling record of emitted responses, used only to exclude near-term
/// repeats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseHistory {
    entries: Vec<ResponseHistoryEntry>,
}

impl ResponseHistory {
    pub fn recent_texts(&self, bucket: &str) -> Vec<&str> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.bucket == bucket)
            .take(REPEAT_WINDOW)
            .map(|e| e.text.as_str())
            .collect()
    }

    pub fn record(&mut self, bucket: &str, text: &str, now: DateTime<Utc>) {
        self.entries.push(ResponseHistoryEntry {
            bucket: bucket.to_string(),
            text: text.to_string(),
            timestamp: now,
        });
        if self.entries.len() > HISTORY_CAP {
            let overflow = self.entries.len() - HISTORY_CAP;
            self.entries.drain(..overflow);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The slice of conversational context that selection conditions on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionContext {
    pub conversation_length: u32,
    pub emotional_state: Option<Mood>,
}

/// Pick one candidate for a user+bucket.
///
/// 1. drop candidates matching the last three emissions for this bucket;
/// 2. an emptied set falls back to the full candidate list;
/// 3. new users lose memory-referencing candidates; a sad emotional state
///    prefers supportive greetings, an excited one energetic greetings, and
///    a mood filter that empties the set is skipped;
/// 4. uniform random pick through the injected selector;
/// 5. the pick is recorded into the rolling history.
pub fn select(
    selector: &Selector,
    history: &mut ResponseHistory,
    bucket: &str,
    candidates: &[String],
    ctx: &SelectionContext,
    now: DateTime<Utc>,
) -> String {
    if candidates.is_empty() {
        return SUPPORTIVE_FLOOR.to_string();
    }

    let recent = history.recent_texts(bucket);
    let mut eligible: Vec<&String> = candidates
        .iter()
        .filter(|c| !recent.contains(&c.as_str()))
        .collect();
    if eligible.is_empty() {
        eligible = candidates.iter().collect();
    }

    if ctx.conversation_length < NEW_USER_TURNS {
        let without_memory: Vec<&String> = eligible
            .iter()
            .copied()
            .filter(|c| {
                let lower = normalize(c);
                !MEMORY_PHRASES.iter().any(|p| lower.contains(p))
            })
            .collect();
        if !without_memory.is_empty() {
            eligible = without_memory;
        }
    }

    if bucket == "greeting" {
        let markers = match ctx.emotional_state {
            Some(Mood::Sad) => Some(SUPPORTIVE_MARKERS),
            Some(Mood::Excited) => Some(ENERGETIC_MARKERS),
            _ => None,
        };
        if let Some(markers) = markers {
            let preferred: Vec<&String> = eligible
                .iter()
                .copied()
                .filter(|c| {
                    let lower = normalize(c);
                    markers.iter().any(|m| lower.contains(m))
                })
                .collect();
            // A filter that empties the set is skipped, never surfaced.
            if !preferred.is_empty() {
                eligible = preferred;
            }
        }
    }

    let chosen = match selector.pick(&eligible) {
        Some(text) => (*text).clone(),
        None => SUPPORTIVE_FLOOR.to_string(),
    };
    history.record(bucket, &chosen, now);
    chosen
}

/// A logical response bucket: trigger terms plus candidate pools for the two
/// relationship levels.
pub struct ResponseBucket {
    pub name: &'static str,
    triggers: &'static [&'static str],
    personalized: &'static [&'static str],
    standard: &'static [&'static str],
}

impl ResponseBucket {
    pub fn matches(&self, lower_message: &str) -> bool {
        self.triggers.iter().any(|t| contains_term(lower_message, t))
    }

    pub fn candidates(&self, acquainted: bool) -> Vec<String> {
        let pool = if acquainted || self.standard.is_empty() {
            self.personalized
        } else {
            self.standard
        };
        pool.iter().map(|s| s.to_string()).collect()
    }
}

/// Ordered trigger table; the first matching bucket wins and the trailing
/// "general" bucket matches everything.
pub const RESPONSE_BUCKETS: &[ResponseBucket] = &[
    ResponseBucket {
        name: "greeting",
        triggers: &["hello", "hi", "hey"],
        personalized: &[
            "Hello{name}! It's great to see you again. How are you feeling today?",
            "Hi{name}! I've been thinking about you. How has your day been?",
            "Hey{name}! Welcome back. I'm curious about how you're doing.",
            "Hello{name}! I'm so glad you're here. What's on your mind?",
            "Hi there{name}! I'm here for you, ready to listen. What's new?",
            "Hey{name}! It's wonderful to see you again. How's everything going?",
            "Hello{name}! I've missed our conversations. How are you doing today?",
            "Hi{name}! I can feel the energy today. What's been happening?",
        ],
        standard: &[
            "Hello{name}! It's great to see you. How are you feeling today? I'm here to listen and support you.",
            "Hi{name}! Welcome. How has your day been treating you?",
        ],
    },
    ResponseBucket {
        name: "sad",
        triggers: &["feeling sad", "i am sad", "i'm sad"],
        personalized: &[
            "I can sense that you're going through something difficult{name}. It's completely normal to feel this way sometimes. Would you like to talk about what's weighing on your mind? I'm here to listen without judgment.",
            "I hear the heaviness in your words{name}. Sadness can feel really isolating, but you don't have to carry it alone. What's been on your mind lately?",
            "I'm sorry you're feeling this way{name}. Sadness can be really heavy to carry. What's been on your heart lately? I'm here to listen.",
            "I can feel that you're having a tough time{name}. It's okay to not be okay. What do you think might help you feel a little lighter right now?",
        ],
        standard: &[
            "I can sense that you're going through something difficult{name}. It's completely normal to feel this way sometimes. Would you like to talk about what's weighing on your mind? I'm here to listen without judgment.",
            "I'm sorry you're feeling this way{name}. Sadness can be really heavy to carry. What's been on your heart lately? I'm here to listen.",
        ],
    },
    ResponseBucket {
        name: "anxious",
        triggers: &["feeling anxious", "i am anxious", "i'm anxious"],
        personalized: &[
            "Anxiety can feel really overwhelming{name}. Your nervous system is trying to protect you, even if it feels like too much right now. What's making you feel anxious? Sometimes talking it through can help.",
            "I understand that anxious feeling{name}. It's like your mind is running a marathon. What's the biggest thing on your mind right now? We can work through this together.",
            "Anxiety is really challenging{name}. It's okay to feel this way. What would feel most supportive for you right now - talking about what's worrying you, or maybe some grounding techniques?",
            "I can hear the worry in your voice{name}. Anxiety can be really exhausting. What's been on your mind that's making you feel this way?",
        ],
        standard: &[
            "Anxiety can feel really overwhelming{name}. Your nervous system is trying to protect you, even if it feels like too much right now. What's making you feel anxious? Sometimes talking it through can help.",
            "I understand that anxious feeling{name}. It's like your mind is running a marathon. What's the biggest thing on your mind right now? We can work through this together.",
        ],
    },
    ResponseBucket {
        name: "tired",
        triggers: &["feeling tired", "i am tired", "i'm tired"],
        personalized: &[
            "I can hear the exhaustion in your voice{name}. Being tired affects everything, doesn't it? Have you been getting enough rest lately? What's been keeping you up?",
            "Tiredness can be really draining{name}. It's like your body is asking for a break. What's been taking up your energy lately? Sometimes identifying the source helps.",
            "I feel you on the tiredness{name}. It's been a lot lately, hasn't it? What would help you feel more rested? Sometimes even small changes can make a difference.",
            "Exhaustion can be really tough{name}. Your body is telling you it needs a break. What's been draining your energy lately?",
        ],
        standard: &[
            "I can hear the exhaustion in your voice{name}. Being tired affects everything, doesn't it? Have you been getting enough rest lately? What's been keeping you up?",
            "Tiredness can be really draining{name}. It's like your body is asking for a break. What's been taking up your energy lately? Sometimes identifying the source helps.",
        ],
    },
    ResponseBucket {
        name: "excited",
        triggers: &["feeling excited", "i am excited", "i'm excited"],
        personalized: &[
            "Your excitement is contagious{name}! I love that energy. What's got you feeling so pumped up? I want to hear all about it!",
            "That's fantastic{name}! Excitement is such a beautiful feeling. What's the source of all this positive energy? I'm genuinely curious!",
            "I can feel your enthusiasm{name}! It's wonderful when something lights you up like this. What's been making you feel so excited?",
            "Your energy is amazing{name}! I can feel the excitement radiating from your words. What's got you so fired up?",
        ],
        standard: &[
            "Your excitement is contagious{name}! I love that energy. What's got you feeling so pumped up? I want to hear all about it!",
            "That's fantastic{name}! Excitement is such a beautiful feeling. What's the source of all this positive energy? I'm genuinely curious!",
        ],
    },
    ResponseBucket {
        name: "happy",
        triggers: &["feeling happy", "i am happy", "i'm happy"],
        personalized: &[
            "That's wonderful to hear{name}! Your happiness is radiating through your words. What's contributing to your good mood today? I love hearing about what brings people joy.",
            "I'm so happy to hear that{name}! Positive vibes are flowing. What made today special for you? Your joy is contagious!",
            "That's fantastic{name}! Your happiness makes me smile too. Tell me more about what's bringing you joy. I want to celebrate this with you!",
            "Your happiness is contagious{name}! I can feel the positive energy. What's been making you smile today?",
        ],
        standard: &[
            "That's wonderful to hear{name}! Your happiness is radiating through your words. What's contributing to your good mood today? I love hearing about what brings people joy.",
            "I'm so happy to hear that{name}! Positive vibes are flowing. What made today special for you? Your joy is contagious!",
        ],
    },
    ResponseBucket {
        name: "okay",
        triggers: &["feeling okay", "i am okay", "i'm okay", "feeling neutral"],
        personalized: &[
            "Sometimes 'okay' is exactly where we need to be{name}. It's a stable place to build from. How has your day been so far?",
            "Okay is a perfectly valid feeling{name}. Not every day needs to be extraordinary. What's been on your mind today?",
            "That's totally fine{name}. Not every moment needs to be amazing. How has your day been going?",
            "Being okay is perfectly normal{name}. What's been happening in your day so far?",
        ],
        standard: &[
            "Sometimes 'okay' is exactly where we need to be{name}. It's a stable place to build from. How has your day been so far?",
            "That's totally fine{name}. Not every moment needs to be amazing. How has your day been going?",
        ],
    },
    ResponseBucket {
        name: "trauma",
        triggers: &["trauma", "abuse", "violence"],
        personalized: &[
            "I hear you{name}, and I want you to know that your feelings are valid. If you're comfortable sharing more, I'm here to listen without judgment. Remember, you're in control of our conversation, and you can stop or change topics anytime. Would you like to talk about this, or would you prefer to focus on something else?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "privacy",
        triggers: &["privacy", "private"],
        personalized: &[
            "Absolutely{name}! Your privacy is my top priority. Our conversations stay between us, and you control what you share. Is there anything specific about privacy that's on your mind?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "growth",
        triggers: &["growth", "progress", "journey"],
        personalized: &[
            "I love that you're thinking about your growth{name}! Your wellness journey is unique to you, and I'm here to support it. What aspect of your growth feels most important right now?",
            "Growth is such a beautiful thing to focus on{name}. Every step forward, no matter how small, is meaningful. What's been your biggest learning lately?",
            "Your growth mindset is inspiring{name}! It takes courage to reflect on our journey. What would you like to work on or celebrate?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "checkin",
        triggers: &["how are you", "are you ok", "how do you feel"],
        personalized: &[
            "I'm doing well, thank you for asking{name}! I love connecting with people like you. How are you really doing today? I want to hear about you.",
            "I'm feeling grateful for our conversation{name}! It's wonderful to chat with you. But I'm more interested in how you're doing - what's on your mind?",
            "I'm here and present with you{name}! That's what matters most to me. How are you feeling right now?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "interests",
        triggers: &["i love", "i like", "i enjoy", "i'm into"],
        personalized: &[
            "That's wonderful{name}! I love hearing about what brings you joy. How does that make you feel when you're doing it?",
            "That sounds amazing{name}! It's so important to have things that light us up. What do you love most about it?",
            "I'm so glad you have that in your life{name}! Those kinds of activities can be so nourishing. How does it contribute to your wellbeing?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "challenge",
        triggers: &["problem", "issue", "difficult", "challenge", "struggle"],
        personalized: &[
            "I hear you{name}, and I want you to know that your feelings are valid. It sounds like you're going through something really challenging. What would feel most supportive right now?",
            "That sounds really tough{name}. I'm here to listen and support you through this. What's been the hardest part?",
            "I can sense this is weighing on you{name}. You don't have to face this alone. What would help you feel a little better?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "positive",
        triggers: &["good", "great", "amazing", "wonderful", "excellent"],
        personalized: &[
            "That's fantastic{name}! I'm so happy to hear good news. What made this so special for you?",
            "I love hearing positive updates{name}! Your joy is contagious. How are you celebrating this?",
            "That's wonderful{name}! Good things happening always makes me smile. What's the best part about this?",
            "I'm genuinely excited for you{name}! Positive energy is flowing. What's been the highlight of this experience?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "daily",
        triggers: &["today", "yesterday", "this week"],
        personalized: &[
            "That sounds like a full day{name}! How are you feeling about everything that's been happening?",
            "I can hear the energy in your words{name}. What's been the most meaningful part of your day?",
            "That's quite a journey{name}! How are you processing all of this?",
            "I appreciate you sharing your day with me{name}. What's been on your mind the most?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "relationships",
        triggers: &["friend", "family", "relationship", "people"],
        personalized: &[
            "Relationships can be so complex{name}. How are you feeling about this situation?",
            "I hear the emotion in your voice{name}. What's been the most challenging part?",
            "That sounds really important to you{name}. How are you taking care of yourself through this?",
            "I can sense this matters deeply to you{name}. What would feel most supportive right now?",
        ],
        standard: &[],
    },
    ResponseBucket {
        name: "general",
        triggers: &[],
        personalized: &[
            "I'm listening{name}. Tell me more about what's on your mind.",
            "That's interesting{name}. How does that make you feel?",
            "I'm here to support you{name}. What's the most important thing you'd like to focus on today?",
            "I want to understand better{name}. Can you tell me more about that?",
            "That sounds important{name}. What's your take on it?",
            "I'm curious to hear more{name}. What's been on your mind about this?",
            "I appreciate you sharing that{name}. What's your perspective on this?",
            "That's really thoughtful{name}. How are you processing this?",
            "I'm here with you{name}. What would be most helpful to talk about?",
            "That's a great point{name}. How does this relate to how you're feeling?",
        ],
        standard: &[
            "I'm listening{name}. Tell me more about what's on your mind.",
            "That's interesting{name}. How does that make you feel?",
            "I want to understand better{name}. Can you tell me more about that?",
            "That sounds important{name}. What's your take on it?",
            "I appreciate you sharing that{name}. What's your perspective on this?",
            "That's really thoughtful{name}. How are you processing this?",
            "I'm here with you{name}. What would be most helpful to talk about?",
            "I'm curious about your thoughts{name}. Can you elaborate on that?",
        ],
    },
];

/// Find the bucket for a message. The general bucket is the guaranteed floor.
pub fn bucket_for(message: &str) -> &'static ResponseBucket {
    let lower = normalize(message);
    RESPONSE_BUCKETS
        .iter()
        .find(|b| !b.triggers.is_empty() && b.matches(&lower))
        .unwrap_or(&RESPONSE_BUCKETS[RESPONSE_BUCKETS.len() - 1])
}

/// Interest-flavoured additions for the general bucket, mirroring how the
/// companion folds known interests back into open-ended turns.
pub fn interest_candidates(interests: &[String]) -> Vec<String> {
    let joined = interests.join(", ").to_lowercase();
    let mut extra = Vec::new();
    if joined.contains("reading") {
        extra.push(
            "That reminds me of how you love reading{name}. Sometimes books help us process things differently. What's your take on this?"
                .to_string(),
        );
    }
    if joined.contains("music") {
        extra.push(
            "You know, music can be such a great way to process emotions{name}. How does this situation make you feel?"
                .to_string(),
        );
    }
    if joined.contains("cooking") || joined.contains("dancing") {
        extra.push(
            "I know you love creative activities{name}. Sometimes they help us work through things. What's your experience with this?"
                .to_string(),
        );
    }
    extra
}

/// Fill the `{name}` slot: ", Alex" once a name is known, nothing before.
pub fn render(template: &str, name: Option<&str>) -> String {
    let name_call = match name {
        Some(name) if !name.is_empty() => format!(", {}", name),
        _ => String::new(),
    };
    template.replace("{name}", &name_call)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("candidate {}", i)).collect()
    }

    #[test]
    fn no_immediate_repeats_with_enough_candidates() {
        let selector = Selector::seeded(42);
        let mut history = ResponseHistory::default();
        let candidates = pool(6);
        let ctx = SelectionContext::default();
        let now = Utc::now();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let text = select(&selector, &mut history, "greeting", &candidates, &ctx, now);
            assert!(!seen.contains(&text), "repeat inside the exclusion window");
            seen.push(text);
        }
    }

    #[test]
    fn exhausted_pool_falls_back_to_full_list() {
        let selector = Selector::seeded(1);
        let mut history = ResponseHistory::default();
        let candidates = pool(2);
        let ctx = SelectionContext::default();
        let now = Utc::now();

        for _ in 0..10 {
            let text = select(&selector, &mut history, "sad", &candidates, &ctx, now);
            assert!(!text.is_empty());
            assert!(candidates.contains(&text));
        }
    }

    #[test]
    fn empty_candidate_list_degrades_to_floor() {
        let selector = Selector::seeded(1);
        let mut history = ResponseHistory::default();
        let ctx = SelectionContext::default();
        let text = select(&selector, &mut history, "general", &[], &ctx, Utc::now());
        assert_eq!(text, SUPPORTIVE_FLOOR);
    }

    #[test]
    fn new_users_get_no_false_continuity() {
        let selector = Selector::seeded(9);
        let mut history = ResponseHistory::default();
        let candidates = vec![
            "Just like last time, huh?".to_string(),
            "I remember you said that before.".to_string(),
            "Tell me more about that.".to_string(),
        ];
        let ctx = SelectionContext {
            conversation_length: 1,
            emotional_state: None,
        };
        for _ in 0..10 {
            let text = select(&selector, &mut history, "general", &candidates, &ctx, Utc::now());
            assert_eq!(text, "Tell me more about that.");
        }
    }

    #[test]
    fn sad_greetings_prefer_supportive_language() {
        let selector = Selector::seeded(3);
        let mut history = ResponseHistory::default();
        let candidates = vec![
            "Hey! What's up?".to_string(),
            "Hello. I'm here to listen, whenever you're ready.".to_string(),
        ];
        let ctx = SelectionContext {
            conversation_length: 10,
            emotional_state: Some(Mood::Sad),
        };
        let text = select(&selector, &mut history, "greeting", &candidates, &ctx, Utc::now());
        assert_eq!(text, "Hello. I'm here to listen, whenever you're ready.");
    }

    #[test]
    fn mood_filter_that_empties_the_set_is_skipped() {
        let selector = Selector::seeded(3);
        let mut history = ResponseHistory::default();
        let candidates = vec!["Hey! What's up?".to_string()];
        let ctx = SelectionContext {
            conversation_length: 10,
            emotional_state: Some(Mood::Sad),
        };
        let text = select(&selector, &mut history, "greeting", &candidates, &ctx, Utc::now());
        assert_eq!(text, "Hey! What's up?");
    }

    #[test]
    fn history_is_capped_at_twenty_entries() {
        let selector = Selector::seeded(5);
        let mut history = ResponseHistory::default();
        let candidates = pool(8);
        let ctx = SelectionContext::default();
        for _ in 0..50 {
            select(&selector, &mut history, "general", &candidates, &ctx, Utc::now());
        }
        assert_eq!(history.len(), 20);
    }

    #[test]
    fn bucket_table_routes_by_trigger() {
        assert_eq!(bucket_for("hi there").name, "greeting");
        assert_eq!(bucket_for("I'm sad, feeling sad honestly").name, "sad");
        assert_eq!(bucket_for("something else entirely").name, "general");
        // "hi" must not fire inside other words.
        assert_eq!(bucket_for("this is a test").name, "general");
    }

    #[test]
    fn render_inserts_the_name_call() {
        assert_eq!(render("Hello{name}!", Some("Alex")), "Hello, Alex!");
        assert_eq!(render("Hello{name}!", None), "Hello!");
    }

    #[test]
    fn interest_candidates_follow_stored_interests() {
        let extra = interest_candidates(&["reading and music".to_string()]);
        assert_eq!(extra.len(), 2);
        assert!(interest_candidates(&["skydiving".to_string()]).is_empty());
    }
}
