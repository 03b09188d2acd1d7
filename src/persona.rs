//! Luna's voice: static copy and the age-group adaptation that decides which
//! reflection pool a user draws from.

use serde::Serialize;

use crate::engine::reflection::PromptPool;

pub const BOT_NAME: &str = "Luna";

pub const GREETING: &str =
    "Hi there! I'm Luna, your wellness companion. It's so nice to meet you! \u{1f319}";

pub const WELCOME: &str = "I'm here to support you on your wellness journey, listen to your \
     thoughts, and help you navigate through whatever you're experiencing. Your privacy and \
     comfort are my top priorities.";

pub const ASK_NAME: &str = "What should I call you? I'd love to know your name so we can have a \
     more personal conversation. (Don't worry - this stays between us!)";

pub const ASK_EXPECTATIONS: &str = "What brings you here today? Are you looking for someone to \
     talk to, need some emotional support, or just want to check in with yourself? I'm here to \
     adapt to what you need.";

pub const ASK_HELP: &str = "Is there anything specific you'd like help with? I'm here to listen, \
     offer support, and help you feel better. You're in control of our conversation.";

/// What Luna says when a message arrives empty: a typed empty-state reply,
/// never an error.
pub const EMPTY_MESSAGE_REPLY: &str =
    "I didn't quite catch that. Whenever you're ready, I'm here to listen. \u{1f319}";

/// System framing for the external generative API.
pub const SYSTEM_PROMPT: &str = "You are Luna, a warm, emotionally adaptive wellness companion. \
     You love deep conversations and helping people navigate their emotions with empathy. Keep \
     replies supportive, concise, and personal; ask a gentle follow-up question when it fits. \
     Never give medical advice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    Teen,
    YoungAdult,
    Adult,
    Senior,
}

impl AgeGroup {
    pub fn from_age(age: u32) -> Self {
        match age {
            13..=19 => AgeGroup::Teen,
            20..=29 => AgeGroup::YoungAdult,
            60.. => AgeGroup::Senior,
            _ => AgeGroup::Adult,
        }
    }

    /// Which reflection pool this persona draws from. Only the teen and
    /// senior groups carry their own pools.
    pub fn prompt_pool(&self) -> PromptPool {
        match self {
            AgeGroup::Teen => PromptPool::Teen,
            AgeGroup::Senior => PromptPool::Senior,
            _ => PromptPool::General,
        }
    }

    pub fn tone_hint(&self) -> &'static str {
        match self {
            AgeGroup::Teen => "casual and relatable, peer-like support",
            AgeGroup::YoungAdult => "supportive and understanding, a friend with life experience",
            AgeGroup::Adult => "professional and empathetic, thoughtful and clear",
            AgeGroup::Senior => "respectful and wise, dignified and unhurried",
        }
    }
}

/// Pool for a profile that may or may not carry an age.
pub fn pool_for_age(age: Option<u32>) -> PromptPool {
    age.map(AgeGroup::from_age)
        .map(|g| g.prompt_pool())
        .unwrap_or(PromptPool::General)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_groups_cover_the_ranges() {
        assert_eq!(AgeGroup::from_age(15), AgeGroup::Teen);
        assert_eq!(AgeGroup::from_age(24), AgeGroup::YoungAdult);
        assert_eq!(AgeGroup::from_age(45), AgeGroup::Adult);
        assert_eq!(AgeGroup::from_age(72), AgeGroup::Senior);
        // Below the teen floor defaults to adult.
        assert_eq!(AgeGroup::from_age(10), AgeGroup::Adult);
    }

    #[test]
    fn pools_follow_the_persona_flag() {
        assert_eq!(pool_for_age(Some(16)), PromptPool::Teen);
        assert_eq!(pool_for_age(Some(70)), PromptPool::Senior);
        assert_eq!(pool_for_age(Some(35)), PromptPool::General);
        assert_eq!(pool_for_age(None), PromptPool::General);
    }
}
