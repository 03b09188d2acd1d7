//! Reflection prompt rotation and dynamic answer options.
//!
//! Prompts rotate through a bounded recently-used queue per pool; the four
//! multiple-choice answers are derived from the prompt's dominant semantic
//! category and always span the polarity spread, down to the generic
//! fallback.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::select::Selector;
use super::text::normalize;

/// How many recently served prompts are held back from reselection.
const USED_PROMPT_CAP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptPool {
    General,
    Teen,
    Senior,
}

const GENERAL_PROMPTS: &[&str] = &[
    "How is your energy today?",
    "What's been weighing on your mind lately?",
    "What's one thing you're grateful for today?",
    "How connected do you feel to the people around you?",
    "How did you sleep last night?",
    "If your mood were weather, what would the forecast be?",
    "What's something creative you'd like to make time for?",
    "How does your body feel right now?",
    "What's one small step you took toward something that matters to you?",
    "How are you really feeling right now?",
    "What's something that made you pause and think today?",
    "Is there anything you've been avoiding that we could look at together?",
];

const TEEN_PROMPTS: &[&str] = &[
    "How's school been treating you lately?",
    "What's been going on with your friends?",
    "What's something you're excited about right now?",
    "How are you feeling about everything, honestly?",
    "If today were a song, what would it sound like?",
];

const SENIOR_PROMPTS: &[&str] = &[
    "What's been meaningful to you lately?",
    "How are you feeling about your days recently?",
    "Is there a memory that's been on your mind?",
    "How are your relationships going?",
    "What would you like to reflect on today?",
];

fn pool_prompts(pool: PromptPool) -> &'static [&'static str] {
    match pool {
        PromptPool::General => GENERAL_PROMPTS,
        PromptPool::Teen => TEEN_PROMPTS,
        PromptPool::Senior => SENIOR_PROMPTS,
    }
}

/// Per-user rotation state, one used-prompt queue per pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationState {
    general: VecDeque<String>,
    teen: VecDeque<String>,
    senior: VecDeque<String>,
}

impl RotationState {
    fn queue_mut(&mut self, pool: PromptPool) -> &mut VecDeque<String> {
        match pool {
            PromptPool::General => &mut self.general,
            PromptPool::Teen => &mut self.teen,
            PromptPool::Senior => &mut self.senior,
        }
    }
}

/// Serve the next prompt from a pool.
///
/// Selection is uniform over the prompts not in the recently-used queue. If
/// every prompt has been used the queue is cleared and selection resumes
/// over the full pool: graceful degradation beats strict no-repeat.
pub fn next_prompt(selector: &Selector, rotation: &mut RotationState, pool: PromptPool) -> String {
    let prompts = pool_prompts(pool);
    let used = rotation.queue_mut(pool);

    let mut available: Vec<&str> = prompts
        .iter()
        .copied()
        .filter(|p| !used.iter().any(|u| u == p))
        .collect();
    if available.is_empty() {
        used.clear();
        available = prompts.to_vec();
    }

    let chosen = match selector.pick(&available) {
        Some(prompt) => (*prompt).to_string(),
        None => "How are you feeling right now?".to_string(),
    };

    used.push_back(chosen.clone());
    while used.len() > USED_PROMPT_CAP {
        used.pop_front();
    }
    chosen
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReflectionOption {
    pub label: &'static str,
    pub value: &'static str,
    pub polarity: Polarity,
    pub emoji: &'static str,
}

const fn option(
    label: &'static str,
    value: &'static str,
    polarity: Polarity,
    emoji: &'static str,
) -> ReflectionOption {
    ReflectionOption {
        label,
        value,
        polarity,
        emoji,
    }
}

struct OptionCategory {
    name: &'static str,
    indicators: &'static [&'static str],
    options: [ReflectionOption; 4],
}

/// Category table in fixed priority order; the first category whose
/// indicator appears in the prompt wins. Every row spans at least one
/// positive and one negative/support-seeking option.
const OPTION_CATEGORIES: &[OptionCategory] = &[
    OptionCategory {
        name: "energy",
        indicators: &["energy", "tired", "drained"],
        options: [
            option("Full of energy", "energized", Polarity::Positive, "\u{26a1}"),
            option("Steady enough", "steady", Polarity::Neutral, "\u{1f60c}"),
            option("Running low", "low_energy", Polarity::Negative, "\u{1f634}"),
            option("Completely drained", "drained", Polarity::Negative, "\u{1f62b}"),
        ],
    },
    OptionCategory {
        name: "stress",
        indicators: &["stress", "anxious", "weighing", "worry"],
        options: [
            option("Calm and clear", "calm", Polarity::Positive, "\u{1f9d8}"),
            option("A little tense", "tense", Polarity::Neutral, "\u{1f610}"),
            option("Pretty overwhelmed", "overwhelmed", Polarity::Negative, "\u{1f630}"),
            option("I need to talk it out", "need_support", Polarity::Negative, "\u{1f4ac}"),
        ],
    },
    OptionCategory {
        name: "gratitude",
        indicators: &["grateful", "gratitude", "thankful"],
        options: [
            option("So much to be grateful for", "grateful", Polarity::Positive, "\u{1f64f}"),
            option("A few small things", "somewhat_grateful", Polarity::Positive, "\u{1f331}"),
            option("Hard to think of anything", "searching", Polarity::Neutral, "\u{1f914}"),
            option("Honestly, nothing today", "struggling", Polarity::Negative, "\u{1f614}"),
        ],
    },
    OptionCategory {
        name: "connection",
        indicators: &["connected", "people", "friends", "relationships"],
        options: [
            option("Deeply connected", "connected", Polarity::Positive, "\u{1f49e}"),
            option("In touch here and there", "in_touch", Polarity::Neutral, "\u{1f4f1}"),
            option("A bit distant", "distant", Polarity::Negative, "\u{1f32b}"),
            option("Really lonely", "lonely", Polarity::Negative, "\u{1f494}"),
        ],
    },
    OptionCategory {
        name: "sleep",
        indicators: &["sleep", "slept", "rest"],
        options: [
            option("Slept like a log", "rested", Polarity::Positive, "\u{1f31f}"),
            option("Decent enough", "okay_sleep", Polarity::Neutral, "\u{1f6cc}"),
            option("Tossed and turned", "restless", Polarity::Negative, "\u{1f635}"),
            option("Barely slept at all", "sleepless", Polarity::Negative, "\u{1f319}"),
        ],
    },
    OptionCategory {
        name: "creativity",
        indicators: &["creative", "make", "song", "imagine"],
        options: [
            option("Bursting with ideas", "inspired", Polarity::Positive, "\u{1f3a8}"),
            option("A spark here and there", "sparked", Polarity::Neutral, "\u{2728}"),
            option("Feeling blocked", "blocked", Polarity::Negative, "\u{1f9f1}"),
            option("Too worn out to create", "depleted", Polarity::Negative, "\u{1f4a4}"),
        ],
    },
    OptionCategory {
        name: "body",
        indicators: &["body", "physically"],
        options: [
            option("Strong and at ease", "at_ease", Polarity::Positive, "\u{1f4aa}"),
            option("Mostly comfortable", "comfortable", Polarity::Neutral, "\u{1f642}"),
            option("Tense or achy", "achy", Polarity::Negative, "\u{1f915}"),
            option("Really run down", "run_down", Polarity::Negative, "\u{1f912}"),
        ],
    },
    OptionCategory {
        name: "growth",
        indicators: &["step", "matters", "goal", "avoiding"],
        options: [
            option("Moving forward", "progressing", Polarity::Positive, "\u{1f680}"),
            option("Small steps count", "small_steps", Polarity::Positive, "\u{1f422}"),
            option("Feeling stuck", "stuck", Polarity::Negative, "\u{1f6a7}"),
            option("Not sure where to start", "uncertain", Polarity::Neutral, "\u{1f9ed}"),
        ],
    },
    OptionCategory {
        name: "weather",
        indicators: &["weather", "forecast", "season"],
        options: [
            option("Sunny and bright", "sunny", Polarity::Positive, "\u{2600}"),
            option("Partly cloudy", "cloudy", Polarity::Neutral, "\u{26c5}"),
            option("Grey drizzle", "drizzle", Polarity::Negative, "\u{1f327}"),
            option("Full storm", "storm", Polarity::Negative, "\u{26c8}"),
        ],
    },
];

/// The generic mood-check fallback for prompts no category claims.
const FALLBACK_OPTIONS: [ReflectionOption; 4] = [
    option("Pretty good", "good", Polarity::Positive, "\u{1f60a}"),
    option("Not great", "not_great", Polarity::Negative, "\u{1f615}"),
    option("Just okay", "okay", Polarity::Neutral, "\u{1f610}"),
    option("I need to talk", "need_to_talk", Polarity::Negative, "\u{1f4ac}"),
];

/// Derive the four answer options for a prompt.
pub fn options_for(prompt: &str) -> [ReflectionOption; 4] {
    let lower = normalize(prompt);
    for category in OPTION_CATEGORIES {
        if category.indicators.iter().any(|i| lower.contains(i)) {
            return category.options.clone();
        }
    }
    FALLBACK_OPTIONS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_polarity_spread(options: &[ReflectionOption; 4]) -> bool {
        options.iter().any(|o| o.polarity == Polarity::Positive)
            && options.iter().any(|o| o.polarity == Polarity::Negative)
    }

    #[test]
    fn rotation_never_repeats_until_exhaustion() {
        let selector = Selector::seeded(11);
        let mut rotation = RotationState::default();
        let mut served = Vec::new();
        // Teen pool has 5 prompts; the first 5 draws must all differ.
        for _ in 0..TEEN_PROMPTS.len() {
            let prompt = next_prompt(&selector, &mut rotation, PromptPool::Teen);
            assert!(!served.contains(&prompt), "repeat before exhaustion");
            served.push(prompt);
        }
    }

    #[test]
    fn rotation_recovers_after_exhaustion() {
        let selector = Selector::seeded(2);
        let mut rotation = RotationState::default();
        for _ in 0..(GENERAL_PROMPTS.len() * 3) {
            let prompt = next_prompt(&selector, &mut rotation, PromptPool::General);
            assert!(!prompt.is_empty());
        }
    }

    #[test]
    fn pools_rotate_independently() {
        let selector = Selector::seeded(4);
        let mut rotation = RotationState::default();
        for _ in 0..TEEN_PROMPTS.len() {
            next_prompt(&selector, &mut rotation, PromptPool::Teen);
        }
        // Exhausting the teen pool must not affect senior selection.
        let prompt = next_prompt(&selector, &mut rotation, PromptPool::Senior);
        assert!(SENIOR_PROMPTS.contains(&prompt.as_str()));
    }

    #[test]
    fn categories_are_matched_in_priority_order() {
        let options = options_for("How is your energy today?");
        assert_eq!(options[0].value, "energized");

        let options = options_for("What's been weighing on your mind lately?");
        assert_eq!(options[2].value, "overwhelmed");

        let options = options_for("If your mood were weather, what would the forecast be?");
        assert_eq!(options[0].value, "sunny");
    }

    #[test]
    fn every_category_spans_the_polarity_spread() {
        for category in OPTION_CATEGORIES {
            assert!(
                has_polarity_spread(&category.options),
                "category '{}' lacks the polarity spread",
                category.name
            );
        }
        assert!(has_polarity_spread(&FALLBACK_OPTIONS));
    }

    #[test]
    fn unrecognized_prompts_get_the_generic_fallback() {
        let options = options_for("zebra llama xylophone?");
        assert_eq!(options.len(), 4);
        assert_eq!(options[0].value, "good");
        assert!(has_polarity_spread(&options));
    }

    #[test]
    fn every_pool_prompt_yields_four_options() {
        for prompt in GENERAL_PROMPTS
            .iter()
            .chain(TEEN_PROMPTS)
            .chain(SENIOR_PROMPTS)
        {
            let options = options_for(prompt);
            assert_eq!(options.len(), 4);
            assert!(has_polarity_spread(&options), "prompt: {}", prompt);
        }
    }
}
