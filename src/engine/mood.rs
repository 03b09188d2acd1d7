//! Keyword-driven mood classification.
//!
//! Deliberately not a scored classifier: rules are evaluated in a fixed,
//! documented order and a later rule that matches overrides an earlier one.
//! Within one mood the tiers run from most severe to least and the first
//! matching tier decides the intensity.

use serde::{Deserialize, Serialize};

use super::text::{contains_term, normalize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Sad,
    Anxious,
    Happy,
    Excited,
    Angry,
    Tired,
    Lonely,
    Confused,
    Neutral,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Sad => "sad",
            Mood::Anxious => "anxious",
            Mood::Happy => "happy",
            Mood::Excited => "excited",
            Mood::Angry => "angry",
            Mood::Tired => "tired",
            Mood::Lonely => "lonely",
            Mood::Confused => "confused",
            Mood::Neutral => "neutral",
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Mood::Neutral)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Moderate,
    High,
    Severe,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Moderate => "moderate",
            Intensity::High => "high",
            Intensity::Severe => "severe",
        }
    }
}

/// Result of classifying a single message. Total over all inputs; a message
/// with no keyword hits reads as neutral at moderate intensity.
#[derive(Debug, Clone)]
pub struct MoodReading {
    pub mood: Mood,
    pub intensity: Intensity,
    pub matched_keywords: Vec<String>,
}

impl MoodReading {
    pub fn neutral() -> Self {
        Self {
            mood: Mood::Neutral,
            intensity: Intensity::Moderate,
            matched_keywords: Vec::new(),
        }
    }
}

struct MoodTier {
    intensity: Intensity,
    keywords: &'static [&'static str],
}

struct MoodRule {
    mood: Mood,
    tiers: &'static [MoodTier],
}

/// The fixed evaluation order. Neutral check-in words come first so that any
/// concrete mood later in the list overrides them; among the concrete moods,
/// later entries win ties against earlier ones.
const MOOD_RULES: &[MoodRule] = &[
    MoodRule {
        mood: Mood::Neutral,
        tiers: &[MoodTier {
            intensity: Intensity::Moderate,
            keywords: &["okay", "fine", "alright", "so-so", "meh"],
        }],
    },
    MoodRule {
        mood: Mood::Sad,
        tiers: &[
            MoodTier {
                intensity: Intensity::Severe,
                keywords: &["suicidal", "hopeless", "worthless", "can't go on"],
            },
            MoodTier {
                intensity: Intensity::High,
                keywords: &["depressed", "devastated", "heartbroken", "miserable", "despair"],
            },
            MoodTier {
                intensity: Intensity::Moderate,
                keywords: &["sad", "down", "blue", "unhappy", "gloomy", "terrible"],
            },
        ],
    },
    MoodRule {
        mood: Mood::Lonely,
        tiers: &[
            MoodTier {
                intensity: Intensity::High,
                keywords: &["abandoned", "isolated", "rejected", "unwanted"],
            },
            MoodTier {
                intensity: Intensity::Moderate,
                keywords: &["lonely", "disconnected", "left out"],
            },
        ],
    },
    MoodRule {
        mood: Mood::Confused,
        tiers: &[MoodTier {
            intensity: Intensity::Moderate,
            keywords: &["confused", "unsure", "uncertain", "puzzled", "mixed feelings"],
        }],
    },
    MoodRule {
        mood: Mood::Angry,
        tiers: &[
            MoodTier {
                intensity: Intensity::High,
                keywords: &["furious", "enraged", "livid", "outraged"],
            },
            MoodTier {
                intensity: Intensity::Moderate,
                keywords: &["angry", "mad", "irritated", "annoyed", "frustrated"],
            },
        ],
    },
    MoodRule {
        mood: Mood::Tired,
        tiers: &[
            MoodTier {
                intensity: Intensity::High,
                keywords: &["exhausted", "burned out", "drained", "worn out"],
            },
            MoodTier {
                intensity: Intensity::Moderate,
                keywords: &["tired", "sleepy", "fatigued", "weary"],
            },
        ],
    },
    MoodRule {
        mood: Mood::Anxious,
        tiers: &[
            MoodTier {
                intensity: Intensity::Severe,
                keywords: &["overwhelmed", "panic", "panicking", "terrified"],
            },
            MoodTier {
                intensity: Intensity::Moderate,
                keywords: &["anxious", "worried", "nervous", "stressed", "uneasy", "on edge"],
            },
        ],
    },
    MoodRule {
        mood: Mood::Happy,
        tiers: &[
            MoodTier {
                intensity: Intensity::High,
                keywords: &["ecstatic", "elated", "overjoyed", "amazing"],
            },
            MoodTier {
                intensity: Intensity::Moderate,
                keywords: &["happy", "glad", "wonderful", "great", "joyful", "cheerful"],
            },
        ],
    },
    MoodRule {
        mood: Mood::Excited,
        tiers: &[
            MoodTier {
                intensity: Intensity::High,
                keywords: &["thrilled", "can't wait", "exhilarated"],
            },
            MoodTier {
                intensity: Intensity::Moderate,
                keywords: &["excited", "energized", "pumped", "eager"],
            },
        ],
    },
];

/// Classify a raw message. Never fails; absence of signal is the neutral
/// outcome.
pub fn classify(message: &str) -> MoodReading {
    let lower = normalize(message);
    let mut winner: Option<(Mood, Intensity)> = None;
    let mut matched = Vec::new();

    for rule in MOOD_RULES {
        for tier in rule.tiers {
            let hits: Vec<&str> = tier
                .keywords
                .iter()
                .copied()
                .filter(|keyword| contains_term(&lower, keyword))
                .collect();
            if !hits.is_empty() {
                winner = Some((rule.mood, tier.intensity));
                matched.extend(hits.into_iter().map(str::to_string));
                break;
            }
        }
    }

    match winner {
        Some((mood, intensity)) => MoodReading {
            mood,
            intensity,
            matched_keywords: matched,
        },
        None => MoodReading::neutral(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_total_over_arbitrary_input() {
        for message in ["", "   ", "qwerty asdf", "1234 !!"] {
            let reading = classify(message);
            assert_eq!(reading.mood, Mood::Neutral);
            assert_eq!(reading.intensity, Intensity::Moderate);
        }
    }

    #[test]
    fn overwhelmed_reads_as_severe_anxiety() {
        let reading = classify("I feel so anxious and overwhelmed about my exam");
        assert_eq!(reading.mood, Mood::Anxious);
        assert_eq!(reading.intensity, Intensity::Severe);
        assert!(reading.matched_keywords.contains(&"overwhelmed".to_string()));
    }

    #[test]
    fn tiers_run_most_severe_first() {
        let reading = classify("honestly I've been feeling hopeless and a bit sad");
        assert_eq!(reading.mood, Mood::Sad);
        assert_eq!(reading.intensity, Intensity::Severe);
    }

    #[test]
    fn later_rules_override_earlier_matches() {
        // Sad is evaluated before Tired, so Tired wins the tie.
        let reading = classify("sad and tired today");
        assert_eq!(reading.mood, Mood::Tired);
    }

    #[test]
    fn concrete_moods_override_neutral_words() {
        let reading = classify("I'm fine, just really worried about tomorrow");
        assert_eq!(reading.mood, Mood::Anxious);
    }

    #[test]
    fn plain_checkin_words_read_neutral_with_matches() {
        let reading = classify("feeling okay I guess");
        assert_eq!(reading.mood, Mood::Neutral);
        assert!(!reading.matched_keywords.is_empty());
    }
}
