//! Topic tagging over a fixed vocabulary.
//!
//! Same declarative-table idiom as the mood classifier, but tags are not
//! mutually exclusive: a message can carry any number of them.

use serde::{Deserialize, Serialize};

use super::text::{contains_term, normalize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Work,
    Family,
    Friendship,
    Health,
    Sleep,
    Stress,
    Future,
    Past,
    Hobbies,
    Finances,
    Reading,
    Music,
    Exercise,
    Cooking,
    Travel,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Work => "work",
            Topic::Family => "family",
            Topic::Friendship => "friendship",
            Topic::Health => "health",
            Topic::Sleep => "sleep",
            Topic::Stress => "stress",
            Topic::Future => "future",
            Topic::Past => "past",
            Topic::Hobbies => "hobbies",
            Topic::Finances => "finances",
            Topic::Reading => "reading",
            Topic::Music => "music",
            Topic::Exercise => "exercise",
            Topic::Cooking => "cooking",
            Topic::Travel => "travel",
        }
    }
}

const TOPIC_RULES: &[(Topic, &[&str])] = &[
    (Topic::Work, &["work", "job", "boss", "office", "career", "deadline"]),
    (
        Topic::Family,
        &["family", "mom", "dad", "mother", "father", "parents", "brother", "sister"],
    ),
    (Topic::Friendship, &["friend", "friends", "friendship"]),
    (Topic::Health, &["health", "doctor", "sick", "ill", "pain"]),
    (Topic::Sleep, &["sleep", "sleeping", "slept", "insomnia", "nap", "dream"]),
    (Topic::Stress, &["stress", "stressed", "stressful", "pressure", "overwhelmed"]),
    (Topic::Future, &["future", "tomorrow", "goal", "goals", "plan", "plans"]),
    (Topic::Past, &["past", "memories", "childhood", "used to"]),
    (Topic::Hobbies, &["hobby", "hobbies", "painting", "drawing"]),
    (Topic::Finances, &["money", "finances", "rent", "bills", "budget"]),
    (Topic::Reading, &["reading", "book", "books", "novel"]),
    (Topic::Music, &["music", "song", "songs", "concert", "playlist"]),
    (Topic::Exercise, &["exercise", "gym", "workout", "running", "yoga"]),
    (Topic::Cooking, &["cooking", "cook", "recipe", "baking"]),
    (Topic::Travel, &["travel", "trip", "vacation", "holiday"]),
];

/// Scan a message for topic tags. Pure function, zero or more tags, in table
/// order, no duplicates.
pub fn extract(message: &str) -> Vec<Topic> {
    let lower = normalize(message);
    TOPIC_RULES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| contains_term(&lower, k)))
        .map(|(topic, _)| *topic)
        .collect()
}
