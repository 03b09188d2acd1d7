//! Per-user profile: identity, relationship progress, and history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::mood::{Intensity, Mood, MoodReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    New,
    Acquainted,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::New => "new",
            Relationship::Acquainted => "acquainted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodEntry {
    pub mood: Mood,
    pub intensity: Intensity,
    pub keywords: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub data_sharing: bool,
    pub anonymous_mode: bool,
    pub conversation_history: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            data_sharing: false,
            anonymous_mode: false,
            conversation_history: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthEntry {
    pub id: String,
    /// "reflection", "goal", "progress", or "milestone".
    pub entry_type: String,
    pub content: String,
    pub mood: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthTracking {
    pub wellness_goals: Vec<String>,
    pub progress_markers: Vec<GrowthEntry>,
    pub reflection_entries: Vec<String>,
    pub cultural_preferences: Vec<String>,
    pub language_preference: String,
}

impl Default for GrowthTracking {
    fn default() -> Self {
        Self {
            wellness_goals: Vec::new(),
            progress_markers: Vec::new(),
            reflection_entries: Vec::new(),
            cultural_preferences: Vec::new(),
            language_preference: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalProfile {
    pub comfort_level: String,
    pub preferred_tone: String,
    pub trauma_awareness: bool,
    pub cultural_background: String,
}

impl Default for EmotionalProfile {
    fn default() -> Self {
        Self {
            comfort_level: "medium".to_string(),
            preferred_tone: "warm".to_string(),
            trauma_awareness: false,
            cultural_background: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub relationship: Relationship,
    pub conversation_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub mood_history: Vec<MoodEntry>,
    pub interests: Vec<String>,
    /// Need statements volunteered during onboarding, stored verbatim.
    pub topics: Vec<String>,
    pub privacy_settings: PrivacySettings,
    pub growth_tracking: GrowthTracking,
    pub emotional_profile: EmotionalProfile,
}

impl UserProfile {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            name: None,
            age: None,
            gender: None,
            location: None,
            relationship: Relationship::New,
            conversation_count: 0,
            first_seen: now,
            last_interaction: now,
            mood_history: Vec::new(),
            interests: Vec::new(),
            topics: Vec::new(),
            privacy_settings: PrivacySettings::default(),
            growth_tracking: GrowthTracking::default(),
            emotional_profile: EmotionalProfile::default(),
        }
    }

    /// Demographics are set-once: a field that already holds a value is left
    /// untouched. The name is the exception; it stays mutable once learned.
    pub fn apply_demographics(
        &mut self,
        age: Option<u32>,
        gender: Option<&str>,
        location: Option<&str>,
    ) {
        if self.age.is_none() {
            self.age = age;
        }
        if self.gender.is_none() {
            self.gender = gender.map(str::to_string);
        }
        if self.location.is_none() {
            self.location = location.map(str::to_string);
        }
    }

    pub fn has_full_demographics(&self) -> bool {
        self.age.is_some() && self.gender.is_some() && self.location.is_some()
    }

    pub fn record_mood(&mut self, reading: &MoodReading, now: DateTime<Utc>) {
        self.mood_history.push(MoodEntry {
            mood: reading.mood,
            intensity: reading.intensity,
            keywords: reading.matched_keywords.clone(),
            timestamp: now,
        });
    }

    pub fn last_mood(&self) -> Option<&MoodEntry> {
        self.mood_history.last()
    }

    /// Relationship advances new -> acquainted exactly once and never
    /// regresses.
    pub fn mark_acquainted(&mut self) {
        self.relationship = Relationship::Acquainted;
    }
}
