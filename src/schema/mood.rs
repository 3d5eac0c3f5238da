use serde::{Deserialize, Serialize};

/// Coarse emotional cluster. The catalog is partitioned by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodCategory {
    LowEnergy,
    HighStress,
    CalmRefresh,
    PerformanceBoost,
}

impl MoodCategory {
    pub const ALL: [MoodCategory; 4] = [
        Self::LowEnergy,
        Self::HighStress,
        Self::CalmRefresh,
        Self::PerformanceBoost,
    ];

    /// Identifier string (e.g., "low_energy").
    pub fn id(&self) -> &'static str {
        match self {
            Self::LowEnergy => "low_energy",
            Self::HighStress => "high_stress",
            Self::CalmRefresh => "calm_refresh",
            Self::PerformanceBoost => "performance_boost",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::LowEnergy => "When your battery is empty",
            Self::HighStress => "When stress runs high",
            Self::CalmRefresh => "When you need a calm reset",
            Self::PerformanceBoost => "When you want to do better",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    /// The mood leaves that belong to this category.
    pub fn moods(&self) -> impl Iterator<Item = &'static Mood> + '_ {
        MOODS.iter().filter(move |m| m.category == *self)
    }
}

/// A fine-grained mood the user can pick. Each leaf belongs to exactly
/// one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mood {
    pub id: &'static str,
    pub label: &'static str,
    pub category: MoodCategory,
}

impl Mood {
    pub fn lookup(id: &str) -> Option<&'static Mood> {
        MOODS.iter().find(|m| m.id == id)
    }
}

pub static MOODS: [Mood; 16] = [
    Mood { id: "lethargic", label: "I feel listless", category: MoodCategory::LowEnergy },
    Mood { id: "tired", label: "I'm worn out", category: MoodCategory::LowEnergy },
    Mood { id: "dazed", label: "I'm spacing out", category: MoodCategory::LowEnergy },
    Mood { id: "depressed", label: "I feel down", category: MoodCategory::LowEnergy },
    Mood { id: "annoyed", label: "I'm irritated", category: MoodCategory::HighStress },
    Mood { id: "anxious", label: "I'm anxious", category: MoodCategory::HighStress },
    Mood { id: "sensitive", label: "I'm on edge", category: MoodCategory::HighStress },
    Mood { id: "overwhelmed", label: "I'm overwhelmed", category: MoodCategory::HighStress },
    Mood { id: "bored", label: "I'm bored", category: MoodCategory::CalmRefresh },
    Mood { id: "distracted", label: "My mind keeps wandering", category: MoodCategory::CalmRefresh },
    Mood { id: "calm", label: "I feel calm", category: MoodCategory::CalmRefresh },
    Mood { id: "empty", label: "I feel empty", category: MoodCategory::CalmRefresh },
    Mood { id: "excited", label: "I'm excited", category: MoodCategory::PerformanceBoost },
    Mood { id: "motivated", label: "I'm fired up", category: MoodCategory::PerformanceBoost },
    Mood { id: "focus", label: "I want to focus", category: MoodCategory::PerformanceBoost },
    Mood { id: "nervous", label: "I'm nervous", category: MoodCategory::PerformanceBoost },
];

/// Which moods a catalog entry serves: one category, or every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryScope {
    Any,
    Only(MoodCategory),
}

impl CategoryScope {
    pub const ANY_ID: &'static str = "any";

    pub fn matches(&self, category: MoodCategory) -> bool {
        match self {
            Self::Any => true,
            Self::Only(c) => *c == category,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Any => Self::ANY_ID,
            Self::Only(c) => c.id(),
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        if id == Self::ANY_ID {
            Some(Self::Any)
        } else {
            MoodCategory::from_id(id).map(Self::Only)
        }
    }
}
