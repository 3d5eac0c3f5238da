use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mood::{CategoryScope, MoodCategory};
use crate::core::template::Template;

/// Rendered prefix of every generative-origin identifier.
pub const GENERATIVE_ID_PREFIX: &str = "ai_";

/// Identifier of the provider's built-in fallback quest.
pub const DEFAULT_QUEST_ID: &str = "default";

/// A catalog entry. Defined once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestTemplate {
    pub id: String,
    pub scope: CategoryScope,
    pub title: String,
    pub instruction: Template,
    pub encouragement: String,
    pub rationale: String,
    pub tag: String,
    pub quest_type: String,
}

/// Where a quest came from.
///
/// Only `Catalog` identifiers have a long-term identity; the completion
/// ledger records nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuestOrigin {
    Catalog(String),
    /// Request-scoped id, rendered with [`GENERATIVE_ID_PREFIX`].
    Generative(String),
    /// The provider's designated default quest.
    Default,
}

impl QuestOrigin {
    pub fn id(&self) -> &str {
        match self {
            Self::Catalog(id) | Self::Generative(id) => id,
            Self::Default => DEFAULT_QUEST_ID,
        }
    }

    /// Classify a raw identifier, e.g. one read back from stored history.
    pub fn from_id(id: &str) -> Self {
        if id.starts_with(GENERATIVE_ID_PREFIX) {
            Self::Generative(id.to_string())
        } else if id == DEFAULT_QUEST_ID {
            Self::Default
        } else {
            Self::Catalog(id.to_string())
        }
    }

    pub fn is_catalog(&self) -> bool {
        matches!(self, Self::Catalog(_))
    }

    pub fn is_generative(&self) -> bool {
        matches!(self, Self::Generative(_))
    }
}

/// A fully populated recommendation handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "QuestRecord", from = "QuestRecord")]
pub struct QuestResult {
    pub origin: QuestOrigin,
    pub title: String,
    pub instruction: String,
    pub encouragement: String,
    pub rationale: String,
    pub tag: String,
    pub quest_type: String,
}

impl QuestResult {
    pub fn id(&self) -> &str {
        self.origin.id()
    }

    pub fn is_ai_generated(&self) -> bool {
        self.origin.is_generative()
    }
}

// Flat wire shape shared with the front end: the origin is carried as an
// id plus the `isAiGenerated` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestRecord {
    id: String,
    title: String,
    instruction: String,
    encouragement: String,
    tag: String,
    quest_type: String,
    rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_ai_generated: Option<bool>,
}

impl From<QuestResult> for QuestRecord {
    fn from(quest: QuestResult) -> Self {
        let is_ai_generated = quest.is_ai_generated();
        QuestRecord {
            id: quest.origin.id().to_string(),
            title: quest.title,
            instruction: quest.instruction,
            encouragement: quest.encouragement,
            tag: quest.tag,
            quest_type: quest.quest_type,
            rationale: quest.rationale,
            is_ai_generated: Some(is_ai_generated),
        }
    }
}

impl From<QuestRecord> for QuestResult {
    fn from(record: QuestRecord) -> Self {
        // The flag wins over the id prefix when present
        let origin = match record.is_ai_generated {
            Some(true) => QuestOrigin::Generative(record.id),
            Some(false) if record.id == DEFAULT_QUEST_ID => QuestOrigin::Default,
            Some(false) => QuestOrigin::Catalog(record.id),
            None => QuestOrigin::from_id(&record.id),
        };
        QuestResult {
            origin,
            title: record.title,
            instruction: record.instruction,
            encouragement: record.encouragement,
            rationale: record.rationale,
            tag: record.tag,
            quest_type: record.quest_type,
        }
    }
}

/// How the user rated a quest after trying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackScore {
    Negative,
    Neutral,
    Positive,
}

impl FeedbackScore {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "negative" | "-" => Some(Self::Negative),
            "neutral" | "0" => Some(Self::Neutral),
            "positive" | "+" => Some(Self::Positive),
            _ => None,
        }
    }
}

/// One feedback event in the user's interaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub quest_title: String,
    pub score: FeedbackScore,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_category: Option<MoodCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(origin: QuestOrigin) -> QuestResult {
        QuestResult {
            origin,
            title: "Color hunt".to_string(),
            instruction: "Find five blue things.".to_string(),
            encouragement: "The world is getting sharper.".to_string(),
            rationale: "Searching for a color anchors attention.".to_string(),
            tag: "Awareness".to_string(),
            quest_type: "cognitive".to_string(),
        }
    }

    #[test]
    fn origin_classification() {
        assert!(QuestOrigin::from_id("ai_1700000000000_0badcafe").is_generative());
        assert_eq!(QuestOrigin::from_id("default"), QuestOrigin::Default);
        assert_eq!(
            QuestOrigin::from_id("c1"),
            QuestOrigin::Catalog("c1".to_string())
        );
    }

    #[test]
    fn only_generative_is_ai() {
        assert!(!make_result(QuestOrigin::Catalog("c1".into())).is_ai_generated());
        assert!(!make_result(QuestOrigin::Default).is_ai_generated());
        assert!(make_result(QuestOrigin::Generative("ai_1".into())).is_ai_generated());
    }

    #[test]
    fn result_wire_shape() {
        let quest = make_result(QuestOrigin::Generative("ai_42".into()));
        let value = serde_json::to_value(&quest).unwrap();
        assert_eq!(value["id"], "ai_42");
        assert_eq!(value["isAiGenerated"], true);
        assert_eq!(value["questType"], "cognitive");

        let back: QuestResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, quest);
    }

    #[test]
    fn result_wire_without_flag_is_catalog() {
        let json = r#"{"id":"b2","title":"t","instruction":"i","encouragement":"e",
            "tag":"Breathing","questType":"breathing","rationale":"r"}"#;
        let quest: QuestResult = serde_json::from_str(json).unwrap();
        assert_eq!(quest.origin, QuestOrigin::Catalog("b2".into()));
    }

    #[test]
    fn explicit_flag_overrides_id_prefix() {
        let json = r#"{"id":"ai_legacy","title":"t","instruction":"i","encouragement":"e",
            "tag":"Focus","questType":"cognitive","rationale":"r","isAiGenerated":false}"#;
        let quest: QuestResult = serde_json::from_str(json).unwrap();
        assert_eq!(quest.origin, QuestOrigin::Catalog("ai_legacy".into()));
        assert!(!quest.is_ai_generated());

        let value = serde_json::to_value(&quest).unwrap();
        assert_eq!(value["isAiGenerated"], false);

        let json = r#"{"id":"default","title":"t","instruction":"i","encouragement":"e",
            "tag":"Refresh","questType":"breathing","rationale":"r","isAiGenerated":false}"#;
        let quest: QuestResult = serde_json::from_str(json).unwrap();
        assert_eq!(quest.origin, QuestOrigin::Default);

        // without the flag the id prefix decides
        let json = r#"{"id":"ai_1_0badcafe","title":"t","instruction":"i","encouragement":"e",
            "tag":"Focus","questType":"cognitive","rationale":"r"}"#;
        let quest: QuestResult = serde_json::from_str(json).unwrap();
        assert!(quest.is_ai_generated());
    }

    #[test]
    fn history_entry_uses_millisecond_timestamps() {
        let json = r#"{"questTitle":"Ice therapy","score":"positive","timestamp":1700000000000,
            "moodCategory":"high_stress","questId":"b1"}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.score, FeedbackScore::Positive);
        assert_eq!(entry.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(entry.mood_category, Some(MoodCategory::HighStress));
        assert_eq!(entry.mood_label, None);
    }

    #[test]
    fn feedback_ids() {
        assert_eq!(FeedbackScore::from_id("Positive"), Some(FeedbackScore::Positive));
        assert_eq!(FeedbackScore::from_id("-"), Some(FeedbackScore::Negative));
        assert_eq!(FeedbackScore::from_id("meh"), None);
    }
}
