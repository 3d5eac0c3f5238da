/// Static quest catalog — loading, coverage validation and category pools.

use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::core::template::Template;
use crate::schema::mood::{CategoryScope, MoodCategory};
use crate::schema::quest::{QuestTemplate, DEFAULT_QUEST_ID, GENERATIVE_ID_PREFIX};

const STANDARD_CATALOG: &str = include_str!("../../data/catalog.ron");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("quest '{id}' has unknown category '{category}'")]
    UnknownCategory { id: String, category: String },
    #[error("duplicate quest id '{0}'")]
    DuplicateId(String),
    #[error("quest id '{0}' is reserved for non-catalog quests")]
    ReservedId(String),
    #[error("no quest serves category '{}'", .0.id())]
    UncoveredCategory(MoodCategory),
}

// RON shape: categories are written as plain strings so that "any" and the
// category ids read the same way they do everywhere else.
#[derive(Debug, Deserialize)]
#[serde(rename = "Quest")]
struct RonQuest {
    id: String,
    category: String,
    title: String,
    instruction: String,
    encouragement: String,
    rationale: String,
    tag: String,
    quest_type: String,
}

/// The immutable table of quest templates.
#[derive(Debug, Clone, Default)]
pub struct QuestCatalog {
    templates: Vec<QuestTemplate>,
}

impl QuestCatalog {
    pub fn new(templates: Vec<QuestTemplate>) -> Self {
        Self { templates }
    }

    /// The built-in twenty-quest catalog.
    pub fn standard() -> Result<QuestCatalog, CatalogError> {
        Self::parse_ron(STANDARD_CATALOG)
    }

    pub fn load_from_ron(path: &Path) -> Result<QuestCatalog, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<QuestCatalog, CatalogError> {
        let raw: Vec<RonQuest> = ron::from_str(input)?;
        let mut templates = Vec::with_capacity(raw.len());

        for quest in raw {
            let scope = CategoryScope::from_id(&quest.category).ok_or_else(|| {
                CatalogError::UnknownCategory {
                    id: quest.id.clone(),
                    category: quest.category.clone(),
                }
            })?;
            templates.push(QuestTemplate {
                id: quest.id,
                scope,
                title: quest.title,
                instruction: Template::parse(&quest.instruction),
                encouragement: quest.encouragement,
                rationale: quest.rationale,
                tag: quest.tag,
                quest_type: quest.quest_type,
            });
        }

        Ok(QuestCatalog { templates })
    }

    /// Overlay another catalog. Entries from `other` replace entries with
    /// the same id; new ids are appended.
    pub fn merge(&mut self, other: QuestCatalog) {
        for template in other.templates {
            match self.templates.iter_mut().find(|t| t.id == template.id) {
                Some(existing) => *existing = template,
                None => self.templates.push(template),
            }
        }
    }

    pub fn templates(&self) -> &[QuestTemplate] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&QuestTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates serving `category`: its own entries plus the wildcard ones.
    pub fn pool(&self, category: MoodCategory) -> Vec<&QuestTemplate> {
        self.templates
            .iter()
            .filter(|t| t.scope.matches(category))
            .collect()
    }

    /// Every structural problem in the catalog, in table order.
    pub fn issues(&self) -> Vec<CatalogError> {
        let mut issues = Vec::new();
        let mut seen = FxHashSet::default();

        for template in &self.templates {
            if template.id.starts_with(GENERATIVE_ID_PREFIX) || template.id == DEFAULT_QUEST_ID {
                issues.push(CatalogError::ReservedId(template.id.clone()));
            }
            if !seen.insert(template.id.as_str()) {
                issues.push(CatalogError::DuplicateId(template.id.clone()));
            }
        }

        for category in MoodCategory::ALL {
            if !self.templates.iter().any(|t| t.scope.matches(category)) {
                issues.push(CatalogError::UncoveredCategory(category));
            }
        }

        issues
    }

    /// Startup check: every category must have at least one entry.
    pub fn validate(&self) -> Result<(), CatalogError> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }
}
