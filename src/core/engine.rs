/// The session-level engine: Request → Quest → Feedback.
///
/// Wires together the catalog, selection policy, completion ledger and
/// interaction history behind one object.

use chrono::Utc;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::core::catalog::{CatalogError, QuestCatalog};
use crate::core::config::{ConfigError, EngineConfig};
use crate::core::history::{GardenStats, InteractionHistory};
use crate::core::ledger::CompletionLedger;
use crate::core::policy::{HybridPolicy, PolicyError, QuestRequest};
use crate::core::provider::{OfflineProvider, QuestProvider};
use crate::core::store::{KeyValueStore, MemoryStore, StoreError};
use crate::schema::mood::Mood;
use crate::schema::profile::{PersonalityProfile, Situation};
use crate::schema::quest::{FeedbackScore, HistoryEntry, QuestResult};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("unknown mood: {0}")]
    UnknownMood(String),
}

impl From<PolicyError> for EngineError {
    fn from(e: PolicyError) -> Self {
        match e {
            PolicyError::Config(e) => EngineError::Config(e),
            PolicyError::Catalog(e) => EngineError::Catalog(e),
        }
    }
}

/// The top-level quest engine. Built via `QuestEngine::builder()`.
pub struct QuestEngine {
    policy: HybridPolicy,
    ledger: CompletionLedger,
    history: InteractionHistory,
}

/// Builder for constructing a `QuestEngine`.
pub struct QuestEngineBuilder {
    config_path: Option<String>,
    catalog_path: Option<String>,
    /// Directly provided config (for testing without files).
    config: Option<EngineConfig>,
    /// Directly provided catalog (for testing without files).
    catalog: Option<QuestCatalog>,
    store: Option<Arc<dyn KeyValueStore>>,
    provider: Option<Box<dyn QuestProvider>>,
}

impl QuestEngine {
    pub fn builder() -> QuestEngineBuilder {
        QuestEngineBuilder {
            config_path: None,
            catalog_path: None,
            config: None,
            catalog: None,
            store: None,
            provider: None,
        }
    }

    /// Recommend a quest for a mood picked from the standard mood table.
    pub async fn recommend<R: Rng + Send + ?Sized>(
        &self,
        profile: PersonalityProfile,
        situation: Situation,
        mood_id: &str,
        rng: &mut R,
    ) -> Result<QuestResult, EngineError> {
        let mood = Mood::lookup(mood_id).ok_or_else(|| EngineError::UnknownMood(mood_id.to_string()))?;
        let history = self.history.entries();
        let request = QuestRequest {
            profile,
            situation,
            mood_label: mood.label,
            mood_id: mood.id,
            category: mood.category,
            history: &history,
        };
        Ok(self.recommend_with(&request, rng).await)
    }

    /// Recommend a quest for a fully caller-specified request.
    pub async fn recommend_with<R: Rng + Send + ?Sized>(
        &self,
        request: &QuestRequest<'_>,
        rng: &mut R,
    ) -> QuestResult {
        self.policy.select_quest(request, &self.ledger, rng).await
    }

    /// Record the user's rating of a quest they were shown.
    ///
    /// Appends to the history and, for catalog quests only, marks the quest
    /// as recently completed. Both are updated in memory even if saving one
    /// of them fails; the first save error is returned.
    pub fn record_feedback(
        &self,
        quest: &QuestResult,
        score: FeedbackScore,
        mood: Option<&Mood>,
    ) -> Result<(), EngineError> {
        let recorded = self.history.record(HistoryEntry {
            quest_title: quest.title.clone(),
            score,
            timestamp: Utc::now(),
            mood_category: mood.map(|m| m.category),
            mood_label: mood.map(|m| m.label.to_string()),
            quest_type: Some(quest.quest_type.clone()),
            quest_id: Some(quest.id().to_string()),
        });
        let marked = self.ledger.mark_completed(&quest.origin);
        recorded.and(marked)?;
        Ok(())
    }

    pub fn garden_stats(&self) -> GardenStats {
        GardenStats::from_history(&self.history.entries())
    }

    pub fn history(&self) -> &InteractionHistory {
        &self.history
    }

    pub fn ledger(&self) -> &CompletionLedger {
        &self.ledger
    }

    pub fn policy(&self) -> &HybridPolicy {
        &self.policy
    }
}

impl QuestEngineBuilder {
    /// Load engine config from a RON file.
    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Overlay a RON catalog on top of the base catalog.
    pub fn catalog_path(mut self, path: &str) -> Self {
        self.catalog_path = Some(path.to_string());
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the standard catalog as the base.
    pub fn with_catalog(mut self, catalog: QuestCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_provider(mut self, provider: impl QuestProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    pub fn build(self) -> Result<QuestEngine, EngineError> {
        // A config file overrides a directly provided config
        let config = match self.config_path {
            Some(ref path) => EngineConfig::load_from_ron(Path::new(path))?,
            None => self.config.unwrap_or_default(),
        };

        let mut catalog = match self.catalog {
            Some(catalog) => catalog,
            None => QuestCatalog::standard()?,
        };
        if let Some(ref path) = self.catalog_path {
            catalog.merge(QuestCatalog::load_from_ron(Path::new(path))?);
        }

        let provider = self.provider.unwrap_or_else(|| Box::new(OfflineProvider));
        let policy = HybridPolicy::new(&config, catalog, provider)?;

        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let ledger = CompletionLedger::open(store.clone(), config.ledger_capacity);
        let history = InteractionHistory::open(store, config.history_capacity);

        tracing::debug!(
            catalog = policy.catalog().len(),
            provider = policy.provider_name(),
            ai_probability = config.ai_probability,
            "Quest engine ready"
        );

        Ok(QuestEngine {
            policy,
            ledger,
            history,
        })
    }
}
