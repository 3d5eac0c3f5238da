/// Hybrid selection policy: decides per request between the generative
/// provider and the catalog, and normalizes whatever comes back.

use chrono::{Local, Timelike, Utc};
use rand::distributions::{Bernoulli, Distribution};
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use std::time::Duration;

use crate::core::catalog::{CatalogError, QuestCatalog};
use crate::core::config::{ConfigError, EngineConfig};
use crate::core::ledger::CompletionLedger;
use crate::core::provider::{GeneratedQuest, GenerationRequest, ProviderError, QuestProvider};
use crate::core::template::{instantiate, ReplacementTable};
use crate::schema::mood::MoodCategory;
use crate::schema::profile::{PersonalityProfile, Situation};
use crate::schema::quest::{HistoryEntry, QuestOrigin, QuestResult, GENERATIVE_ID_PREFIX};

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// One quest request, as supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct QuestRequest<'a> {
    pub profile: PersonalityProfile,
    pub situation: Situation,
    pub mood_label: &'a str,
    pub mood_id: &'a str,
    pub category: MoodCategory,
    pub history: &'a [HistoryEntry],
}

/// Why a request went the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// No history yet.
    FirstTime,
    ExtremeMood,
    /// The probability roll came up generative.
    Roll,
    Catalog,
}

impl RoutingDecision {
    pub fn is_generative(&self) -> bool {
        !matches!(self, Self::Catalog)
    }
}

pub struct HybridPolicy {
    catalog: QuestCatalog,
    replacements: ReplacementTable,
    extreme_moods: FxHashSet<String>,
    roll: Bernoulli,
    provider_timeout: Duration,
    default_rationale: String,
    provider: Box<dyn QuestProvider>,
}

impl HybridPolicy {
    /// Build a policy. Fails if the config is out of range, any mood
    /// category has no catalog entry, or a placeholder the catalog uses has
    /// no replacement values.
    pub fn new(
        config: &EngineConfig,
        catalog: QuestCatalog,
        provider: Box<dyn QuestProvider>,
    ) -> Result<Self, PolicyError> {
        config.validate()?;
        catalog.validate()?;
        check_replacements(&catalog, &config.replacements)?;
        let roll = Bernoulli::new(config.ai_probability)
            .map_err(|_| ConfigError::Probability(config.ai_probability))?;

        Ok(Self {
            catalog,
            replacements: config.replacements.clone(),
            extreme_moods: config.extreme_moods.iter().cloned().collect(),
            roll,
            provider_timeout: config.provider_timeout(),
            default_rationale: config.default_rationale.clone(),
            provider,
        })
    }

    pub fn catalog(&self) -> &QuestCatalog {
        &self.catalog
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn is_extreme(&self, mood_id: &str) -> bool {
        self.extreme_moods.contains(mood_id)
    }

    /// Decide which path a request takes. The probability roll is sampled
    /// even when history or mood already decided the outcome.
    pub fn route<R: Rng + ?Sized>(&self, request: &QuestRequest<'_>, rng: &mut R) -> RoutingDecision {
        let is_first_time = request.history.is_empty();
        let is_extreme = self.is_extreme(request.mood_id);
        let rolled = self.roll.sample(rng);

        if is_first_time {
            RoutingDecision::FirstTime
        } else if is_extreme {
            RoutingDecision::ExtremeMood
        } else if rolled {
            RoutingDecision::Roll
        } else {
            RoutingDecision::Catalog
        }
    }

    /// Pick a quest for this request. Never fails: provider errors and
    /// timeouts fall back to the catalog, and an exhausted catalog pool is
    /// widened back to the full category.
    pub async fn select_quest<R: Rng + Send + ?Sized>(
        &self,
        request: &QuestRequest<'_>,
        ledger: &CompletionLedger,
        rng: &mut R,
    ) -> QuestResult {
        let decision = self.route(request, rng);
        tracing::debug!(
            mood = request.mood_id,
            category = request.category.id(),
            ?decision,
            "Routing quest request"
        );

        if decision.is_generative() {
            match self.generate(request).await {
                Ok(quest) => return self.normalize(quest, rng),
                Err(e) => {
                    tracing::warn!(
                        provider = self.provider.name(),
                        "Generative quest unavailable, falling back to catalog: {}",
                        e
                    );
                }
            }
        }

        self.from_catalog(request, ledger, rng)
    }

    async fn generate(&self, request: &QuestRequest<'_>) -> Result<GeneratedQuest, ProviderError> {
        let generation = GenerationRequest {
            profile: request.profile,
            situation: request.situation,
            mood_label: request.mood_label,
            history: request.history,
            local_hour: Local::now().hour(),
        };

        match tokio::time::timeout(self.provider_timeout, self.provider.generate(&generation)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
    }

    /// Give a provider quest its origin, id and rationale.
    fn normalize<R: Rng + ?Sized>(&self, quest: GeneratedQuest, rng: &mut R) -> QuestResult {
        let origin = if quest.is_default {
            QuestOrigin::Default
        } else {
            QuestOrigin::Generative(generative_id(rng))
        };
        let rationale = quest
            .rationale
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| self.default_rationale.clone());

        QuestResult {
            origin,
            title: quest.title,
            instruction: quest.instruction,
            encouragement: quest.encouragement,
            rationale,
            tag: quest.tag,
            quest_type: quest.quest_type,
        }
    }

    fn from_catalog<R: Rng + ?Sized>(
        &self,
        request: &QuestRequest<'_>,
        ledger: &CompletionLedger,
        rng: &mut R,
    ) -> QuestResult {
        let pool = self.catalog.pool(request.category);
        let recent: FxHashSet<String> = ledger.recent().into_iter().collect();
        let available: Vec<_> = pool
            .iter()
            .copied()
            .filter(|t| !recent.contains(&t.id))
            .collect();

        let candidates = if available.is_empty() {
            tracing::debug!(
                category = request.category.id(),
                "All catalog quests recently completed, reusing the full pool"
            );
            pool
        } else {
            available
        };

        match candidates.choose(rng) {
            Some(template) => instantiate(template, &request.profile, &self.replacements, rng),
            // validated at construction; kept total for safety of the contract
            None => self.normalize(GeneratedQuest::default_quest(), rng),
        }
    }
}

fn check_replacements(catalog: &QuestCatalog, table: &ReplacementTable) -> Result<(), ConfigError> {
    let empty = catalog
        .templates()
        .iter()
        .flat_map(|t| t.instruction.placeholders())
        .find(|p| table.len_of(*p) == 0);
    match empty {
        Some(placeholder) => Err(ConfigError::EmptyReplacements(placeholder.table_field())),
        None => Ok(()),
    }
}

/// `ai_<unix millis>_<8 hex digits>`: time-ordered, random suffix.
fn generative_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "{}{}_{:08x}",
        GENERATIVE_ID_PREFIX,
        Utc::now().timestamp_millis(),
        rng.gen::<u32>()
    )
}

impl std::fmt::Debug for HybridPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridPolicy")
            .field("catalog_len", &self.catalog.len())
            .field("roll", &self.roll)
            .field("provider", &self.provider.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::OfflineProvider;
    use crate::schema::quest::FeedbackScore;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl QuestProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(
            &self,
            request: &GenerationRequest<'_>,
        ) -> Result<GeneratedQuest, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeneratedQuest {
                title: format!("Quest for {}", request.mood_label),
                instruction: "Stretch your arms up high.".to_string(),
                encouragement: "Great.".to_string(),
                tag: "Stretch".to_string(),
                quest_type: "movement".to_string(),
                rationale: None,
                is_default: false,
            })
        }
    }

    fn history(n: usize) -> Vec<HistoryEntry> {
        (0..n)
            .map(|i| HistoryEntry {
                quest_title: format!("q{}", i),
                score: FeedbackScore::Neutral,
                timestamp: Utc::now(),
                mood_category: None,
                mood_label: None,
                quest_type: None,
                quest_id: None,
            })
            .collect()
    }

    fn policy(probability: f64, provider: Box<dyn QuestProvider>) -> HybridPolicy {
        let config = EngineConfig::default().with_ai_probability(probability);
        HybridPolicy::new(&config, QuestCatalog::standard().unwrap(), provider).unwrap()
    }

    fn request<'a>(mood_id: &'a str, history: &'a [HistoryEntry]) -> QuestRequest<'a> {
        QuestRequest {
            profile: PersonalityProfile::new(true, false, true, false),
            situation: Situation::Office,
            mood_label: "I'm worn out",
            mood_id,
            category: MoodCategory::LowEnergy,
            history,
        }
    }

    #[test]
    fn routing_priorities() {
        let always = policy(1.0, Box::new(OfflineProvider));
        let never = policy(0.0, Box::new(OfflineProvider));
        let past = history(3);
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(never.route(&request("tired", &[]), &mut rng), RoutingDecision::FirstTime);
        assert_eq!(never.route(&request("anxious", &past), &mut rng), RoutingDecision::ExtremeMood);
        assert_eq!(never.route(&request("tired", &past), &mut rng), RoutingDecision::Catalog);
        assert_eq!(always.route(&request("tired", &past), &mut rng), RoutingDecision::Roll);
        // first time wins over extreme
        assert_eq!(always.route(&request("anxious", &[]), &mut rng), RoutingDecision::FirstTime);
    }

    #[test]
    fn route_consumes_one_draw_every_time() {
        let p = policy(0.5, Box::new(OfflineProvider));
        let past = history(1);
        let mut a = StdRng::seed_from_u64(11);
        let mut b = StdRng::seed_from_u64(11);
        p.route(&request("tired", &[]), &mut a);
        p.route(&request("tired", &past), &mut b);
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn invalid_probability_rejected() {
        let config = EngineConfig::default().with_ai_probability(1.5);
        let result = HybridPolicy::new(&config, QuestCatalog::standard().unwrap(), Box::new(OfflineProvider));
        assert!(matches!(result, Err(PolicyError::Config(ConfigError::Probability(_)))));
    }

    #[test]
    fn uncovered_catalog_rejected() {
        let result = HybridPolicy::new(
            &EngineConfig::default(),
            QuestCatalog::default(),
            Box::new(OfflineProvider),
        );
        assert!(matches!(result, Err(PolicyError::Catalog(CatalogError::UncoveredCategory(_)))));
    }

    #[test]
    fn empty_replacement_list_rejected() {
        let mut config = EngineConfig::default();
        config.replacements.objects.clear();
        let result = HybridPolicy::new(&config, QuestCatalog::standard().unwrap(), Box::new(OfflineProvider));
        assert!(matches!(
            result,
            Err(PolicyError::Config(ConfigError::EmptyReplacements("objects")))
        ));

        // an unused list may be empty
        let catalog = QuestCatalog::parse_ron(
            r#"[
                Quest(id: "q1", category: "any", title: "Count", instruction: "Count to [NUMBER].",
                      encouragement: "e", rationale: "r", tag: "x", quest_type: "y"),
            ]"#,
        )
        .unwrap();
        assert!(HybridPolicy::new(&config, catalog, Box::new(OfflineProvider)).is_ok());
    }

    #[tokio::test]
    async fn generative_result_is_normalized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let p = policy(0.0, Box::new(CountingProvider { calls: calls.clone() }));
        let ledger = CompletionLedger::in_memory(15);
        let mut rng = StdRng::seed_from_u64(5);

        let quest = p.select_quest(&request("tired", &[]), &ledger, &mut rng).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(quest.is_ai_generated());
        assert!(quest.id().starts_with(GENERATIVE_ID_PREFIX));
        assert_eq!(quest.title, "Quest for I'm worn out");
        assert_eq!(quest.rationale, EngineConfig::default().default_rationale);
    }

    #[tokio::test]
    async fn generative_ids_are_unique() {
        let p = policy(1.0, Box::new(CountingProvider { calls: Arc::new(AtomicUsize::new(0)) }));
        let ledger = CompletionLedger::in_memory(15);
        let mut rng = StdRng::seed_from_u64(8);
        let mut ids = FxHashSet::default();
        for _ in 0..50 {
            let quest = p.select_quest(&request("tired", &[]), &ledger, &mut rng).await;
            assert!(ids.insert(quest.id().to_string()));
        }
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_catalog() {
        let p = policy(1.0, Box::new(OfflineProvider));
        let ledger = CompletionLedger::in_memory(15);
        let mut rng = StdRng::seed_from_u64(2);

        let quest = p.select_quest(&request("lethargic", &[]), &ledger, &mut rng).await;
        assert!(!quest.is_ai_generated());
        assert!(quest.origin.is_catalog());
        let template = p.catalog().get(quest.id()).unwrap();
        assert!(template.scope.matches(MoodCategory::LowEnergy));
    }

    #[tokio::test]
    async fn ledger_excludes_recent_until_exhausted() {
        let p = policy(0.0, Box::new(OfflineProvider));
        let ledger = CompletionLedger::in_memory(15);
        for id in ["a1", "a2", "a3", "a4"] {
            ledger.mark_completed(&QuestOrigin::Catalog(id.to_string())).unwrap();
        }
        let past = history(2);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let quest = p.select_quest(&request("tired", &past), &ledger, &mut rng).await;
            assert_eq!(quest.id(), "a5");
        }

        ledger.mark_completed(&QuestOrigin::Catalog("a5".to_string())).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let quest = p.select_quest(&request("tired", &past), &ledger, &mut rng).await;
        assert!(["a1", "a2", "a3", "a4", "a5"].contains(&quest.id()));
    }

    #[tokio::test]
    async fn policy_does_not_touch_ledger() {
        let p = policy(0.0, Box::new(OfflineProvider));
        let ledger = CompletionLedger::in_memory(15);
        let past = history(2);
        let mut rng = StdRng::seed_from_u64(4);
        p.select_quest(&request("tired", &past), &ledger, &mut rng).await;
        assert!(ledger.is_empty());
    }
}
