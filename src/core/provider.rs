/// Generative quest provider contract and the provider-level fallback layer.

use async_trait::async_trait;
use thiserror::Error;

use crate::schema::profile::{PersonalityProfile, Situation};
use crate::schema::quest::HistoryEntry;

/// Why a provider could not produce a quest. Every variant is recoverable.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API credential configured")]
    MissingCredential,
    #[error("authentication failed")]
    Unauthorized,
    #[error("HTTP request failed: {0}")]
    Network(String),
    #[error("rate limited")]
    RateLimited,
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed provider output: {0}")]
    Malformed(String),
    #[error("provider timed out")]
    Timeout,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Everything a provider may use to personalise a quest.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub profile: PersonalityProfile,
    pub situation: Situation,
    pub mood_label: &'a str,
    pub history: &'a [HistoryEntry],
    /// Local hour of day, 0..=23.
    pub local_hour: u32,
}

/// Theme for the time of day the quest is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeTheme {
    Energize,
    SensoryRefresh,
    Unwind,
    Stillness,
}

impl TimeTheme {
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            5..=10 => Self::Energize,
            11..=17 => Self::SensoryRefresh,
            18..=21 => Self::Unwind,
            _ => Self::Stillness,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Energize => "energising and affirming",
            Self::SensoryRefresh => "a sensory refresh",
            Self::Unwind => "relaxing and reflective",
            Self::Stillness => "stillness and emptying the mind",
        }
    }
}

/// A quest produced by a provider. It carries no identifier; the selection
/// policy assigns one.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuest {
    pub title: String,
    pub instruction: String,
    pub encouragement: String,
    pub tag: String,
    pub quest_type: String,
    pub rationale: Option<String>,
    /// True for the built-in quest a provider falls back to.
    pub is_default: bool,
}

impl GeneratedQuest {
    /// The designated quest returned when generation fails.
    pub fn default_quest() -> Self {
        Self {
            title: "Light breathing".to_string(),
            instruction: "Take 3 big, deep breaths.".to_string(),
            encouragement: "Good. You're doing well.".to_string(),
            tag: "Refresh".to_string(),
            quest_type: "breathing".to_string(),
            rationale: Some(
                "Deep breathing immediately engages the parasympathetic nervous system and brings calm."
                    .to_string(),
            ),
            is_default: true,
        }
    }
}

#[async_trait]
pub trait QuestProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest<'_>)
        -> Result<GeneratedQuest, ProviderError>;
}

/// Provider used when no generative backend is configured. Always fails
/// with `MissingCredential`, so the policy serves catalog quests.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

#[async_trait]
impl QuestProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(
        &self,
        _request: &GenerationRequest<'_>,
    ) -> Result<GeneratedQuest, ProviderError> {
        Err(ProviderError::MissingCredential)
    }
}

/// Wraps a provider so that failures turn into the default quest instead of
/// an error.
///
/// The selection policy also recovers from provider errors on its own, by
/// falling back to the catalog. With this wrapper in place the user gets the
/// default breathing quest instead.
#[derive(Debug, Clone)]
pub struct DefaultingProvider<P> {
    inner: P,
}

impl<P: QuestProvider> DefaultingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: QuestProvider> QuestProvider for DefaultingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedQuest, ProviderError> {
        match self.inner.generate(request).await {
            Ok(quest) => Ok(quest),
            Err(e) => {
                tracing::warn!(
                    provider = self.inner.name(),
                    "Quest generation failed, using default quest: {}",
                    e
                );
                Ok(GeneratedQuest::default_quest())
            }
        }
    }
}
