//! Draft generation with timeout and fallback.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use careplan_db::models::Patient;

use super::client::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiClient, GenerationError, TextGenerator,
    UnavailableGenerator,
};
use super::parser::{ParsedDraft, parse_draft};
use super::prompt::build_prompt;
use super::{Assessment, DraftOrigin, DraftOutcome, fallback_content};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const API_KEY_ENV: &str = "CAREPLAN_GEMINI_API_KEY";
pub const MODEL_ENV: &str = "CAREPLAN_GEMINI_MODEL";
pub const BASE_URL_ENV: &str = "CAREPLAN_GEMINI_BASE_URL";
pub const TIMEOUT_ENV: &str = "CAREPLAN_GENERATION_TIMEOUT_SECS";

/// Settings for the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// `None` disables the service; every draft is then the fallback.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_owned(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GeneratorConfig {
    /// Read from the environment. Blank values count as unset; an
    /// unparseable timeout is logged and replaced by the default.
    pub fn from_env() -> Self {
        let lookup = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let timeout = match lookup(TIMEOUT_ENV) {
            Some(raw) => parse_timeout(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "invalid {TIMEOUT_ENV}; using default");
                DEFAULT_TIMEOUT
            }),
            None => DEFAULT_TIMEOUT,
        };

        Self {
            api_key: lookup(API_KEY_ENV),
            model: lookup(MODEL_ENV).unwrap_or(defaults.model),
            base_url: lookup(BASE_URL_ENV).unwrap_or(defaults.base_url),
            timeout,
        }
    }

    /// The text generator these settings describe.
    pub fn build_client(&self) -> Arc<dyn TextGenerator> {
        match &self.api_key {
            Some(key) => Arc::new(GeminiClient::with_base_url(
                &self.base_url,
                key.clone(),
                self.model.clone(),
            )),
            None => Arc::new(UnavailableGenerator),
        }
    }
}

/// Positive whole seconds.
pub fn parse_timeout(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Produces draft content for the wizard. One service call per
/// [`DraftGenerator::generate`], no retry.
#[derive(Clone)]
pub struct DraftGenerator {
    client: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl DraftGenerator {
    pub fn new(client: Arc<dyn TextGenerator>) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.build_client()).with_timeout(config.timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate and parse, surfacing every failure. A timeout is reported
    /// as [`GenerationError::Timeout`].
    pub async fn try_generate(
        &self,
        patient: &Patient,
        assessment: &Assessment,
        today: NaiveDate,
    ) -> Result<ParsedDraft, GenerationError> {
        let prompt = build_prompt(patient, assessment, today);
        let text = tokio::time::timeout(self.timeout, self.client.generate(&prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;
        Ok(parse_draft(&text)?)
    }

    /// Generate draft content. Never fails: any error yields
    /// [`fallback_content`].
    pub async fn generate(&self, patient: &Patient, assessment: &Assessment) -> DraftOutcome {
        let today = Utc::now().date_naive();
        match self.try_generate(patient, assessment, today).await {
            Ok(parsed) => {
                info!(
                    patient_id = %patient.id,
                    generator = self.client.name(),
                    stage = ?parsed.stage,
                    "draft generated"
                );
                DraftOutcome {
                    content: parsed.content,
                    origin: DraftOrigin::Parsed(parsed.stage),
                }
            }
            Err(e) => {
                warn!(
                    patient_id = %patient.id,
                    generator = self.client.name(),
                    error = %e,
                    "draft generation failed; using fallback content"
                );
                DraftOutcome {
                    content: fallback_content(),
                    origin: DraftOrigin::Fallback,
                }
            }
        }
    }
}
