use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::caption::describe::Describer;
use crate::caption::recaption::Recaptioner;
use crate::caption::rules::load_material_rules;
use crate::config::{Config, DEFAULT_RULES_PATH};
use crate::error::CaptionError;
use crate::llm::media::ImagePayload;
use crate::llm::types::ChatCompletionService;

/// Uniform over `i64::MIN + 1 ..= i64::MAX`.
pub fn random_seed<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    rng.gen_range(i64::MIN + 1..=i64::MAX)
}

/// Describe, then recaption, with one seed shared by both calls.
#[derive(Debug, Clone)]
pub struct Pipeline {
    describer: Describer,
    recaptioner: Recaptioner,
    rules_path: PathBuf,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new(
            Describer::default(),
            Recaptioner::default(),
            DEFAULT_RULES_PATH,
        )
    }
}

impl Pipeline {
    pub fn new(describer: Describer, recaptioner: Recaptioner, rules_path: impl AsRef<Path>) -> Self {
        Pipeline {
            describer,
            recaptioner,
            rules_path: rules_path.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Pipeline::new(
            Describer::new(&config.describe_model),
            Recaptioner::new(&config.recaption_model),
            &config.rules_path,
        )
    }

    pub async fn write_caption(
        &self,
        service: &dyn ChatCompletionService,
        image: &ImagePayload,
        seed: Option<i64>,
    ) -> Result<String, CaptionError> {
        self.write_caption_with_rng(service, image, seed, &mut StdRng::from_entropy())
            .await
    }

    pub async fn write_caption_with_rng<R: Rng + ?Sized>(
        &self,
        service: &dyn ChatCompletionService,
        image: &ImagePayload,
        seed: Option<i64>,
        rng: &mut R,
    ) -> Result<String, CaptionError> {
        let seed = seed.unwrap_or_else(|| random_seed(rng));
        self.write_caption_seeded(service, image, seed).await
    }

    pub async fn write_caption_seeded(
        &self,
        service: &dyn ChatCompletionService,
        image: &ImagePayload,
        seed: i64,
    ) -> Result<String, CaptionError> {
        // Rules are loaded first so a missing file costs no remote calls.
        let rules = load_material_rules(&self.rules_path)?;
        info!(
            "Writing caption seed={} describe_model={} recaption_model={}",
            seed,
            self.describer.model(),
            self.recaptioner.model()
        );

        let description = self.describer.describe(service, image, seed).await?;
        let caption = self
            .recaptioner
            .recaption(service, &description, &rules, seed)
            .await?;
        Ok(caption)
    }
}
