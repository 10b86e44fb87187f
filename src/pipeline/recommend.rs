use tracing::{debug, info, warn};

use super::prompts::recommendation_prompt;
use super::types::{RecommendationSet, Tier};
use crate::dataset::DatasetProfile;
use crate::error::{DataStoryError, Result};
use crate::llm::{parse_json_reply, ModelRequest, SharedModel};

const STAGE: &str = "recommendation";

/// Asks the text model for tiered analysis descriptions
pub struct Recommender {
    model: SharedModel,
}

impl Recommender {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    /// Number of descriptions requested per tier; the remainder of `total / 3` is dropped
    pub fn per_tier(total: usize) -> usize {
        total / 3
    }

    /// Request `total / 3` descriptions per tier.
    ///
    /// Model failures propagate as `Model` errors with no retry; a reply that
    /// does not match the expected shape is a `StageValidation` error.
    pub async fn recommend(
        &self,
        profile: &DatasetProfile,
        total: usize,
    ) -> Result<RecommendationSet> {
        let per_tier = Self::per_tier(total);
        if per_tier == 0 {
            warn!(
                "Target analysis count {} is below one per tier; nothing to recommend",
                total
            );
            return Ok(RecommendationSet::default());
        }

        let prompt = recommendation_prompt(&profile.to_prompt_json()?, per_tier);
        let reply = self.model.invoke(ModelRequest::text(prompt)).await?;

        let mut set: RecommendationSet = parse_json_reply(&reply)
            .map_err(|e| DataStoryError::stage(STAGE, format!("unparseable reply: {}", e)))?;

        for tier in Tier::ALL {
            let descriptions = match tier {
                Tier::Simple => &mut set.simple,
                Tier::Intermediate => &mut set.intermediate,
                Tier::Advanced => &mut set.advanced,
            };

            descriptions.retain(|d| !d.trim().is_empty());
            if descriptions.len() > per_tier {
                debug!(
                    "Truncating {} recommendations from {} to {}",
                    tier,
                    descriptions.len(),
                    per_tier
                );
                descriptions.truncate(per_tier);
            } else if descriptions.len() < per_tier {
                warn!(
                    "Model returned {} {} recommendations, {} requested",
                    descriptions.len(),
                    tier,
                    per_tier
                );
            }
        }

        if set.total() == 0 {
            return Err(DataStoryError::stage(STAGE, "reply contains no recommendations"));
        }

        info!(
            "Received {} recommendations ({} / {} / {})",
            set.total(),
            set.simple.len(),
            set.intermediate.len(),
            set.advanced.len()
        );

        Ok(set)
    }
}
