use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{CodeInsightPair, Tier, TieredInsights};
use crate::config::InsightsConfig;
use crate::llm::{ModelRequest, SharedModel};
use crate::sandbox::RenderedFigure;

/// Pacing and retry settings for narration calls
#[derive(Debug, Clone)]
pub struct NarrationPolicy {
    pub prompt: String,
    /// Wait before every figure's first call
    pub pacing_delay: Duration,
    pub retry_enabled: bool,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl NarrationPolicy {
    pub fn from_config(config: &InsightsConfig) -> Self {
        Self {
            prompt: config.prompt.clone(),
            pacing_delay: config.pacing_delay(),
            retry_enabled: config.retry_enabled,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }

    /// Total calls allowed for one figure
    pub fn max_attempts(&self) -> u32 {
        if self.retry_enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }
}

/// Narrates chart images with the multimodal model
pub struct Narrator {
    model: SharedModel,
    policy: NarrationPolicy,
}

impl Narrator {
    pub fn new(model: SharedModel, policy: NarrationPolicy) -> Self {
        Self { model, policy }
    }

    /// Narrate one figure. A failure after the retry budget yields an empty
    /// insight rather than an error.
    pub async fn narrate(&self, figure: &RenderedFigure) -> CodeInsightPair {
        tokio::time::sleep(self.policy.pacing_delay).await;

        let request = ModelRequest::with_image(&self.policy.prompt, &figure.image_base64);
        let attempts = self.policy.max_attempts();
        let mut insights = String::new();

        for attempt in 1..=attempts {
            match self.model.invoke(request.clone()).await {
                Ok(text) => {
                    insights = text.trim().to_string();
                    break;
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Narration attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, attempts, e, self.policy.retry_delay
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => {
                    warn!("Narration failed after {} attempt(s): {}", attempt, e);
                }
            }
        }

        CodeInsightPair {
            code: figure.code.clone(),
            insights,
        }
    }

    /// Narrate a tier's figures in order, dropping those without an insight
    pub async fn narrate_batch(&self, tier: Tier, figures: &[RenderedFigure]) -> TieredInsights {
        let mut result = TieredInsights::empty(tier);

        for (i, figure) in figures.iter().enumerate() {
            if figure.diagnostic {
                warn!(
                    "Skipping {} figure {}: {}",
                    tier,
                    i + 1,
                    figure.diagnostic_message().unwrap_or_default()
                );
                continue;
            }

            let pair = self.narrate(figure).await;
            if result.push(pair) {
                debug!("Narrated {} figure {}", tier, i + 1);
            } else {
                warn!("Dropping {} figure {}: no insight", tier, i + 1);
            }
        }

        info!(
            "Narrated {}/{} {} figures",
            result.len(),
            figures.len(),
            tier
        );
        result
    }
}
