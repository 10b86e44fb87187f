use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

use super::prompts::codegen_prompt;
use super::types::{CodeBatch, Tier};
use crate::dataset::DatasetProfile;
use crate::error::{DataStoryError, Result};
use crate::llm::{parse_json_reply, strip_code_fence, ModelRequest, SharedModel};

const STAGE: &str = "code generation";

#[derive(Debug, Deserialize)]
struct CodeReply {
    codes: Vec<String>,
    #[serde(default)]
    csv_path: Option<String>,
}

/// Turns one tier's descriptions into chart code
pub struct CodeGenerator {
    model: SharedModel,
}

impl CodeGenerator {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    /// Generate one snippet per description with a single model call.
    ///
    /// Surplus snippets are truncated and a short reply is kept as-is.
    /// Empty input skips the model entirely.
    pub async fn generate(
        &self,
        tier: Tier,
        descriptions: &[String],
        profile: &DatasetProfile,
        csv_path: &Path,
        theme_directive: &str,
    ) -> Result<CodeBatch> {
        if descriptions.is_empty() {
            debug!("No {} descriptions, skipping code generation", tier);
            return Ok(CodeBatch {
                tier,
                codes: Vec::new(),
                csv_path: csv_path.to_path_buf(),
            });
        }

        let prompt = codegen_prompt(tier, descriptions, profile, csv_path, theme_directive);
        let reply = self.model.invoke(ModelRequest::text(prompt)).await?;

        let parsed: CodeReply = parse_json_reply(&reply).map_err(|e| {
            DataStoryError::stage(STAGE, format!("unparseable {} reply: {}", tier, e))
        })?;

        if let Some(echoed) = parsed.csv_path.as_deref() {
            if Path::new(echoed) != csv_path {
                debug!("Model echoed csv path {:?}, keeping {:?}", echoed, csv_path);
            }
        }

        let mut codes: Vec<String> = parsed.codes.iter().map(|c| strip_code_fence(c)).collect();

        if codes.len() < descriptions.len() {
            warn!(
                "Model returned {} {} snippets for {} descriptions",
                codes.len(),
                tier,
                descriptions.len()
            );
        }
        codes.truncate(descriptions.len());

        info!("Generated {} {} snippets", codes.len(), tier);

        Ok(CodeBatch {
            tier,
            codes,
            csv_path: csv_path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::extract_profile;
    use crate::llm::{LanguageModel, ModelError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    /// Replies with a fixed snippet list
    struct CannedModel {
        codes: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn invoke(
            &self,
            _request: ModelRequest,
        ) -> std::result::Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "codes": self.codes, "csv_path": "elsewhere.csv" }).to_string())
        }
    }

    fn generator(codes: Vec<&'static str>) -> (CodeGenerator, Arc<CannedModel>) {
        let model = Arc::new(CannedModel {
            codes,
            calls: AtomicUsize::new(0),
        });
        (CodeGenerator::new(model.clone()), model)
    }

    fn descriptions(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("analysis {}", i)).collect()
    }

    fn dataset() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"city,sales\nParis,3\nLyon,5\n").unwrap();
        file
    }

    #[tokio::test]
    async fn test_short_reply_is_kept() {
        let file = dataset();
        let profile = extract_profile(file.path(), false).unwrap();
        let (generator, _) = generator(vec!["fig = px.bar(data)", "fig = px.pie(data)"]);

        let batch = generator
            .generate(Tier::Simple, &descriptions(3), &profile, file.path(), "light")
            .await
            .unwrap();

        assert_eq!(batch.codes.len(), 2);
        assert_eq!(batch.csv_path, file.path());
    }

    #[tokio::test]
    async fn test_surplus_snippets_are_truncated() {
        let file = dataset();
        let profile = extract_profile(file.path(), false).unwrap();
        let (generator, _) = generator(vec!["```python\nfig = 1\n```", "fig = 2", "fig = 3"]);

        let batch = generator
            .generate(Tier::Advanced, &descriptions(2), &profile, file.path(), "dark")
            .await
            .unwrap();

        assert_eq!(batch.codes, vec!["fig = 1".to_string(), "fig = 2".to_string()]);
    }

    #[tokio::test]
    async fn test_no_descriptions_skips_the_model() {
        let file = dataset();
        let profile = extract_profile(file.path(), false).unwrap();
        let (generator, model) = generator(vec!["fig = 1"]);

        let batch = generator
            .generate(Tier::Intermediate, &[], &profile, file.path(), "light")
            .await
            .unwrap();

        assert!(batch.codes.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }
}
