// Data contracts passed between pipeline stages
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Difficulty tier of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Simple,
    Intermediate,
    Advanced,
}

impl Tier {
    /// Tiers in report order
    pub const ALL: [Tier; 3] = [Tier::Simple, Tier::Intermediate, Tier::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Simple => "simple",
            Tier::Intermediate => "intermediate",
            Tier::Advanced => "advanced",
        }
    }

    /// Section heading used in the report
    pub fn section_label(&self) -> &'static str {
        match self {
            Tier::Simple => "Simple Analysis",
            Tier::Intermediate => "Intermediate Analysis",
            Tier::Advanced => "Advanced Analysis",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural-language analysis descriptions for each tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub simple: Vec<String>,
    pub intermediate: Vec<String>,
    pub advanced: Vec<String>,
}

impl RecommendationSet {
    pub fn tier(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::Simple => &self.simple,
            Tier::Intermediate => &self.intermediate,
            Tier::Advanced => &self.advanced,
        }
    }

    pub fn total(&self) -> usize {
        self.simple.len() + self.intermediate.len() + self.advanced.len()
    }
}

/// Generated chart code for one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBatch {
    pub tier: Tier,
    pub codes: Vec<String>,
    pub csv_path: PathBuf,
}

/// A snippet with the narrative produced from its chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInsightPair {
    pub code: String,
    pub insights: String,
}

/// Narrated snippets of one tier, in batch order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredInsights {
    pub tier: Tier,
    pub items: Vec<CodeInsightPair>,
}

impl TieredInsights {
    pub fn empty(tier: Tier) -> Self {
        Self {
            tier,
            items: Vec::new(),
        }
    }

    /// Append a pair, ignoring it when the insight is blank
    pub fn push(&mut self, pair: CodeInsightPair) -> bool {
        if pair.insights.trim().is_empty() {
            return false;
        }
        self.items.push(pair);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Everything the report renderer consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReportData {
    pub simple: TieredInsights,
    pub intermediate: TieredInsights,
    pub advanced: TieredInsights,
}

impl FullReportData {
    /// Combine the three tiers
    pub fn assemble(
        simple: TieredInsights,
        intermediate: TieredInsights,
        advanced: TieredInsights,
    ) -> Self {
        Self {
            simple,
            intermediate,
            advanced,
        }
    }

    /// Entries in report order: tier by tier, batch order within a tier
    pub fn entries(&self) -> impl Iterator<Item = (Tier, &CodeInsightPair)> {
        [
            (Tier::Simple, &self.simple),
            (Tier::Intermediate, &self.intermediate),
            (Tier::Advanced, &self.advanced),
        ]
        .into_iter()
        .flat_map(|(tier, insights)| insights.items.iter().map(move |item| (tier, item)))
    }

    pub fn len(&self) -> usize {
        self.simple.len() + self.intermediate.len() + self.advanced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(code: &str) -> CodeInsightPair {
        CodeInsightPair {
            code: code.to_string(),
            insights: format!("insight for {}", code),
        }
    }

    #[test]
    fn test_blank_insights_are_rejected() {
        let mut tier = TieredInsights::empty(Tier::Simple);
        assert!(tier.push(pair("a")));
        assert!(!tier.push(CodeInsightPair {
            code: "b".to_string(),
            insights: "  \n".to_string(),
        }));
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn test_entries_follow_tier_then_batch_order() {
        let mut simple = TieredInsights::empty(Tier::Simple);
        simple.push(pair("s1"));
        simple.push(pair("s2"));
        let intermediate = TieredInsights::empty(Tier::Intermediate);
        let mut advanced = TieredInsights::empty(Tier::Advanced);
        advanced.push(pair("a1"));

        let data = FullReportData::assemble(simple, intermediate, advanced);
        let order: Vec<_> = data
            .entries()
            .map(|(tier, item)| (tier, item.code.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![
                (Tier::Simple, "s1"),
                (Tier::Simple, "s2"),
                (Tier::Advanced, "a1")
            ]
        );
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&Tier::Intermediate).unwrap(), "\"intermediate\"");
        assert_eq!(Tier::Advanced.section_label(), "Advanced Analysis");
    }
}
