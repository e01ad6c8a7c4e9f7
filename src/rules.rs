//! # Decision Rules
//!
//! Underwriting appetite rules evaluated by the decision stage. Each rule
//! answers one question about a submission and either fires with an outcome
//! or stays silent; the stage applies the first outcome in list order.
//!
//! The bundled rules are examples of the shape such rules take. Their
//! thresholds come from configuration ([`RulesConfig`]), never from constants.

use crate::config::RulesConfig;
use crate::models::SubmissionContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// What a fired rule wants done with the submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Terminal: decline and stop processing
    Reject,
    /// Annotate for a human underwriter and keep processing
    FlagForReview,
}

/// Result of a rule that fired
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub disposition: Disposition,
    pub reason: String,
}

impl RuleOutcome {
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            disposition: Disposition::Reject,
            reason: reason.into(),
        }
    }

    pub fn flag_for_review(reason: impl Into<String>) -> Self {
        Self {
            disposition: Disposition::FlagForReview,
            reason: reason.into(),
        }
    }
}

/// A single business rule
pub trait DecisionRule: Send + Sync + fmt::Debug {
    /// Rule name for logging
    fn name(&self) -> &str;

    /// `Some` if the rule fires for this submission, `None` otherwise
    fn evaluate(&self, ctx: &SubmissionContext) -> Option<RuleOutcome>;
}

/// Ordered rule list handed to the decision stage
pub type RuleSet = Vec<Arc<dyn DecisionRule>>;

/// Build the bundled rules enabled in configuration, cheapest check first
pub fn rules_from_config(config: &RulesConfig) -> RuleSet {
    let mut rules: RuleSet = Vec::new();

    if let Some(appetite) = &config.revenue_appetite {
        rules.push(Arc::new(RevenueAppetiteRule::new(appetite.min, appetite.max)));
    }
    if !config.excluded_industries.is_empty() {
        rules.push(Arc::new(ExcludedIndustryRule::new(
            config.excluded_industries.iter().cloned(),
        )));
    }
    if let Some(review) = &config.regional_review {
        rules.push(Arc::new(RegionalReviewRule::new(
            review.industry.clone(),
            review.states.iter().cloned(),
        )));
    }

    rules
}

/// Declines submissions whose revenue is outside the appetite range
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueAppetiteRule {
    min_revenue: f64,
    max_revenue: f64,
}

impl RevenueAppetiteRule {
    pub fn new(min_revenue: f64, max_revenue: f64) -> Self {
        Self {
            min_revenue,
            max_revenue,
        }
    }
}

impl DecisionRule for RevenueAppetiteRule {
    fn name(&self) -> &str {
        "revenue_appetite"
    }

    fn evaluate(&self, ctx: &SubmissionContext) -> Option<RuleOutcome> {
        let revenue = ctx.payload().get("revenue").and_then(parse_amount)?;

        if revenue > self.max_revenue {
            return Some(RuleOutcome::reject(format!(
                "Revenue ${revenue:.0} exceeds the maximum appetite of ${:.0}.",
                self.max_revenue
            )));
        }
        if revenue < self.min_revenue {
            return Some(RuleOutcome::reject(format!(
                "Revenue ${revenue:.0} is below the minimum appetite of ${:.0}.",
                self.min_revenue
            )));
        }
        None
    }
}

/// Declines industries outside appetite (case-insensitive match)
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedIndustryRule {
    industries: BTreeSet<String>,
}

impl ExcludedIndustryRule {
    pub fn new<I, S>(industries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            industries: industries
                .into_iter()
                .map(|industry| normalize(industry.as_ref()))
                .collect(),
        }
    }
}

impl DecisionRule for ExcludedIndustryRule {
    fn name(&self) -> &str {
        "excluded_industry"
    }

    fn evaluate(&self, ctx: &SubmissionContext) -> Option<RuleOutcome> {
        let industry = ctx.payload().text_field("industry")?;
        self.industries
            .contains(&normalize(&industry))
            .then(|| RuleOutcome::reject(format!("Industry '{}' is outside our appetite.", industry.trim())))
    }
}

/// Flags an industry for manual review in specific states
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalReviewRule {
    industry: String,
    states: BTreeSet<String>,
}

impl RegionalReviewRule {
    pub fn new<I, S>(industry: impl AsRef<str>, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            industry: normalize(industry.as_ref()),
            states: states
                .into_iter()
                .map(|state| normalize(state.as_ref()))
                .collect(),
        }
    }
}

impl DecisionRule for RegionalReviewRule {
    fn name(&self) -> &str {
        "regional_review"
    }

    fn evaluate(&self, ctx: &SubmissionContext) -> Option<RuleOutcome> {
        let industry = normalize(&ctx.payload().text_field("industry")?);
        let state = normalize(&ctx.payload().text_field("state")?);

        (industry == self.industry && self.states.contains(&state)).then(|| {
            RuleOutcome::flag_for_review(format!(
                "{} submissions in {} require manual review.",
                ctx.payload().text_field("industry").unwrap_or_default().trim(),
                state
            ))
        })
    }
}

/// Parse a monetary amount from a number or a string like `"$1,000,000"`
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
                .collect();
            cleaned.parse().ok()
        }
        _ => None,
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RegionalReviewConfig, RevenueAppetiteConfig};
    use crate::models::RequestPayload;
    use serde_json::json;

    fn ctx(value: Value) -> SubmissionContext {
        SubmissionContext::new(RequestPayload::from_value(value).unwrap())
    }

    #[test]
    fn test_parse_amount_accepts_dirty_strings() {
        assert_eq!(parse_amount(&json!("$1,000,000")), Some(1_000_000.0));
        assert_eq!(parse_amount(&json!(" 2500 ")), Some(2500.0));
        assert_eq!(parse_amount(&json!(42)), Some(42.0));
        assert_eq!(parse_amount(&json!("lots")), None);
        assert_eq!(parse_amount(&json!(null)), None);
    }

    #[test]
    fn test_revenue_rule_bounds() {
        let rule = RevenueAppetiteRule::new(10_000.0, 500_000_000.0);

        let too_big = rule.evaluate(&ctx(json!({"revenue": "$600,000,000"}))).unwrap();
        assert_eq!(too_big.disposition, Disposition::Reject);
        assert!(too_big.reason.contains("exceeds"));

        let too_small = rule.evaluate(&ctx(json!({"revenue": 500}))).unwrap();
        assert!(too_small.reason.contains("below"));

        assert!(rule.evaluate(&ctx(json!({"revenue": 5_000_000}))).is_none());
        assert!(rule.evaluate(&ctx(json!({"revenue": "n/a"}))).is_none());
    }

    #[test]
    fn test_excluded_industry_is_case_insensitive() {
        let rule = ExcludedIndustryRule::new(["Gambling", "Tobacco"]);
        let outcome = rule.evaluate(&ctx(json!({"industry": " gambling "}))).unwrap();
        assert_eq!(outcome.disposition, Disposition::Reject);
        assert!(rule.evaluate(&ctx(json!({"industry": "Retail"}))).is_none());
    }

    #[test]
    fn test_regional_review_flags() {
        let rule = RegionalReviewRule::new("Construction", ["NY", "New York"]);

        let outcome = rule
            .evaluate(&ctx(json!({"industry": "construction", "state": "ny"})))
            .unwrap();
        assert_eq!(outcome.disposition, Disposition::FlagForReview);

        assert!(rule
            .evaluate(&ctx(json!({"industry": "Construction", "state": "CA"})))
            .is_none());
    }

    #[test]
    fn test_rules_from_config_preserves_order() {
        let config = RulesConfig {
            revenue_appetite: Some(RevenueAppetiteConfig {
                min: 10_000.0,
                max: 500_000_000.0,
            }),
            excluded_industries: vec!["Gambling".to_string()],
            regional_review: Some(RegionalReviewConfig {
                industry: "Construction".to_string(),
                states: vec!["NY".to_string()],
            }),
        };

        let names: Vec<String> = rules_from_config(&config)
            .iter()
            .map(|rule| rule.name().to_string())
            .collect();
        assert_eq!(names, ["revenue_appetite", "excluded_industry", "regional_review"]);

        assert!(rules_from_config(&RulesConfig::default()).is_empty());
    }
}
