use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use monetra_core::repository::{OfferRepository, RepoError};
use monetra_core::Offer;

use crate::rules::{ComplianceRule, RuleAction, RuleConditions, RuleRepository, RuleType, Severity};

#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    #[error("offer {0} not found")]
    OfferNotFound(Uuid),
    #[error("storage failure: {0}")]
    Storage(#[from] RepoError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub rule_type: RuleType,
    pub severity: Severity,
    pub action: RuleAction,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub offer_id: Uuid,
    /// False iff any violation carries High or Critical severity.
    pub is_compliant: bool,
    pub violations: Vec<Violation>,
    pub required_disclosures: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub offer_id: Uuid,
    pub changed: bool,
    pub applied: Vec<String>,
}

/// Evaluates the active rule set against offers and applies deterministic
/// remediations for modify-action violations.
pub struct ComplianceEngine {
    offers: Arc<dyn OfferRepository>,
    rules: Arc<dyn RuleRepository>,
}

impl ComplianceEngine {
    pub fn new(offers: Arc<dyn OfferRepository>, rules: Arc<dyn RuleRepository>) -> Self {
        Self { offers, rules }
    }

    pub async fn check_offer(&self, offer_id: Uuid) -> Result<ComplianceReport, ComplianceError> {
        let offer = self
            .offers
            .get_offer(offer_id)
            .await?
            .ok_or(ComplianceError::OfferNotFound(offer_id))?;
        let rules = self.rules.list_active_rules().await?;
        Ok(Self::evaluate(&offer, &rules))
    }

    /// Pure rule evaluation. Inactive rules are skipped.
    pub fn evaluate(offer: &Offer, rules: &[ComplianceRule]) -> ComplianceReport {
        let mut violations = Vec::new();
        let mut required_disclosures = Vec::new();
        let mut recommended_actions = Vec::new();

        for rule in rules.iter().filter(|r| r.is_active) {
            for message in condition_failures(offer, &rule.conditions) {
                match rule.action {
                    RuleAction::RequireDisclosure => {
                        let text = rule
                            .conditions
                            .disclosure_text
                            .clone()
                            .unwrap_or_else(|| "Affiliate disclosure required.".to_string());
                        if !required_disclosures.contains(&text) {
                            required_disclosures.push(text);
                        }
                    }
                    RuleAction::Modify => recommended_actions.push(message.clone()),
                    RuleAction::Block | RuleAction::Flag => {}
                }
                violations.push(Violation {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    rule_type: rule.rule_type,
                    severity: rule.severity,
                    action: rule.action,
                    message,
                });
            }
        }

        let is_compliant = !violations.iter().any(|v| v.severity >= Severity::High);
        ComplianceReport {
            offer_id: offer.id,
            is_compliant,
            violations,
            required_disclosures,
            recommended_actions,
            checked_at: Utc::now(),
        }
    }

    /// Apply deterministic fixes for modify-action violations and persist
    /// them. Re-running on an already-fixed offer is a no-op.
    pub async fn auto_fix(&self, offer_id: Uuid) -> Result<FixReport, ComplianceError> {
        let offer = self
            .offers
            .get_offer(offer_id)
            .await?
            .ok_or(ComplianceError::OfferNotFound(offer_id))?;
        let rules = self.rules.list_active_rules().await?;

        let (title, price, applied) = plan_remediation(&offer, &rules);
        if title.is_none() && price.is_none() {
            return Ok(FixReport {
                offer_id,
                changed: false,
                applied: Vec::new(),
            });
        }

        self.offers
            .apply_remediation(offer_id, title, price)
            .await?;
        info!(offer_id = %offer_id, fixes = applied.len(), "applied compliance remediation");
        Ok(FixReport {
            offer_id,
            changed: true,
            applied,
        })
    }
}

fn condition_failures(offer: &Offer, conditions: &RuleConditions) -> Vec<String> {
    let mut failures = Vec::new();

    if let Some(keywords) = &conditions.prohibited_keywords {
        let haystack = format!(
            "{} {}",
            offer.title.to_lowercase(),
            offer.description.as_deref().unwrap_or("").to_lowercase()
        );
        for keyword in keywords {
            if haystack.contains(&keyword.to_lowercase()) {
                failures.push(format!("contains prohibited keyword '{keyword}'"));
            }
        }
    }

    if let Some(max) = conditions.max_title_length {
        let len = offer.title.chars().count();
        if len > max {
            failures.push(format!("title length {len} exceeds maximum {max}"));
        }
    }

    if conditions.require_disclaimer == Some(true) && offer.disclaimer.is_none() {
        failures.push("offer is missing an affiliate disclaimer".to_string());
    }

    if let Some(blacklist) = &conditions.blacklisted_merchants {
        if let Some(merchant) = &offer.merchant {
            if blacklist.iter().any(|m| m.eq_ignore_ascii_case(merchant)) {
                failures.push(format!("merchant '{merchant}' is blacklisted"));
            }
        }
    }

    if let Some(regions) = &conditions.restricted_regions {
        if let Some(region) = &offer.region {
            if regions.iter().any(|r| r.eq_ignore_ascii_case(region)) {
                failures.push(format!("offer is restricted in region '{region}'"));
            }
        }
    }

    if let Some(currencies) = &conditions.allowed_currencies {
        if !currencies
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&offer.currency))
        {
            failures.push(format!("currency '{}' is not permitted", offer.currency));
        }
    }

    if let Some(min) = conditions.min_price {
        if let Some(price) = offer.price {
            if price < min {
                failures.push(format!("price {price:.2} is below minimum {min:.2}"));
            }
        }
    }

    if let Some(max) = conditions.max_discount_percent {
        if let Some(discount) = discount_percent(offer) {
            if discount > max {
                failures.push(format!(
                    "discount {discount:.1}% exceeds maximum {max:.1}%"
                ));
            }
        }
    }

    if conditions.require_price_comparison == Some(true) && offer.old_price.is_none() {
        failures.push("offer has no comparison price".to_string());
    }

    if let Some(categories) = &conditions.prohibited_categories {
        if let Some(category) = &offer.category {
            if categories.iter().any(|c| c.eq_ignore_ascii_case(category)) {
                failures.push(format!("category '{category}' is prohibited"));
            }
        }
    }

    failures
}

fn discount_percent(offer: &Offer) -> Option<f64> {
    match (offer.old_price, offer.price) {
        (Some(old), Some(current)) if old > 0.0 && current < old => {
            Some((old - current) / old * 100.0)
        }
        _ => None,
    }
}

/// Compute the field changes modify-action rules call for. Returns the new
/// title and price (None when no change is needed) plus a description of
/// each applied fix.
fn plan_remediation(
    offer: &Offer,
    rules: &[ComplianceRule],
) -> (Option<String>, Option<f64>, Vec<String>) {
    let mut title = None;
    let mut price = None;
    let mut applied = Vec::new();

    for rule in rules
        .iter()
        .filter(|r| r.is_active && r.action == RuleAction::Modify)
    {
        if let Some(max) = rule.conditions.max_title_length {
            if offer.title.chars().count() > max {
                title = Some(offer.title.chars().take(max).collect::<String>());
                applied.push(format!("truncated title to {max} characters"));
            }
        }

        if let Some(max) = rule.conditions.max_discount_percent {
            if let (Some(old), Some(discount)) = (offer.old_price, discount_percent(offer)) {
                if discount > max {
                    let floor = round2(old * (1.0 - max / 100.0));
                    if price.map_or(true, |p: f64| floor > p) {
                        price = Some(floor);
                    }
                    applied.push(format!("raised price to {floor:.2} to cap discount at {max:.1}%"));
                }
            }
        }

        if let Some(min) = rule.conditions.min_price {
            if let Some(current) = offer.price {
                if current < min {
                    if price.map_or(true, |p: f64| min > p) {
                        price = Some(min);
                    }
                    applied.push(format!("raised price to minimum {min:.2}"));
                }
            }
        }
    }

    (title, price, applied)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_rules;
    use async_trait::async_trait;
    use monetra_core::repository::UpsertOutcome;
    use std::sync::Mutex;

    fn offer() -> Offer {
        let mut o = Offer::new(
            Uuid::new_v4(),
            "ergonomic-chair".to_string(),
            "Ergonomic Chair".to_string(),
            "https://merchant.example/chair".to_string(),
        );
        o.price = Some(100.0);
        o
    }

    #[test]
    fn prohibited_keyword_blocks_compliance() {
        let mut o = offer();
        o.title = "Guaranteed weight loss".to_string();
        let report = ComplianceEngine::evaluate(&o, &default_rules());
        assert!(!report.is_compliant);
        assert!(report
            .violations
            .iter()
            .any(|v| v.severity >= Severity::High));
    }

    #[test]
    fn modify_violation_alone_keeps_offer_compliant() {
        let mut o = offer();
        o.old_price = Some(100.0);
        o.price = Some(5.0);
        let report = ComplianceEngine::evaluate(&o, &default_rules());
        assert!(report.is_compliant);
        assert!(!report.recommended_actions.is_empty());
        assert!(report
            .violations
            .iter()
            .any(|v| v.message.contains("discount")));
    }

    #[test]
    fn missing_disclaimer_requires_disclosure() {
        let report = ComplianceEngine::evaluate(&offer(), &default_rules());
        assert!(!report.required_disclosures.is_empty());
    }

    #[test]
    fn prohibited_category_is_critical() {
        let mut o = offer();
        o.category = Some("gambling".to_string());
        let report = ComplianceEngine::evaluate(&o, &default_rules());
        assert!(!report.is_compliant);
    }

    #[test]
    fn excessive_discount_remediation_caps_at_floor() {
        let mut o = offer();
        o.old_price = Some(100.0);
        o.price = Some(5.0);
        let (title, price, applied) = plan_remediation(&o, &default_rules());
        assert!(title.is_none());
        assert_eq!(price, Some(10.0));
        assert_eq!(applied.len(), 1);
    }

    struct StubOffers {
        offer: Mutex<Offer>,
    }

    #[async_trait]
    impl OfferRepository for StubOffers {
        async fn upsert_offer(&self, _offer: &Offer) -> Result<UpsertOutcome, RepoError> {
            Ok(UpsertOutcome::Updated)
        }

        async fn get_offer(&self, _id: Uuid) -> Result<Option<Offer>, RepoError> {
            Ok(Some(self.offer.lock().unwrap().clone()))
        }

        async fn get_offer_by_slug(&self, _slug: &str) -> Result<Option<Offer>, RepoError> {
            Ok(None)
        }

        async fn list_active_offers(&self) -> Result<Vec<Offer>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_source_offers(&self, _source_id: Uuid) -> Result<Vec<Offer>, RepoError> {
            Ok(Vec::new())
        }

        async fn deactivate_offer(&self, _id: Uuid) -> Result<(), RepoError> {
            Ok(())
        }

        async fn apply_remediation(
            &self,
            _id: Uuid,
            title: Option<String>,
            price: Option<f64>,
        ) -> Result<(), RepoError> {
            let mut offer = self.offer.lock().unwrap();
            if let Some(title) = title {
                offer.title = title;
            }
            if let Some(price) = price {
                offer.price = Some(price);
            }
            Ok(())
        }

        async fn increment_click_count(&self, _id: Uuid) -> Result<(), RepoError> {
            Ok(())
        }

        async fn record_performance(
            &self,
            _id: Uuid,
            _conversion_count: i64,
            _conversion_rate: f64,
            _quality_score: f64,
            _trust_score: f64,
        ) -> Result<(), RepoError> {
            Ok(())
        }
    }

    struct StubRules;

    #[async_trait]
    impl RuleRepository for StubRules {
        async fn list_active_rules(&self) -> Result<Vec<ComplianceRule>, RepoError> {
            Ok(default_rules())
        }
    }

    #[tokio::test]
    async fn auto_fix_is_idempotent() {
        let mut o = offer();
        o.old_price = Some(100.0);
        o.price = Some(5.0);
        let id = o.id;
        let offers = Arc::new(StubOffers {
            offer: Mutex::new(o),
        });
        let engine = ComplianceEngine::new(offers.clone(), Arc::new(StubRules));

        let first = engine.auto_fix(id).await.unwrap();
        assert!(first.changed);
        assert_eq!(offers.offer.lock().unwrap().price, Some(10.0));

        let second = engine.auto_fix(id).await.unwrap();
        assert!(!second.changed);
        assert!(second.applied.is_empty());
        assert_eq!(offers.offer.lock().unwrap().price, Some(10.0));
    }

    #[tokio::test]
    async fn check_offer_surfaces_not_found() {
        struct EmptyOffers;

        #[async_trait]
        impl OfferRepository for EmptyOffers {
            async fn upsert_offer(&self, _offer: &Offer) -> Result<UpsertOutcome, RepoError> {
                Ok(UpsertOutcome::Inserted)
            }
            async fn get_offer(&self, _id: Uuid) -> Result<Option<Offer>, RepoError> {
                Ok(None)
            }
            async fn get_offer_by_slug(&self, _slug: &str) -> Result<Option<Offer>, RepoError> {
                Ok(None)
            }
            async fn list_active_offers(&self) -> Result<Vec<Offer>, RepoError> {
                Ok(Vec::new())
            }
            async fn list_source_offers(&self, _id: Uuid) -> Result<Vec<Offer>, RepoError> {
                Ok(Vec::new())
            }
            async fn deactivate_offer(&self, _id: Uuid) -> Result<(), RepoError> {
                Ok(())
            }
            async fn apply_remediation(
                &self,
                _id: Uuid,
                _title: Option<String>,
                _price: Option<f64>,
            ) -> Result<(), RepoError> {
                Ok(())
            }
            async fn increment_click_count(&self, _id: Uuid) -> Result<(), RepoError> {
                Ok(())
            }
            async fn record_performance(
                &self,
                _id: Uuid,
                _conversion_count: i64,
                _conversion_rate: f64,
                _quality_score: f64,
                _trust_score: f64,
            ) -> Result<(), RepoError> {
                Ok(())
            }
        }

        let engine = ComplianceEngine::new(Arc::new(EmptyOffers), Arc::new(StubRules));
        let err = engine.check_offer(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ComplianceError::OfferNotFound(_)));
    }
}
