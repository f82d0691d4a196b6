use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use monetra_core::repository::RepoError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    Content,
    Merchant,
    Region,
    Price,
    Category,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    Flag,
    RequireDisclosure,
    Modify,
}

/// Violation severity, ordered. High and Critical gate display eligibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Structured predicate of a rule. Only the fields relevant to the rule's
/// type are set; unset fields are not evaluated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConditions {
    pub prohibited_keywords: Option<Vec<String>>,
    pub max_title_length: Option<usize>,
    pub require_disclaimer: Option<bool>,
    pub disclosure_text: Option<String>,
    pub blacklisted_merchants: Option<Vec<String>>,
    pub restricted_regions: Option<Vec<String>>,
    pub allowed_currencies: Option<Vec<String>>,
    pub min_price: Option<f64>,
    pub max_discount_percent: Option<f64>,
    pub require_price_comparison: Option<bool>,
    pub prohibited_categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub id: Uuid,
    pub name: String,
    pub rule_type: RuleType,
    pub conditions: RuleConditions,
    pub action: RuleAction,
    pub severity: Severity,
    pub is_active: bool,
}

/// Read access to the rule set. Rules are mutated by admin tooling only.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn list_active_rules(&self) -> Result<Vec<ComplianceRule>, RepoError>;
}

/// Baseline rule set applied when no rules have been configured yet.
pub fn default_rules() -> Vec<ComplianceRule> {
    vec![
        ComplianceRule {
            id: Uuid::new_v4(),
            name: "Prohibited claims".to_string(),
            rule_type: RuleType::Content,
            conditions: RuleConditions {
                prohibited_keywords: Some(vec![
                    "guaranteed".to_string(),
                    "miracle".to_string(),
                    "risk-free".to_string(),
                ]),
                ..Default::default()
            },
            action: RuleAction::Block,
            severity: Severity::High,
            is_active: true,
        },
        ComplianceRule {
            id: Uuid::new_v4(),
            name: "Title length".to_string(),
            rule_type: RuleType::Content,
            conditions: RuleConditions {
                max_title_length: Some(150),
                ..Default::default()
            },
            action: RuleAction::Modify,
            severity: Severity::Medium,
            is_active: true,
        },
        ComplianceRule {
            id: Uuid::new_v4(),
            name: "Affiliate disclosure".to_string(),
            rule_type: RuleType::Content,
            conditions: RuleConditions {
                require_disclaimer: Some(true),
                disclosure_text: Some(
                    "This page contains affiliate links. We may earn a commission.".to_string(),
                ),
                ..Default::default()
            },
            action: RuleAction::RequireDisclosure,
            severity: Severity::Low,
            is_active: true,
        },
        ComplianceRule {
            id: Uuid::new_v4(),
            name: "Implausible discount".to_string(),
            rule_type: RuleType::Price,
            conditions: RuleConditions {
                max_discount_percent: Some(90.0),
                ..Default::default()
            },
            action: RuleAction::Modify,
            severity: Severity::Medium,
            is_active: true,
        },
        ComplianceRule {
            id: Uuid::new_v4(),
            name: "Prohibited categories".to_string(),
            rule_type: RuleType::Category,
            conditions: RuleConditions {
                prohibited_categories: Some(vec![
                    "gambling".to_string(),
                    "weapons".to_string(),
                ]),
                ..Default::default()
            },
            action: RuleAction::Block,
            severity: Severity::Critical,
            is_active: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_gates_high_and_critical() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low < Severity::Medium);
    }

    #[test]
    fn default_rules_are_all_active() {
        let rules = default_rules();
        assert!(!rules.is_empty());
        assert!(rules.iter().all(|r| r.is_active));
    }
}
