pub mod engine;
pub mod rules;

pub use engine::{ComplianceEngine, ComplianceError, ComplianceReport, FixReport, Violation};
pub use rules::{
    default_rules, ComplianceRule, RuleAction, RuleConditions, RuleRepository, RuleType, Severity,
};
