use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use monetra_compliance::{ComplianceRule, RuleRepository};
use monetra_core::repository::RepoError;

pub struct PostgresRuleRepository {
    pub pool: PgPool,
}

fn enum_from_str<T: DeserializeOwned>(s: &str) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
}

fn row_to_rule(row: &PgRow) -> Result<ComplianceRule, RepoError> {
    let rule_type: String = row.try_get("rule_type")?;
    let action: String = row.try_get("action")?;
    let severity: String = row.try_get("severity")?;
    let conditions: serde_json::Value = row.try_get("conditions")?;
    Ok(ComplianceRule {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        rule_type: enum_from_str(&rule_type)?,
        conditions: serde_json::from_value(conditions)?,
        action: enum_from_str(&action)?,
        severity: enum_from_str(&severity)?,
        is_active: row.try_get("is_active")?,
    })
}

#[async_trait]
impl RuleRepository for PostgresRuleRepository {
    async fn list_active_rules(&self) -> Result<Vec<ComplianceRule>, RepoError> {
        let rows = sqlx::query(
            "SELECT id, name, rule_type, conditions, action, severity, is_active \
             FROM compliance_rules WHERE is_active = TRUE ORDER BY severity DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_rule).collect()
    }
}
