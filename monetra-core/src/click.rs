use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::offer::Offer;

/// A recorded outbound click. Offer attributes are snapshotted at click time
/// so later edits or deactivation of the offer never distort attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Click {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub session_id: String,
    pub user_id: Option<String>,
    pub offer_slug: String,
    pub offer_title: String,
    pub offer_category: Option<String>,
    pub commission_rate: f64,
    /// Page and placement context captured from the caller, stored verbatim.
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub redirected_at: Option<DateTime<Utc>>,
    pub conversion_tracked: bool,
    pub conversion_value: Option<f64>,
    pub conversion_type: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
}

impl Click {
    /// Record a click against an offer, snapshotting its attribution fields.
    pub fn record(
        offer: &Offer,
        session_id: String,
        user_id: Option<String>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            session_id,
            user_id,
            offer_slug: offer.slug.clone(),
            offer_title: offer.title.clone(),
            offer_category: offer.category.clone(),
            commission_rate: offer.commission_rate,
            context,
            created_at: Utc::now(),
            redirected_at: None,
            conversion_tracked: false,
            conversion_value: None,
            conversion_type: None,
            converted_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_snapshots_offer_fields() {
        let mut offer = Offer::new(
            Uuid::new_v4(),
            "standing-desk".to_string(),
            "Standing Desk".to_string(),
            "https://merchant.example/desk".to_string(),
        );
        offer.category = Some("office".to_string());
        offer.commission_rate = 0.06;

        let click = Click::record(
            &offer,
            "sess-3271".to_string(),
            None,
            serde_json::json!({"page_slug": "home-office-guide"}),
        );

        assert_eq!(click.offer_id, offer.id);
        assert_eq!(click.offer_slug, "standing-desk");
        assert_eq!(click.offer_category.as_deref(), Some("office"));
        assert!((click.commission_rate - 0.06).abs() < f64::EPSILON);
        assert!(!click.conversion_tracked);
        assert!(click.redirected_at.is_none());
    }
}
