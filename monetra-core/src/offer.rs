use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An affiliate offer in the catalog. Rows are denormalized: everything the
/// selection and tracking paths need lives on the offer itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub source_id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub merchant: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub badges: Vec<String>,
    pub disclaimer: Option<String>,
    pub price: Option<f64>,
    pub old_price: Option<f64>,
    pub currency: String,
    /// Commission as a fraction, e.g. 0.04 for 4%.
    pub commission_rate: f64,
    pub rating: Option<f64>,
    pub quality_score: f64,
    pub trust_score: f64,
    pub region: Option<String>,
    pub emotion: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub priority: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub click_count: i64,
    pub conversion_count: i64,
    /// Conversion rate as a percentage, 0..100.
    pub conversion_rate: f64,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// Create a new offer owned by the given source.
    pub fn new(source_id: Uuid, slug: String, title: String, target_url: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_id,
            slug,
            title,
            description: None,
            merchant: None,
            category: None,
            tags: Vec::new(),
            badges: Vec::new(),
            disclaimer: None,
            price: None,
            old_price: None,
            currency: "EUR".to_string(),
            commission_rate: 0.0,
            rating: None,
            quality_score: 0.0,
            trust_score: 50.0,
            region: None,
            emotion: None,
            is_active: true,
            is_featured: false,
            priority: 0,
            valid_from: None,
            valid_until: None,
            click_count: 0,
            conversion_count: 0,
            conversion_rate: 0.0,
            target_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the offer is inside its validity window at `now`.
    /// Offers without bounds are always within the window.
    pub fn is_within_validity(&self, now: DateTime<Utc>) -> bool {
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return false;
            }
        }
        true
    }

    pub fn has_validity_window(&self) -> bool {
        self.valid_from.is_some() || self.valid_until.is_some()
    }

    /// Expected revenue for one conversion: commission fraction times price.
    pub fn revenue_estimate(&self) -> f64 {
        self.commission_rate * self.price.unwrap_or(0.0)
    }
}
