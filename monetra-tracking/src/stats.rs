use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use monetra_core::repository::{ClickRepository, OfferRepository};

use crate::TrackingError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub clicks: i64,
    pub conversions: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OfferStats {
    pub offer_id: Uuid,
    pub clicks: i64,
    pub conversions: i64,
    pub revenue: f64,
    /// Percentage over the reported click window.
    pub conversion_rate: f64,
    pub daily: Vec<DailyStats>,
}

/// Aggregates click and conversion history for reporting.
pub struct StatsService {
    offers: Arc<dyn OfferRepository>,
    clicks: Arc<dyn ClickRepository>,
}

impl StatsService {
    pub fn new(offers: Arc<dyn OfferRepository>, clicks: Arc<dyn ClickRepository>) -> Self {
        Self { offers, clicks }
    }

    pub async fn offer_stats(
        &self,
        offer_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<OfferStats, TrackingError> {
        self.offers
            .get_offer(offer_id)
            .await?
            .ok_or_else(|| TrackingError::OfferNotFound(offer_id.to_string()))?;

        let clicks = self.clicks.list_offer_clicks(offer_id, from, to).await?;

        let mut daily: BTreeMap<NaiveDate, DailyStats> = BTreeMap::new();
        let mut conversions = 0i64;
        let mut revenue = 0.0f64;
        for click in &clicks {
            let day = click.created_at.date_naive();
            let entry = daily.entry(day).or_insert(DailyStats {
                date: day,
                clicks: 0,
                conversions: 0,
                revenue: 0.0,
            });
            entry.clicks += 1;
            if click.conversion_tracked {
                let value = click.conversion_value.unwrap_or(0.0);
                entry.conversions += 1;
                entry.revenue += value;
                conversions += 1;
                revenue += value;
            }
        }

        let total_clicks = clicks.len() as i64;
        let conversion_rate = if total_clicks > 0 {
            conversions as f64 / total_clicks as f64 * 100.0
        } else {
            0.0
        };

        Ok(OfferStats {
            offer_id,
            clicks: total_clicks,
            conversions,
            revenue,
            conversion_rate,
            daily: daily.into_values().collect(),
        })
    }
}
