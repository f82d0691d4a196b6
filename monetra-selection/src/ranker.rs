use std::str::FromStr;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use monetra_core::Offer;

/// Primary ordering applied to the filtered candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankStrategy {
    Performance,
    Newest,
    HighestCommission,
    Random,
}

impl RankStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankStrategy::Performance => "performance",
            RankStrategy::Newest => "newest",
            RankStrategy::HighestCommission => "highest_commission",
            RankStrategy::Random => "random",
        }
    }
}

impl FromStr for RankStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "performance" => Ok(RankStrategy::Performance),
            "newest" => Ok(RankStrategy::Newest),
            "highest_commission" => Ok(RankStrategy::HighestCommission),
            "random" => Ok(RankStrategy::Random),
            other => Err(format!("unknown ranking strategy '{other}'")),
        }
    }
}

/// Signal the performance strategy orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    ClickThrough,
    ConversionRate,
    Revenue,
}

impl FromStr for PerformanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click_through" => Ok(PerformanceMetric::ClickThrough),
            "conversion_rate" => Ok(PerformanceMetric::ConversionRate),
            "revenue" => Ok(PerformanceMetric::Revenue),
            other => Err(format!("unknown performance metric '{other}'")),
        }
    }
}

/// Order offers in place, best first. Random is a pure shuffle; every other
/// strategy sorts by primary score plus a featured boost of 1000 and a
/// rating boost of rating x 100.
pub fn rank(offers: &mut [Offer], strategy: RankStrategy, metric: PerformanceMetric) {
    if strategy == RankStrategy::Random {
        offers.shuffle(&mut rand::thread_rng());
        return;
    }

    offers.sort_by(|a, b| {
        let sa = score(a, strategy, metric);
        let sb = score(b, strategy, metric);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn score(offer: &Offer, strategy: RankStrategy, metric: PerformanceMetric) -> f64 {
    primary_score(offer, strategy, metric) + boost(offer)
}

fn primary_score(offer: &Offer, strategy: RankStrategy, metric: PerformanceMetric) -> f64 {
    match strategy {
        RankStrategy::Performance => match metric {
            PerformanceMetric::ClickThrough => offer.click_count as f64,
            PerformanceMetric::ConversionRate => offer.conversion_rate,
            PerformanceMetric::Revenue => offer.revenue_estimate(),
        },
        RankStrategy::Newest => offer.valid_from.unwrap_or(offer.created_at).timestamp() as f64,
        // Scaled so the fixed boosts below can never reorder two offers
        // with different commission rates.
        RankStrategy::HighestCommission => offer.commission_rate * 1_000_000.0,
        RankStrategy::Random => 0.0,
    }
}

fn boost(offer: &Offer) -> f64 {
    let featured = if offer.is_featured { 1000.0 } else { 0.0 };
    featured + offer.rating.unwrap_or(0.0) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn offer(slug: &str) -> Offer {
        Offer::new(
            Uuid::new_v4(),
            slug.to_string(),
            slug.replace('-', " "),
            format!("https://merchant.example/{slug}"),
        )
    }

    #[test]
    fn highest_commission_order_is_non_increasing() {
        let mut a = offer("low-commission");
        a.commission_rate = 0.02;
        a.is_featured = true;
        a.rating = Some(5.0);
        let mut b = offer("mid-commission");
        b.commission_rate = 0.10;
        let mut c = offer("top-commission");
        c.commission_rate = 0.25;

        let mut offers = vec![a, b, c];
        rank(
            &mut offers,
            RankStrategy::HighestCommission,
            PerformanceMetric::Revenue,
        );

        let rates: Vec<f64> = offers.iter().map(|o| o.commission_rate).collect();
        assert!(rates.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn revenue_metric_prefers_commission_times_price() {
        let mut cheap = offer("cheap");
        cheap.price = Some(10.0);
        cheap.commission_rate = 0.5;
        let mut pricey = offer("pricey");
        pricey.price = Some(500.0);
        pricey.commission_rate = 0.1;

        let mut offers = vec![cheap, pricey];
        rank(
            &mut offers,
            RankStrategy::Performance,
            PerformanceMetric::Revenue,
        );
        assert_eq!(offers[0].slug, "pricey");
    }

    #[test]
    fn featured_offer_outranks_equal_peer() {
        let plain = offer("plain");
        let mut featured = offer("featured");
        featured.is_featured = true;

        let mut offers = vec![plain, featured];
        rank(
            &mut offers,
            RankStrategy::Performance,
            PerformanceMetric::Revenue,
        );
        assert_eq!(offers[0].slug, "featured");
    }

    #[test]
    fn newest_ranks_recent_start_dates_first() {
        let now = chrono::Utc::now();
        let mut old = offer("old");
        old.valid_from = Some(now - Duration::days(30));
        let mut fresh = offer("fresh");
        fresh.valid_from = Some(now);

        let mut offers = vec![old, fresh];
        rank(&mut offers, RankStrategy::Newest, PerformanceMetric::Revenue);
        assert_eq!(offers[0].slug, "fresh");
    }

    #[test]
    fn strategy_parses_from_config_strings() {
        assert_eq!(
            "highest_commission".parse::<RankStrategy>().unwrap(),
            RankStrategy::HighestCommission
        );
        assert!("bogus".parse::<RankStrategy>().is_err());
        assert_eq!(
            "conversion_rate".parse::<PerformanceMetric>().unwrap(),
            PerformanceMetric::ConversionRate
        );
    }
}
