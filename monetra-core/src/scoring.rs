/// Performance scoring for offers. Both scores live on a 0..100 scale so the
/// ranking strategies can mix them without renormalizing.

/// Quality score from observed engagement. Conversion rate is a percentage;
/// click volume and average order value enter on a log scale so a handful of
/// large orders cannot dominate.
pub fn quality_score(click_count: i64, conversion_rate_pct: f64, avg_order_value: f64) -> f64 {
    let conversion_component = conversion_rate_pct.clamp(0.0, 40.0);
    let click_component = ((click_count as f64 + 1.0).log10() * 10.0).clamp(0.0, 30.0);
    let value_component = ((avg_order_value.max(0.0) + 1.0).log10() * 3.0).clamp(0.0, 30.0);
    (conversion_component + click_component + value_component).clamp(0.0, 100.0)
}

/// Trust score from completeness of the offer record. Starts at a neutral 50
/// and earns 10 points per signal of editorial care, capped at 100.
pub fn trust_score(offer: &crate::Offer) -> f64 {
    let mut score: f64 = 50.0;
    if offer.merchant.as_deref().is_some_and(|m| !m.trim().is_empty()) {
        score += 10.0;
    }
    if offer.description.as_deref().is_some_and(|d| d.len() > 50) {
        score += 10.0;
    }
    if !offer.badges.is_empty() {
        score += 10.0;
    }
    if offer.disclaimer.is_some() {
        score += 10.0;
    }
    if offer.has_validity_window() {
        score += 10.0;
    }
    score.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Offer;
    use uuid::Uuid;

    fn bare_offer() -> Offer {
        Offer::new(
            Uuid::new_v4(),
            "test-offer".to_string(),
            "Test Offer".to_string(),
            "https://merchant.example/x".to_string(),
        )
    }

    #[test]
    fn quality_score_is_bounded() {
        assert_eq!(quality_score(0, 0.0, 0.0), 0.0);
        let high = quality_score(1_000_000, 95.0, 100_000.0);
        assert!(high <= 100.0);
        assert!(high >= 90.0);
    }

    #[test]
    fn quality_score_rises_with_conversion_rate() {
        let low = quality_score(100, 1.0, 50.0);
        let high = quality_score(100, 10.0, 50.0);
        assert!(high > low);
    }

    #[test]
    fn trust_score_starts_neutral() {
        assert!((trust_score(&bare_offer()) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trust_score_rewards_complete_records() {
        let mut offer = bare_offer();
        offer.merchant = Some("Acme GmbH".to_string());
        offer.description = Some(
            "A long-form editorial description explaining the product in enough detail."
                .to_string(),
        );
        offer.badges = vec!["bestseller".to_string()];
        offer.disclaimer = Some("Affiliate link".to_string());
        offer.valid_until = Some(chrono::Utc::now() + chrono::Duration::days(30));
        assert!((trust_score(&offer) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trust_score_ignores_blank_merchant() {
        let mut offer = bare_offer();
        offer.merchant = Some("   ".to_string());
        assert!((trust_score(&offer) - 50.0).abs() < f64::EPSILON);
    }
}
