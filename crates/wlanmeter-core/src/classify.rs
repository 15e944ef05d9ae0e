// ── Signal quality classification ──
//
// Pure functions mapping signal strength onto the fixed six-step rating
// scale, plus the two conversions between dBm and percentage.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// WLAN quality rating, ordered from worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum QualityRating {
    Poor,
    Weak,
    Fair,
    Good,
    #[serde(rename = "Very Good")]
    #[strum(serialize = "Very Good")]
    VeryGood,
    Excellent,
}

/// Tier table: inclusive lower bound in dBm, rating, percentage.
const TIERS: [(i32, QualityRating, u8); 5] = [
    (-50, QualityRating::Excellent, 100),
    (-60, QualityRating::VeryGood, 80),
    (-67, QualityRating::Good, 60),
    (-70, QualityRating::Fair, 40),
    (-80, QualityRating::Weak, 20),
];

/// Classify a signal strength into its rating and tier percentage.
///
/// Total over `i32` and monotonic: a stronger signal never rates lower.
pub fn classify(dbm: i32) -> (QualityRating, u8) {
    TIERS
        .iter()
        .find(|(floor, _, _)| dbm >= *floor)
        .map_or((QualityRating::Poor, 10), |&(_, rating, pct)| (rating, pct))
}

/// Approximate dBm from a platform quality percentage.
///
/// Linear over 0..=100 onto -100..=-50 dBm, with integer halving of the
/// percentage. Values above 100 are treated as 100.
pub fn pct_to_dbm(pct: u8) -> i32 {
    (i32::from(pct.min(100)) / 2 - 100).clamp(-100, -50)
}

/// Tier percentage for a signal strength (same as `classify(dbm).1`).
pub fn dbm_to_pct(dbm: i32) -> u8 {
    classify(dbm).1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries_are_inclusive() {
        assert_eq!(classify(-50), (QualityRating::Excellent, 100));
        assert_eq!(classify(-51), (QualityRating::VeryGood, 80));
        assert_eq!(classify(-60), (QualityRating::VeryGood, 80));
        assert_eq!(classify(-61), (QualityRating::Good, 60));
        assert_eq!(classify(-67), (QualityRating::Good, 60));
        assert_eq!(classify(-68), (QualityRating::Fair, 40));
        assert_eq!(classify(-70), (QualityRating::Fair, 40));
        assert_eq!(classify(-71), (QualityRating::Weak, 20));
        assert_eq!(classify(-80), (QualityRating::Weak, 20));
        assert_eq!(classify(-81), (QualityRating::Poor, 10));
    }

    #[test]
    fn classify_is_total_and_monotonic() {
        let mut previous = classify(-200);
        assert_eq!(previous, (QualityRating::Poor, 10));
        for dbm in -199..=20 {
            let current = classify(dbm);
            assert!(current.0 >= previous.0, "rating dropped at {dbm} dBm");
            assert!(current.1 >= previous.1, "pct dropped at {dbm} dBm");
            previous = current;
        }
        assert_eq!(classify(i32::MIN).0, QualityRating::Poor);
        assert_eq!(classify(i32::MAX).0, QualityRating::Excellent);
    }

    #[test]
    fn pct_to_dbm_maps_the_full_range() {
        assert_eq!(pct_to_dbm(0), -100);
        assert_eq!(pct_to_dbm(1), -100);
        assert_eq!(pct_to_dbm(50), -75);
        assert_eq!(pct_to_dbm(99), -51);
        assert_eq!(pct_to_dbm(100), -50);
        assert_eq!(pct_to_dbm(255), -50);
    }

    #[test]
    fn dbm_to_pct_follows_tiers() {
        assert_eq!(dbm_to_pct(-45), 100);
        assert_eq!(dbm_to_pct(-75), 20);
        assert_eq!(dbm_to_pct(-95), 10);
    }

    #[test]
    fn rating_display_and_parse() {
        assert_eq!(QualityRating::VeryGood.to_string(), "Very Good");
        assert_eq!("Very Good".parse::<QualityRating>().ok(), Some(QualityRating::VeryGood));
        assert_eq!(
            serde_json::to_string(&QualityRating::VeryGood).unwrap_or_default(),
            "\"Very Good\""
        );
    }
}
