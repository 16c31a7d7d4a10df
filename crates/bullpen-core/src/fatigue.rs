// Time-decayed workload score.
//
// Each appearance contributes `pitch_count * max(0.2, 1 - days_rest * 0.15)`.
// The multiplier is clamped only from below: an appearance dated after the
// reference date has negative rest and weighs more than its raw count.

use chrono::NaiveDate;

use crate::pitcher::{Appearance, Pitcher};

/// Weight lost per day of rest.
pub const DECAY_PER_REST_DAY: f64 = 0.15;

/// Lowest weight an appearance can decay to.
pub const MULTIPLIER_FLOOR: f64 = 0.2;

/// Fatigue score for `pitcher` as of `reference_date`, rounded to 2 decimals.
pub fn fatigue(pitcher: &Pitcher, reference_date: NaiveDate) -> f64 {
    let total: f64 = pitcher
        .appearances
        .iter()
        .map(|a| contribution(a, reference_date))
        .sum();
    round2(total)
}

/// Whole days between an appearance and the reference date.
pub fn days_rest(appearance: &Appearance, reference_date: NaiveDate) -> i64 {
    (reference_date - appearance.date).num_days()
}

/// Decay weight for a given number of rest days.
pub fn rest_multiplier(days_rest: i64) -> f64 {
    (1.0 - days_rest as f64 * DECAY_PER_REST_DAY).max(MULTIPLIER_FLOOR)
}

fn contribution(appearance: &Appearance, reference_date: NaiveDate) -> f64 {
    f64::from(appearance.pitch_count) * rest_multiplier(days_rest(appearance, reference_date))
}

/// Round to 2 decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pitcher_with(appearances: &[(NaiveDate, u32)]) -> Pitcher {
        let mut p = Pitcher::new("Alice", "Mets", "R");
        for &(d, pc) in appearances {
            p.add_appearance(Appearance::new(d, pc));
        }
        p
    }

    #[test]
    fn same_day_appearance_counts_in_full() {
        let p = pitcher_with(&[(date(2024, 1, 1), 50)]);
        assert_eq!(fatigue(&p, date(2024, 1, 1)), 50.0);
    }

    #[test]
    fn seven_days_rest_hits_the_floor() {
        let p = pitcher_with(&[(date(2024, 1, 1), 50)]);
        assert_eq!(fatigue(&p, date(2024, 1, 8)), 10.0);
    }

    #[test]
    fn floor_engages_from_six_days() {
        let p = pitcher_with(&[(date(2024, 1, 1), 87)]);
        // 1 - 6 * 0.15 = 0.1, floored to 0.2
        assert_eq!(fatigue(&p, date(2024, 1, 7)), round2(87.0 * 0.2));
        assert_eq!(fatigue(&p, date(2024, 3, 1)), round2(87.0 * 0.2));
    }

    #[test]
    fn linear_decay_before_the_floor() {
        let p = pitcher_with(&[(date(2024, 1, 1), 100)]);
        assert_eq!(fatigue(&p, date(2024, 1, 2)), 85.0);
        assert_eq!(fatigue(&p, date(2024, 1, 3)), 70.0);
        assert_eq!(fatigue(&p, date(2024, 1, 5)), 40.0);
        assert_eq!(fatigue(&p, date(2024, 1, 6)), 25.0);
    }

    #[test]
    fn future_appearance_weighs_more_than_raw_count() {
        let p = pitcher_with(&[(date(2024, 1, 3), 40)]);
        // two days before the appearance: 1 + 0.30
        assert_eq!(fatigue(&p, date(2024, 1, 1)), 52.0);
    }

    #[test]
    fn contributions_sum_across_appearances() {
        let p = pitcher_with(&[(date(2024, 1, 1), 50), (date(2024, 1, 3), 30)]);
        // 50 * 0.7 + 30 * 1.0
        assert_eq!(fatigue(&p, date(2024, 1, 3)), 65.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let p = pitcher_with(&[(date(2024, 1, 1), 33)]);
        // 33 * 0.85 = 28.05
        assert_eq!(fatigue(&p, date(2024, 1, 2)), 28.05);
        let p = pitcher_with(&[(date(2024, 1, 1), 7), (date(2024, 1, 1), 1)]);
        // 8 * 0.55 = 4.4
        assert_eq!(fatigue(&p, date(2024, 1, 4)), 4.4);
    }

    #[test]
    fn no_appearances_is_zero() {
        let p = pitcher_with(&[]);
        assert_eq!(fatigue(&p, date(2024, 1, 1)), 0.0);
    }

    #[test]
    fn never_negative() {
        let p = pitcher_with(&[(date(2000, 1, 1), 0), (date(2000, 1, 1), 120)]);
        let f = fatigue(&p, date(2024, 1, 1));
        assert!(f >= 0.0);
        assert_eq!(f, 24.0);
    }

    #[test]
    fn does_not_mutate_and_is_deterministic() {
        let p = pitcher_with(&[(date(2024, 1, 1), 61), (date(2024, 1, 2), 18)]);
        let before = p.clone();
        let a = fatigue(&p, date(2024, 1, 4));
        let b = fatigue(&p, date(2024, 1, 4));
        assert_eq!(a, b);
        assert_eq!(p, before);
    }

    #[test]
    fn multiplier_values() {
        assert_eq!(rest_multiplier(0), 1.0);
        assert_eq!(rest_multiplier(6), MULTIPLIER_FLOOR);
        assert_eq!(rest_multiplier(100), MULTIPLIER_FLOOR);
        assert!(rest_multiplier(-1) > 1.0);
    }
}
