use super::round_to;

/// Expected dams on a reach: `capacity` (dams/km) times its length.
///
/// A reach whose raw count falls strictly between 0 and 1 is credited with a
/// single dam; everything else is rounded to two decimals.
pub fn dam_count(capacity: f64, length_m: f64) -> f64 {
    let raw = capacity * (length_m / 1000.0);
    if raw > 0.0 && raw < 1.0 {
        1.0
    } else {
        round_to(raw, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_dam_rounds_up_to_one() {
        assert_eq!(dam_count(3.0, 100.0), 1.0);
        assert_eq!(dam_count(0.01, 1.0), 1.0);
    }

    #[test]
    fn zero_stays_zero() {
        assert_eq!(dam_count(0.0, 1500.0), 0.0);
        assert_eq!(dam_count(12.0, 0.0), 0.0);
    }

    #[test]
    fn counts_above_one_round_to_hundredths() {
        assert_eq!(dam_count(1.7, 1000.0), 1.7);
        assert_eq!(dam_count(12.346, 1000.0), 12.35);
        assert_eq!(dam_count(31.2, 350.0), 10.92);
    }
}
