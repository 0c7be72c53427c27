//! Calendar facts seeded into every [`Day`](crate::bluemoon::day::Day).
//!
//! The store only needs "whole days to the nearest event", so the default
//! [`MeanAlmanac`] works from mean lunations and the Meeus mean
//! equinox/solstice polynomials. It is accurate to within about a day, which
//! is all the downstream analyses look at.

use chrono::NaiveDate;

const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// Full moon of 2000-01-21 04:40 UTC.
const FULL_MOON_EPOCH_JD: f64 = 2_451_564.694_4;
const SYNODIC_MONTH_DAYS: f64 = 29.530_588_853;

pub trait Almanac {
    /// Whole days between `date` and the closest full moon.
    fn moon_distance(&self, date: NaiveDate) -> i64;
    /// Whole days between `date` and the closest equinox or solstice.
    fn season_distance(&self, date: NaiveDate) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAlmanac;

fn julian_day(date: NaiveDate) -> f64 {
    let unix_days = date
        .signed_duration_since(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN))
        .num_days();
    unix_days as f64 + UNIX_EPOCH_JD
}

// Distances are floored the way a timedelta's day component is.
fn nearest_distance(at: f64, previous: f64, next: f64) -> i64 {
    let forward = (next - at).floor() as i64;
    let backward = (at - previous).floor() as i64;
    forward.min(backward)
}

fn season_events(year: i32) -> [f64; 4] {
    let y = f64::from(year - 2000) / 1000.0;
    let poly = |c: [f64; 5]| c[0] + y * (c[1] + y * (c[2] + y * (c[3] + y * c[4])));
    [
        poly([2_451_623.809_84, 365_242.374_04, 0.051_69, -0.004_11, -0.000_57]),
        poly([2_451_716.567_67, 365_241.626_03, 0.003_25, 0.008_88, -0.000_30]),
        poly([2_451_810.217_15, 365_242.017_67, -0.115_75, 0.003_37, 0.000_78]),
        poly([2_451_900.059_52, 365_242.740_49, -0.062_23, -0.008_23, 0.000_32]),
    ]
}

impl Almanac for MeanAlmanac {
    fn moon_distance(&self, date: NaiveDate) -> i64 {
        let at = julian_day(date);
        let lunations = ((at - FULL_MOON_EPOCH_JD) / SYNODIC_MONTH_DAYS).ceil();
        let next = FULL_MOON_EPOCH_JD + lunations * SYNODIC_MONTH_DAYS;
        nearest_distance(at, next - SYNODIC_MONTH_DAYS, next)
    }

    fn season_distance(&self, date: NaiveDate) -> i64 {
        use chrono::Datelike;

        let at = julian_day(date);
        let mut events: Vec<f64> = (date.year() - 1..=date.year() + 1)
            .flat_map(season_events)
            .collect();
        events.sort_by(f64::total_cmp);

        let next = events.iter().copied().find(|e| *e > at);
        let previous = events.iter().copied().rev().find(|e| *e <= at);
        match (previous, next) {
            (Some(p), Some(n)) => nearest_distance(at, p, n),
            // unreachable with a three year window, but keep the arithmetic total
            (Some(p), None) => (at - p).floor() as i64,
            (None, Some(n)) => (n - at).floor() as i64,
            (None, None) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn full_moon_days_are_close_to_zero() {
        // 2020-12-30 03:28 UTC full moon
        assert_eq!(MeanAlmanac.moon_distance(date(2020, 12, 30)), 0);
        // new moon, roughly half a lunation away either side
        let far = MeanAlmanac.moon_distance(date(2020, 12, 14));
        assert!((13..=15).contains(&far), "got {far}");
    }

    #[test]
    fn moon_distance_never_exceeds_half_a_lunation() {
        let mut day = date(2019, 1, 1);
        for _ in 0..400 {
            let d = MeanAlmanac.moon_distance(day);
            assert!((0..=15).contains(&d), "{day}: {d}");
            day = day.succ_opt().expect("next day");
        }
    }

    #[test]
    fn season_distance_tracks_equinoxes_and_solstices() {
        // 2020-03-20 03:50 UTC equinox, 2020-12-21 10:02 UTC solstice
        assert_eq!(MeanAlmanac.season_distance(date(2020, 3, 20)), 0);
        assert_eq!(MeanAlmanac.season_distance(date(2020, 12, 21)), 0);
        assert_eq!(MeanAlmanac.season_distance(date(2020, 12, 4)), 17);
        // midway between the June solstice and September equinox
        let mid = MeanAlmanac.season_distance(date(2021, 8, 6));
        assert!((44..=47).contains(&mid), "got {mid}");
    }
}
