use crate::util::sun_api::SunTimes;
use chrono::{DateTime, Utc};

/// normalized progress of `now` through the interval from `start` to `end`,
/// clamped to 0..=1. expects `start < end`, which holds for every twilight
/// interval the api returns.
pub fn transition_fraction(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let total = (end - start).num_milliseconds() as f64;
    let elapsed = (now - start).num_milliseconds() as f64;
    (elapsed / total).clamp(0.0, 1.0)
}

/// target brightness in percent for `now`. fades out over the morning
/// twilight, back in over the evening twilight, full `max_percent` at night
/// and off during the day.
pub fn brightness_for_time(now: DateTime<Utc>, times: &SunTimes, max_percent: u8) -> u8 {
    let max = f64::from(max_percent) / 100.0;

    let target = if now >= times.civil_twilight_begin && now <= times.sunrise {
        // morning transition
        (1.0 - transition_fraction(now, times.civil_twilight_begin, times.sunrise)) * max
    } else if now >= times.sunset && now <= times.civil_twilight_end {
        // evening transition
        transition_fraction(now, times.sunset, times.civil_twilight_end) * max
    } else if now > times.civil_twilight_end || now < times.civil_twilight_begin {
        // night
        max
    } else {
        // day
        0.0
    };

    (target * 100.0).round() as u8
}
