//! Time-of-day trading filter. Consulted once per symbol per tick, after
//! regime detection and before strategy evaluation -- a rejected instant
//! means the tick emits nothing for that symbol, strategies never run.

use crate::domain::signal::AssetClass;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

#[derive(Debug, Clone, Copy)]
pub struct TimeFilterConfig {
    pub enabled: bool,
    /// UTC hour the futures session opens/closes, e.g. 6 and 22.
    pub futures_open_hour: u32,
    pub futures_close_hour: u32,
    /// UTC hour the equities session opens/closes, e.g. 13 and 20.
    pub equities_open_hour: u32,
    pub equities_close_hour: u32,
    /// Minutes to avoid at the start/end of each session.
    pub session_edge_minutes: i64,
    pub reject_weekends: bool,
    pub holiday_mode: bool,
    /// Reject the last N minutes of Friday's session.
    pub friday_late_guard_minutes: i64,
    /// Reject the first N minutes of Monday's session.
    pub monday_early_guard_minutes: i64,
}

impl Default for TimeFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            futures_open_hour: 6,
            futures_close_hour: 22,
            equities_open_hour: 13,
            equities_close_hour: 20,
            session_edge_minutes: 30,
            reject_weekends: true,
            holiday_mode: false,
            friday_late_guard_minutes: 30,
            monday_early_guard_minutes: 30,
        }
    }
}

pub struct TimeFilter {
    pub config: TimeFilterConfig,
}

impl TimeFilter {
    pub fn new(config: TimeFilterConfig) -> Self {
        Self { config }
    }

    /// `true` if trading is allowed for `asset_class` at `now`.
    pub fn allows(&self, asset_class: AssetClass, now: DateTime<Utc>) -> bool {
        if !self.config.enabled {
            return true;
        }
        if self.config.holiday_mode {
            return false;
        }
        let weekday = now.weekday();
        if self.config.reject_weekends && matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return false;
        }

        let (open_hour, close_hour) = match asset_class {
            AssetClass::Futures => (self.config.futures_open_hour, self.config.futures_close_hour),
            AssetClass::Equity => (self.config.equities_open_hour, self.config.equities_close_hour),
        };

        let minute_of_day = now.hour() as i64 * 60 + now.minute() as i64;
        let open_minute = open_hour as i64 * 60;
        let close_minute = close_hour as i64 * 60;

        if minute_of_day < open_minute + self.config.session_edge_minutes {
            return false;
        }
        if minute_of_day > close_minute - self.config.session_edge_minutes {
            return false;
        }

        if weekday == Weekday::Fri && minute_of_day > close_minute - self.config.friday_late_guard_minutes {
            return false;
        }
        if weekday == Weekday::Mon && minute_of_day < open_minute + self.config.monday_early_guard_minutes {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn futures_midday_tuesday_allows() {
        let filter = TimeFilter::new(TimeFilterConfig::default());
        // 2026-07-28 is a Tuesday.
        assert!(filter.allows(AssetClass::Futures, at(2026, 7, 28, 12, 0)));
    }

    #[test]
    fn equities_outside_session_rejects() {
        let filter = TimeFilter::new(TimeFilterConfig::default());
        assert!(!filter.allows(AssetClass::Equity, at(2026, 7, 28, 6, 0)));
    }

    #[test]
    fn session_open_edge_is_rejected() {
        let filter = TimeFilter::new(TimeFilterConfig::default());
        // Futures open at 06:00, first 30 minutes avoided.
        assert!(!filter.allows(AssetClass::Futures, at(2026, 7, 28, 6, 15)));
        assert!(filter.allows(AssetClass::Futures, at(2026, 7, 28, 6, 31)));
    }

    #[test]
    fn weekend_rejects() {
        let filter = TimeFilter::new(TimeFilterConfig::default());
        // 2026-08-01 is a Saturday.
        assert!(!filter.allows(AssetClass::Futures, at(2026, 8, 1, 12, 0)));
    }

    #[test]
    fn holiday_mode_rejects_everything() {
        let mut config = TimeFilterConfig::default();
        config.holiday_mode = true;
        let filter = TimeFilter::new(config);
        assert!(!filter.allows(AssetClass::Futures, at(2026, 7, 28, 12, 0)));
    }

    #[test]
    fn friday_late_guard_rejects_near_close() {
        let filter = TimeFilter::new(TimeFilterConfig::default());
        // 2026-07-31 is a Friday; futures close at 22:00.
        assert!(!filter.allows(AssetClass::Futures, at(2026, 7, 31, 21, 45)));
    }

    #[test]
    fn monday_early_guard_rejects_near_open() {
        // A Monday guard wider than the ordinary session edge catches a
        // time that the plain edge check alone would have let through.
        let mut config = TimeFilterConfig::default();
        config.monday_early_guard_minutes = 60;
        let filter = TimeFilter::new(config);
        // 2026-07-27 is a Monday; futures open at 06:00, ordinary edge ends
        // at 06:30 but the Monday guard extends to 07:00.
        assert!(!filter.allows(AssetClass::Futures, at(2026, 7, 27, 6, 40)));
        assert!(filter.allows(AssetClass::Futures, at(2026, 7, 27, 7, 1)));
    }

    #[test]
    fn disabled_filter_always_allows() {
        let mut config = TimeFilterConfig::default();
        config.enabled = false;
        let filter = TimeFilter::new(config);
        assert!(filter.allows(AssetClass::Futures, at(2026, 8, 1, 3, 0)));
    }
}
