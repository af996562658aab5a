//! Seasonal login page effects
//!
//! A fixed table of date ranges, each mapped to a visual effect. Ranges may
//! overlap; the one with the lowest priority number wins.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Priority of effects that do not declare one
pub const DEFAULT_PRIORITY: u8 = 99;

/// One entry of the seasonal table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonalEffect {
    pub season: &'static str,
    /// (month, day), inclusive
    pub start: (u32, u32),
    /// (month, day), inclusive; earlier than `start` for ranges crossing the new year
    pub end: (u32, u32),
    pub effect: &'static str,
    pub priority: u8,
}

pub const SEASONAL_EFFECTS: [SeasonalEffect; 6] = [
    SeasonalEffect {
        season: "new-years",
        start: (12, 31),
        end: (1, 2),
        effect: "fireworks",
        priority: 1,
    },
    SeasonalEffect {
        season: "spring",
        start: (3, 20),
        end: (5, 31),
        effect: "sakura",
        priority: DEFAULT_PRIORITY,
    },
    SeasonalEffect {
        season: "summer",
        start: (6, 1),
        end: (9, 22),
        effect: "fireflies",
        priority: DEFAULT_PRIORITY,
    },
    SeasonalEffect {
        season: "fall",
        start: (9, 23),
        end: (11, 30),
        effect: "falling-leaves",
        priority: 2,
    },
    SeasonalEffect {
        season: "halloween",
        start: (10, 15),
        end: (11, 1),
        effect: "orange-hue",
        priority: 1,
    },
    SeasonalEffect {
        season: "winter",
        start: (12, 1),
        end: (2, 28),
        effect: "snow",
        priority: DEFAULT_PRIORITY,
    },
];

/// Whether (month, day) falls inside `start..=end`, wrapping past December
pub fn is_date_in_range(month: u32, day: u32, start: (u32, u32), end: (u32, u32)) -> bool {
    let date = (month, day);
    if start <= end {
        start <= date && date <= end
    } else {
        date >= start || date <= end
    }
}

/// Effect to show on `date`
///
/// Among matching entries the lowest priority number wins; ties go to the
/// entry listed first.
pub fn active_effect_on(date: NaiveDate) -> Option<&'static SeasonalEffect> {
    let (month, day) = (date.month(), date.day());
    SEASONAL_EFFECTS
        .iter()
        .filter(|e| is_date_in_range(month, day, e.start, e.end))
        .min_by_key(|e| e.priority)
}

/// Effect to show today (local time)
pub fn active_effect() -> Option<&'static SeasonalEffect> {
    active_effect_on(chrono::Local::now().date_naive())
}
