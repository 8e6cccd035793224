//! Visitor analytics: user-agent parsing and rollups.
//!
//! Rollups that the database can do are done in SQL; the helpers here cover
//! the in-process data (live visitors) and the shape of every summary so
//! both paths produce the same output.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ParseStatusError;

/// Minutes without a heartbeat before a session stops counting as active.
pub const ACTIVE_WINDOW_MINUTES: i64 = 5;

/// Device, browser and OS parsed from a `User-Agent` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device_type: &'static str,
    pub browser: &'static str,
    pub os: &'static str,
}

impl DeviceInfo {
    /// Classify a user agent string. Unknown agents map to `unknown`.
    #[must_use]
    pub fn parse(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        let has = |needle: &str| ua.contains(needle);

        let device_type = if has("mobile") || has("android") || has("iphone") {
            "mobile"
        } else if has("tablet") || has("ipad") {
            "tablet"
        } else {
            "desktop"
        };

        let browser = if has("edg") {
            "edge"
        } else if has("chrome") {
            "chrome"
        } else if has("safari") {
            "safari"
        } else if has("firefox") {
            "firefox"
        } else if has("opera") || has("opr") {
            "opera"
        } else {
            "unknown"
        };

        // Android agents also say "linux"; Apple mobile agents also say "mac os x".
        let os = if has("windows") {
            "windows"
        } else if has("android") {
            "android"
        } else if has("iphone") || has("ipad") || has(" ios") {
            "ios"
        } else if has("mac os") || has("macos") {
            "macos"
        } else if has("linux") {
            "linux"
        } else {
            "unknown"
        };

        Self {
            device_type,
            browser,
            os,
        }
    }
}

/// Reporting window for admin dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "all")]
    All,
}

impl Timeframe {
    /// Start of the window, or `None` for all time.
    #[must_use]
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc()),
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => Some(now - Duration::days(30)),
            Self::Quarter => Some(now - Duration::days(90)),
            Self::All => None,
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "today" => Ok(Self::Today),
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            "all" => Ok(Self::All),
            other => Err(ParseStatusError {
                kind: "timeframe",
                value: other.to_string(),
            }),
        }
    }
}

/// Which visitors a location breakdown includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationFilter {
    #[default]
    All,
    Registered,
    Guest,
    /// Visitors whose session is linked to an account.
    Signup,
}

/// Visitors → cart → checkout → purchase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConversionFunnel {
    pub visitor_count: i64,
    pub cart_additions: i64,
    pub checkout_started: i64,
    pub purchases: i64,
    pub conversion_rate: f64,
}

impl ConversionFunnel {
    /// Build a funnel; the rate is purchases per hundred visitors.
    #[must_use]
    pub fn new(visitors: i64, cart_additions: i64, checkout_started: i64, purchases: i64) -> Self {
        Self {
            visitor_count: visitors,
            cart_additions,
            checkout_started,
            purchases,
            conversion_rate: percentage(purchases, visitors),
        }
    }
}

/// `part / whole × 100` rounded to 2dp; zero when `whole` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of a set of durations in seconds, rounded to 2dp.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_seconds(durations: &[i64]) -> f64 {
    if durations.is_empty() {
        return 0.0;
    }
    let total: i64 = durations.iter().sum();
    round2(total as f64 / durations.len() as f64)
}

/// A grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountBucket {
    pub key: String,
    pub count: i64,
}

/// Count occurrences and keep the `limit` largest groups.
///
/// Ties are broken by key so the output is stable.
#[must_use]
pub fn top_counts<I, K>(keys: I, limit: usize) -> Vec<CountBucket>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let mut counts: HashMap<String, i64> = HashMap::new();
    for key in keys {
        *counts.entry(key.into()).or_default() += 1;
    }

    let mut buckets: Vec<CountBucket> = counts
        .into_iter()
        .map(|(key, count)| CountBucket { key, count })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    buckets.truncate(limit);
    buckets
}

/// Referrer grouping key; visits without one are `direct`.
#[must_use]
pub fn referrer_key(referrer: Option<&str>) -> String {
    match referrer.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => "direct".to_string(),
    }
}

/// Count per calendar day (UTC) from `start` to `end` inclusive, zero-filled.
#[must_use]
pub fn daily_counts(
    timestamps: impl IntoIterator<Item = DateTime<Utc>>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(NaiveDate, i64)> {
    let mut days: BTreeMap<NaiveDate, i64> = start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| (day, 0))
        .collect();

    for ts in timestamps {
        if let Some(count) = days.get_mut(&ts.date_naive()) {
            *count += 1;
        }
    }

    days.into_iter().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const WIN_EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36 Edg/120.0";
    const MAC_CHROME: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
    const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/120.0 Mobile Safari/537.36";

    #[test]
    fn test_parse_iphone_safari() {
        let info = DeviceInfo::parse(IPHONE);
        assert_eq!(info.device_type, "mobile");
        assert_eq!(info.browser, "safari");
        assert_eq!(info.os, "ios");
    }

    #[test]
    fn test_parse_edge_on_windows() {
        let info = DeviceInfo::parse(WIN_EDGE);
        assert_eq!(info.device_type, "desktop");
        assert_eq!(info.browser, "edge");
        assert_eq!(info.os, "windows");
    }

    #[test]
    fn test_parse_chrome_on_mac() {
        let info = DeviceInfo::parse(MAC_CHROME);
        assert_eq!(info.browser, "chrome");
        assert_eq!(info.os, "macos");
    }

    #[test]
    fn test_parse_ipad_and_android() {
        assert_eq!(DeviceInfo::parse(IPAD).device_type, "tablet");
        let android = DeviceInfo::parse(ANDROID);
        assert_eq!(android.device_type, "mobile");
        assert_eq!(android.os, "android");
    }

    #[test]
    fn test_parse_unknown() {
        let info = DeviceInfo::parse("curl/8.0");
        assert_eq!(info.browser, "unknown");
        assert_eq!(info.os, "unknown");
        assert_eq!(info.device_type, "desktop");
    }

    #[test]
    fn test_conversion_rate() {
        assert!((ConversionFunnel::new(3, 2, 1, 1).conversion_rate - 33.33).abs() < f64::EPSILON);
        assert!(ConversionFunnel::new(0, 0, 0, 0).conversion_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_seconds() {
        assert!((average_seconds(&[10, 20, 25]) - 18.33).abs() < f64::EPSILON);
        assert!(average_seconds(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_top_counts_orders_and_limits() {
        let pages = ["/", "/shop", "/", "/about", "/shop", "/"];
        let top = top_counts(pages, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top.first().unwrap().key, "/");
        assert_eq!(top.first().unwrap().count, 3);
        assert_eq!(top.get(1).unwrap().key, "/shop");
    }

    #[test]
    fn test_referrer_key() {
        assert_eq!(referrer_key(None), "direct");
        assert_eq!(referrer_key(Some("  ")), "direct");
        assert_eq!(referrer_key(Some("instagram.com")), "instagram.com");
    }

    #[test]
    fn test_timeframe() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 30, 0).unwrap();
        assert_eq!(
            "today".parse::<Timeframe>().unwrap().start(now).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(Timeframe::Week.start(now).unwrap(), now - Duration::days(7));
        assert!(Timeframe::All.start(now).is_none());
        assert!("1y".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_daily_counts_zero_fill() {
        let d = |day| Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap();
        let counts = daily_counts(
            [d(1), d(1), d(3), d(9)],
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        );
        let values: Vec<i64> = counts.iter().map(|(_, c)| *c).collect();
        assert_eq!(values, vec![2, 0, 1]);
    }
}
