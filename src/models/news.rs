use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub keyword: String,
    pub source: String,
    /// Raw delimited tag string, e.g. `#AI #검색 #추천`.
    pub tags: String,
    pub url: String,
    pub date: String,
    pub summary: String,
    pub likes: i64,
}

impl NewsItem {
    pub fn is_recommended(&self, marker: &str) -> bool {
        self.tags.contains(marker)
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses a feed date string into a comparable value.
///
/// Accepts plain dates, naive date-times and RFC 3339. Anything else is `None`
/// and sorts below every parseable date.
pub fn date_value(date: &str) -> Option<NaiveDateTime> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date, format) {
            return Some(dt);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Date of the most recent item. Ties keep the earliest item in input order.
pub fn latest_date(items: &[NewsItem]) -> Option<String> {
    let mut best: Option<(&NewsItem, Option<NaiveDateTime>)> = None;
    for item in items {
        let value = date_value(&item.date);
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((item, value)),
        }
    }
    best.map(|(item, _)| item.date.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, date: &str) -> NewsItem {
        NewsItem {
            id: id.to_string(),
            title: format!("title {id}"),
            keyword: String::new(),
            source: String::new(),
            tags: String::new(),
            url: format!("https://example.com/{id}"),
            date: date.to_string(),
            summary: String::new(),
            likes: 0,
        }
    }

    #[test]
    fn parses_common_date_shapes() {
        assert!(date_value("2025-08-01").is_some());
        assert!(date_value("2025.08.01").is_some());
        assert!(date_value("2025-08-01T09:30:00+09:00").is_some());
        assert!(date_value("2025-08-01 09:30").is_some());
        assert!(date_value("").is_none());
        assert!(date_value("No date").is_none());
    }

    #[test]
    fn date_value_orders_chronologically_not_lexically() {
        assert!(date_value("2025/10/01") > date_value("2025-09-30"));
    }

    #[test]
    fn latest_date_picks_greatest() {
        let items = vec![
            item("a", "2025-07-30"),
            item("b", "2025-08-01"),
            item("c", "2025-07-31"),
        ];
        assert_eq!(latest_date(&items).as_deref(), Some("2025-08-01"));
    }

    #[test]
    fn latest_date_is_stable_for_equal_values() {
        // Same instant, different spellings: the first one seen wins.
        let items = vec![item("a", "2025-08-01"), item("b", "2025.08.01")];
        assert_eq!(latest_date(&items).as_deref(), Some("2025-08-01"));

        let reversed = vec![item("b", "2025.08.01"), item("a", "2025-08-01")];
        assert_eq!(latest_date(&reversed).as_deref(), Some("2025.08.01"));
    }

    #[test]
    fn latest_date_empty_and_unparseable() {
        assert_eq!(latest_date(&[]), None);
        let items = vec![item("a", "soon"), item("b", "2025-01-01")];
        assert_eq!(latest_date(&items).as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn recommended_marker_is_substring() {
        let mut news = item("a", "2025-08-01");
        news.tags = "#AI #검색 #추천".to_string();
        assert!(news.is_recommended("추천"));
        assert!(!news.is_recommended("#핀테크"));
    }
}
