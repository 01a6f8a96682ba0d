use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::FeedSource;
use crate::error::{AppError, Result};
use crate::models::{latest_date, NewsItem};

use super::sample::sample_news;

// Fixed column positions in the news sheet.
const COL_TITLE: usize = 0;
const COL_KEYWORD: usize = 1;
const COL_SOURCE: usize = 2;
const COL_TAGS: usize = 3;
const COL_URL: usize = 4;
const COL_DATE: usize = 5;
const COL_SUMMARY: usize = 6;
const COL_LIKES: usize = 7;
const COL_ID: usize = 8;

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    values: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Result of a feed refresh, after any fallback has been applied.
#[derive(Debug, Clone)]
pub struct FeedLoad {
    pub items: Vec<NewsItem>,
    pub latest_date: Option<String>,
    /// Non-fatal message for the banner when sample data replaced the feed.
    pub notice: Option<String>,
}

impl FeedLoad {
    fn from_items(items: Vec<NewsItem>, notice: Option<String>) -> Self {
        let latest_date = latest_date(&items);
        Self {
            items,
            latest_date,
            notice,
        }
    }
}

pub struct SheetsFeedLoader {
    client: Client,
    source: FeedSource,
}

impl SheetsFeedLoader {
    pub fn new(source: FeedSource) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("it-news/1.0")
            .build()?;

        Ok(Self { client, source })
    }

    pub async fn load(&self) -> Result<Vec<NewsItem>> {
        let api_key = self
            .source
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("feed.api_key is not set".to_string()))?;

        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.source.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.source.sheet_id),
            urlencoding::encode(&self.source.range),
        );

        let response = self
            .client
            .get(&url)
            .query(&[("key", api_key)])
            .send()
            .await
            .map_err(|e| AppError::FeedUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(AppError::FeedUnavailable(format!(
                "Google Sheets API error: {message}"
            )));
        }

        let payload: ValuesResponse = response
            .json()
            .await
            .map_err(|e| AppError::FeedUnavailable(e.to_string()))?;

        let rows = payload.values.unwrap_or_default();
        if rows.len() <= 1 {
            return Err(AppError::FeedUnavailable(
                "No data found in Google Sheets.".to_string(),
            ));
        }

        let items = parse_rows(&rows);
        tracing::debug!(rows = rows.len() - 1, kept = items.len(), "Parsed news sheet");
        Ok(items)
    }

    /// Loads the sheet, substituting the sample set on any failure.
    pub async fn load_or_fallback(&self) -> FeedLoad {
        if self.source.api_key.is_none() {
            tracing::warn!("Google Sheets API key is missing, using sample data");
            return FeedLoad::from_items(sample_news(), None);
        }

        match self.load().await {
            Ok(items) => FeedLoad::from_items(items, None),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load news feed, using sample data");
                FeedLoad::from_items(
                    sample_news(),
                    Some(format!(
                        "Failed to load news data, showing sample data instead. ({e})"
                    )),
                )
            }
        }
    }
}

/// Maps sheet rows to news items. Row 0 is the header.
pub fn parse_rows(rows: &[Vec<Value>]) -> Vec<NewsItem> {
    rows.iter()
        .skip(1)
        .enumerate()
        .map(|(index, row)| {
            let id = cell(row, COL_ID);
            NewsItem {
                id: if id.is_empty() {
                    format!("news-{index}")
                } else {
                    id
                },
                title: cell(row, COL_TITLE),
                keyword: cell(row, COL_KEYWORD),
                source: cell(row, COL_SOURCE),
                tags: cell(row, COL_TAGS),
                url: cell(row, COL_URL),
                date: cell(row, COL_DATE),
                summary: cell(row, COL_SUMMARY),
                likes: parse_likes(&cell(row, COL_LIKES)),
            }
        })
        .filter(|news| !news.title.is_empty() && !news.url.is_empty())
        .collect()
}

fn cell(row: &[Value], index: usize) -> String {
    match row.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Leading-integer parse: `"12 likes"` is 12, anything unparseable is 0.
fn parse_likes(raw: &str) -> i64 {
    let raw = raw.trim_start();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rows(value: Value) -> Vec<Vec<Value>> {
        serde_json::from_value(value).unwrap()
    }

    fn source(base_url: &str, api_key: Option<&str>) -> FeedSource {
        FeedSource {
            base_url: base_url.to_string(),
            sheet_id: "sheet-1".to_string(),
            api_key: api_key.map(str::to_string),
            ..FeedSource::default()
        }
    }

    #[test]
    fn parse_rows_maps_columns_and_drops_incomplete_rows() {
        let rows = rows(json!([
            ["title", "keyword", "source", "tags", "url", "date", "summary", "likes", "id"],
            ["A", "토스", "매일경제", "#추천", "https://a", "2025-08-01", "s", "7", "id-a"],
            ["", "k", "s", "", "https://no-title", "2025-08-01"],
            ["No url", "k", "s", "", "", "2025-08-01"],
            ["B", "카카오", "전자신문", "", "https://b", "2025-07-31"]
        ]));

        let items = parse_rows(&rows);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "id-a");
        assert_eq!(items[0].keyword, "토스");
        assert_eq!(items[0].likes, 7);
        assert_eq!(items[1].title, "B");
        // Synthesized from the data-row index, counted before filtering.
        assert_eq!(items[1].id, "news-3");
        assert_eq!(items[1].summary, "");
        assert_eq!(items[1].likes, 0);
    }

    #[test]
    fn parse_rows_accepts_numeric_cells() {
        let rows = rows(json!([
            ["header"],
            ["A", "", "", "", "https://a", "2025-08-01", "", 42]
        ]));
        assert_eq!(parse_rows(&rows)[0].likes, 42);
    }

    #[test]
    fn likes_parse_leading_integer() {
        assert_eq!(parse_likes("12"), 12);
        assert_eq!(parse_likes(" 12abc"), 12);
        assert_eq!(parse_likes("-3"), -3);
        assert_eq!(parse_likes("abc"), 0);
        assert_eq!(parse_likes(""), 0);
    }

    #[tokio::test]
    async fn load_reads_values_from_sheets_api() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/news"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "news!A1:I3",
                "values": [
                    ["title", "keyword", "source", "tags", "url", "date"],
                    ["A", "", "", "", "https://a", "2025-07-30"],
                    ["B", "", "", "", "https://b", "2025-08-02"]
                ]
            })))
            .mount(&mock_server)
            .await;

        let loader = SheetsFeedLoader::new(source(&mock_server.uri(), Some("secret"))).unwrap();
        let load = loader.load_or_fallback().await;

        assert!(load.notice.is_none());
        assert_eq!(load.items.len(), 2);
        assert_eq!(load.latest_date.as_deref(), Some("2025-08-02"));
    }

    #[tokio::test]
    async fn api_error_message_is_surfaced() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key not valid" }
            })))
            .mount(&mock_server)
            .await;

        let loader = SheetsFeedLoader::new(source(&mock_server.uri(), Some("bad"))).unwrap();
        let err = loader.load().await.unwrap_err();

        assert!(matches!(err, AppError::FeedUnavailable(_)));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn header_only_sheet_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "values": [["title"]] })),
            )
            .mount(&mock_server)
            .await;

        let loader = SheetsFeedLoader::new(source(&mock_server.uri(), Some("k"))).unwrap();
        let load = loader.load_or_fallback().await;

        assert_eq!(load.items.len(), 4);
        assert!(load.notice.unwrap().contains("No data found"));
    }

    #[tokio::test]
    async fn missing_key_uses_samples_without_notice() {
        let loader = SheetsFeedLoader::new(source("http://127.0.0.1:9", None)).unwrap();
        let load = loader.load_or_fallback().await;

        assert_eq!(load.items.len(), 4);
        assert!(load.notice.is_none());
        assert_eq!(load.latest_date.as_deref(), Some("2025-08-01"));
    }
}
