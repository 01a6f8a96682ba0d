use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author id recorded on comments written by the AI responder.
pub const AI_AUTHOR: &str = "AI";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub news_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(news_id: &str) -> Self {
        Self {
            news_id: news_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

/// Shared up/down tally for one article's insight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightMetric {
    #[serde(default, deserialize_with = "lenient_count")]
    pub upvotes: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub downvotes: u64,
}

/// Accepts any JSON number. Fractions truncate, negatives clamp to 0.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Number::deserialize(deserializer)?;
    Ok(match value.as_u64() {
        Some(n) => n,
        None => value.as_f64().map_or(0, |f| f.max(0.0) as u64),
    })
}

impl InsightMetric {
    pub fn with_vote(self, vote: Vote) -> Self {
        match vote {
            Vote::Up => Self {
                upvotes: self.upvotes + 1,
                ..self
            },
            Vote::Down => Self {
                downvotes: self.downvotes + 1,
                ..self
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentRole {
    User,
    Ai,
}

/// Comment body as written to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub news_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub role: CommentRole,
}

impl NewComment {
    pub fn user(news_id: &str, text: &str, user_id: &str) -> Self {
        Self {
            news_id: news_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            role: CommentRole::User,
        }
    }

    pub fn ai(news_id: &str, text: &str) -> Self {
        Self {
            news_id: news_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            user_id: AI_AUTHOR.to_string(),
            role: CommentRole::Ai,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightComment {
    pub id: String,
    pub news_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub role: CommentRole,
}

impl InsightComment {
    pub fn from_parts(id: String, comment: NewComment) -> Self {
        Self {
            id,
            news_id: comment.news_id,
            text: comment.text,
            timestamp: comment.timestamp,
            user_id: comment.user_id,
            role: comment.role,
        }
    }
}
