mod insight;
mod keyword;
mod news;
mod store;

pub use insight::{InsightBoard, InsightEntry, InsightStatus};
pub use keyword::{KeywordCatalog, KeywordCategory, ManagementKeyword};
pub use news::{date_value, latest_date, NewsItem};
pub use store::{
    Bookmark, CommentRole, InsightComment, InsightMetric, NewComment, Vote, AI_AUTHOR,
};
