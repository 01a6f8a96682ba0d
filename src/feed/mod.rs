mod fetcher;
mod sample;

pub use fetcher::{parse_rows, FeedLoad, SheetsFeedLoader};
pub use sample::sample_news;
