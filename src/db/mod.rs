mod schema;
mod store;

pub use store::{Document, DocumentStore, Snapshot, SqliteStore, Subscription};
