//! SQLite storage implementation for news articles.

mod model;
mod repository;

pub use model::{NewsArticleChangesetDB, NewsArticleDB};
pub use repository::NewsRepository;
