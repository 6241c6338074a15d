//! Content module - article files, front matter and the content store

pub mod article;
mod frontmatter;
mod store;

pub use article::Article;
pub use frontmatter::{quote, split, FrontMatter, FrontMatterError};
pub use store::{ContentStore, StoreError};
