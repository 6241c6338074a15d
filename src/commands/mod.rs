//! Command implementations

pub mod check;
pub mod clamp;
pub mod dedupe;
pub mod escapes;
pub mod fetch;
pub mod generate;
pub mod links;
pub mod list;
pub mod prompts;
pub mod reassign;
pub mod scrape_mgs;
pub mod tags;
