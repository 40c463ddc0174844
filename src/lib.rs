//! Article extraction: fetch a news page, find the story body among the site
//! furniture, clean it, and hand back publishable HTML.

pub mod cache;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod prewarm;
pub mod urls;

pub use cache::ExtractionCache;
pub use extractor::{ExtractError, ExtractionMetadata, ExtractionResult, Extractor, StrategyTag};
pub use prewarm::{PrewarmReport, prewarm};
pub use urls::normalize_url;
