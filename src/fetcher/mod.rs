pub mod backoff;
pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::{FetchConfig, Fetcher, HttpTransport, ReqwestTransport, USER_AGENTS};
pub use errors::FetchError;
pub use types::{Charset, FetchOptions, PageRequest, PageResponse};
