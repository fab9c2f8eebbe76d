pub mod activity;
pub mod cache;
pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod html;
pub mod kinds;
pub mod model;
pub mod prompt;
pub mod reduce;
pub mod refresher;
pub mod tokens;

pub use activity::{ActivityLog, LogSource};
pub use cache::{CacheStatus, CacheStore, Caches, Snapshot};
pub use config::{CacheConfig, Config, ModelConfig, PromptConfig};
pub use engine::{is_no_data_sentinel, QueryEngine};
pub use error::{Result, WayfarerError};
pub use fetch::{fetch_or_empty, ContentSource, GraphqlFetcher};
pub use kinds::ContentKind;
pub use model::{Completion, GeminiModel, GenerativeModel};
pub use reduce::{
    reduce, reduce_all, RawRecord, ReducedEvent, ReducedPage, ReducedRecord, Reduction,
    ReductionFailure,
};
pub use refresher::{BackgroundRefresher, RefresherHandle};
pub use tokens::{ReductionStats, TokenCounter};
