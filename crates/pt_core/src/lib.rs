pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HumanDuration, NewsConfig};
pub use error::{Error, Result};
pub use logging::{init_logging, Logger};
pub use models::{ChatProvider, TextStream};
pub use storage::StateBackend;
pub use types::{
    Article, ChatMessage, Completion, ExpandedArticle, NewsItem, NewsResponse, SectionData, BREAKING_NEWS,
};
