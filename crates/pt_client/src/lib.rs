pub mod api;
pub mod generator;

pub use api::{HttpNewsApi, NewsApi};
pub use generator::{Generation, NewsGenerator};

pub mod prelude {
    pub use super::api::{HttpNewsApi, NewsApi};
    pub use super::generator::{Generation, NewsGenerator};
    pub use pt_core::{Error, Result};
}
