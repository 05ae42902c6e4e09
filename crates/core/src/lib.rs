pub mod config;
pub mod draft;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AffiliateError, AffiliateResult};
