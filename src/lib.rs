pub mod config;
pub mod db_mongo;
pub mod error;
pub mod exchange;
pub mod store;

pub use config::StoreConfig;
pub use db_mongo::{MongoStore, models::ExchangeRate};
pub use error::{ConfigError, StoreError};
pub use store::DocumentStore;
