pub mod config;
pub mod error;
pub mod models;
pub mod schema;
pub mod search;
pub mod source;
pub mod sync;

pub use config::{SourceSettings, SyncConfig, TypesenseConfig};
pub use error::SyncError;
pub use search::TypesenseClient;
pub use source::{RowSource, SourceBackend};
pub use sync::{SyncReport, run_sync};

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,sqlx=warn,reqwest=warn"),
        )
        .init();
    });
}
