//! Configuration, file system paths, and logging setup for RAG Master.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, FileConfig, SupabaseSettings, DEFAULT_LOG_LEVEL, ENV_LOG_LEVEL, ENV_SUPABASE_ANON_KEY,
    ENV_SUPABASE_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
