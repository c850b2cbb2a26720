pub mod config;
pub mod error;
pub mod fs;
pub mod types;

pub use config::*;
pub use error::*;
pub use fs::*;
pub use types::*;
