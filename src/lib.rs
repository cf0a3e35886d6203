// src/lib.rs
pub mod analysis;
pub mod config;
pub mod error;
pub mod io;
pub mod processing;
pub mod scene;
pub mod utils;

pub use error::{Error, Result};
pub use scene::{Band, QualityFlag, Scene};

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
