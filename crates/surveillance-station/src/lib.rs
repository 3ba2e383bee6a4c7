pub mod command;
pub mod config;
pub mod logging;
pub mod station;

mod error;

pub use config::Config;
pub use error::{Error, Result};
pub use station::Station;
