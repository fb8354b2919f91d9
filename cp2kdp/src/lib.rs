pub mod constants;
pub mod error;
pub mod version;
pub mod logging;
pub mod cli;

pub mod core;
pub mod convert;

pub use cli::OptProcess;
pub use error::ConvertError;
