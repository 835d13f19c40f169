#[macro_use]
pub mod macros;
pub mod buffer3;
pub mod log_setup;
pub mod parallel;

pub use buffer3::Buffer3;
pub use log_setup::LogConfig;
