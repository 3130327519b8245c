pub mod collective;
pub mod config;
pub mod display;
pub mod driver;
pub mod errors;
pub mod path;
pub mod stat;
pub mod timing;
pub mod types;
