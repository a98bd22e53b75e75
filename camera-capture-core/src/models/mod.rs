pub mod capture_result;
pub mod config;
pub mod device;
pub mod error;
pub mod flash;
pub mod geometry;
pub mod orientation;
