pub mod authorization;
pub mod capture_backend;
pub mod capture_delegate;
