pub mod config;
pub mod engine;
pub mod session;
pub mod settings;
pub mod signal;
pub mod storage;
pub mod upload;
