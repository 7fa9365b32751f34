pub mod aggregate;
pub mod app;
pub mod batch;
pub mod config;
pub mod domain;
pub mod ebird;
pub mod error;
pub mod limiter;
pub mod output;
pub mod retry;
