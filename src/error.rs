use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LifermapError {
    #[error("invalid region code: {0}")]
    InvalidRegionCode(String),

    #[error("invalid species code: {0}")]
    InvalidSpeciesCode(String),

    #[error("invalid query key: {0}")]
    InvalidQueryKey(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("missing config file lifermap.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("eBird request failed: {0}")]
    EbirdHttp(String),

    #[error("eBird returned status {status}: {message}")]
    EbirdStatus { status: u16, message: String },

    #[error("unexpected eBird response shape: {0}")]
    MalformedResponse(String),

    #[error("missing eBird API token (set EBIRD_API_TOKEN)")]
    MissingApiToken,

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
