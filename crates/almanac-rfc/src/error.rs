use thiserror::Error;

use crate::ical::parse::ParseError;

/// RFC parsing and validation errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Core(#[from] almanac_core::error::CoreError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
