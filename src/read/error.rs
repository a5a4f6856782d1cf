//! Errors when reading a visibility stream into a gridded dataset.

use thiserror::Error;

use super::grid::GridError;
use crate::{antenna::AntennaError, stream::StreamError};

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("The stream contains no visibility records")]
    NoRecords,

    #[error("The stream header reports zero frequency channels")]
    NoChannels,

    #[error("This appears to be a multi-source stream ('{first}' and '{second}'), which is not supported")]
    MultipleSources { first: String, second: String },

    #[error("A record spans {0} spectral windows; streams with more than one spectral window are not supported")]
    MultipleSpws(usize),

    #[error("A record at GPS {time_gps} carries {got} channels, but the header says there are {expected}")]
    WrongSpectrumLength {
        time_gps: f64,
        expected: usize,
        got: usize,
    },

    #[error("uvw values are different by polarisation at row {row}")]
    PolarisationDependentUvw { row: usize },

    #[error("ra values are different by polarisation at row {row}")]
    PolarisationDependentRa { row: usize },

    #[error("dec values are different by polarisation at row {row}")]
    PolarisationDependentDec { row: usize },

    #[error("The data track a fixed phase centre, but the stream header has no reference epoch")]
    NoEpoch,

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Antenna(#[from] AntennaError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}
