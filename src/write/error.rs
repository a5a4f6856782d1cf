//! Errors when writing a gridded dataset out as a visibility stream.

use thiserror::Error;

use crate::{baseline::BaselineError, stream::StreamError};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Only single-spectral-window datasets can be written; this one has {0}")]
    MultipleSpws(usize),

    #[error("The frequencies are not evenly spaced (spacings range from {min} to {max} Hz), probably because of a select operation; the stream format does not support unevenly spaced frequencies")]
    UnevenChannelSpacing { min: f64, max: f64 },

    #[error("The frequencies are separated by {spacing} Hz, not the channel width of {width} Hz, probably because of a select operation; the stream format does not support frequencies spaced by more than their channel width")]
    SpacingNotChannelWidth { spacing: f64, width: f64 },

    #[error("The dataset has no telescope location to write")]
    NoTelescopeLocation,

    #[error("The destination already exists; pass the clobber option to overwrite it")]
    DestinationExists,

    #[error(transparent)]
    Baseline(#[from] BaselineError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}
