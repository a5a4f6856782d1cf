//! The boundary to the underlying sequential stream format.
//!
//! The byte-level codec lives outside this crate; it presents a stream as a
//! typed [`UvHeader`] followed by [`UvRecord`]s, and accepts the same shapes
//! for writing. All quantities cross this boundary in normalised units (Hz,
//! radians, metres, seconds); any unit or representation quirks of a concrete
//! format (a channel width stored in GHz, names packed into numeric arrays)
//! are the codec adapter's to handle.

pub mod mem;

use hifitime::Epoch;
use marlu::{c32, RADec, UVW};
use ndarray::Array2;
use thiserror::Error;

/// Errors produced by stream codecs.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("The required header item '{0}' is missing from the stream")]
    MissingHeaderItem(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Backend(String),
}

/// A polarisation, identified by its AIPS integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum PolCode {
    I = 1,
    Q = 2,
    U = 3,
    V = 4,
    Rr = -1,
    Ll = -2,
    Rl = -3,
    Lr = -4,
    Xx = -5,
    Yy = -6,
    Xy = -7,
    Yx = -8,
}

impl PolCode {
    /// The polarisation for an AIPS integer code, if the code is recognised.
    pub fn from_code(code: i32) -> Option<PolCode> {
        match code {
            1 => Some(PolCode::I),
            2 => Some(PolCode::Q),
            3 => Some(PolCode::U),
            4 => Some(PolCode::V),
            -1 => Some(PolCode::Rr),
            -2 => Some(PolCode::Ll),
            -3 => Some(PolCode::Rl),
            -4 => Some(PolCode::Lr),
            -5 => Some(PolCode::Xx),
            -6 => Some(PolCode::Yy),
            -7 => Some(PolCode::Xy),
            -8 => Some(PolCode::Yx),
            _ => None,
        }
    }

    pub fn code(self) -> i8 {
        self as i8
    }
}

impl std::fmt::Display for PolCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            PolCode::I => "I",
            PolCode::Q => "Q",
            PolCode::U => "U",
            PolCode::V => "V",
            PolCode::Rr => "RR",
            PolCode::Ll => "LL",
            PolCode::Rl => "RL",
            PolCode::Lr => "LR",
            PolCode::Xx => "XX",
            PolCode::Yy => "YY",
            PolCode::Xy => "XY",
            PolCode::Yx => "YX",
        };
        write!(f, "{s}")
    }
}

/// The stream header. Codecs are expected to resolve every required field
/// before the first record is handed over; the optional fields genuinely may
/// be absent from a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct UvHeader {
    /// The number of frequency channels per spectrum.
    pub num_chans: usize,

    /// The number of polarisations the stream claims to contain. Cross
    /// checked against the polarisations actually found.
    pub num_pols: usize,

    /// Integration time \[s\].
    pub integration_time: f64,

    /// Channel width \[Hz\].
    pub channel_width: f64,

    /// Frequency of the first channel centre \[Hz\].
    pub start_freq: f64,

    /// The observing target.
    pub source: String,

    pub telescope_name: String,

    /// Telescope latitude \[radians\].
    pub latitude_rad: f64,

    /// Telescope longitude \[radians\].
    pub longitude_rad: f64,

    /// Telescope altitude \[m\]. Not all streams carry one; see
    /// [`crate::telescopes`] for what happens then.
    pub altitude_m: Option<f64>,

    /// The number of rows in the stream's antenna position table (which may
    /// be inflated; see [`crate::antenna`]).
    pub num_ants: usize,

    /// The logical antenna number for each compact antenna index. Only
    /// present if the stream was written by software that tracks numbers.
    pub antenna_numbers: Option<Vec<u32>>,

    /// Antenna positions, one row of 3 per antenna, `num_ants` rows.
    pub antenna_positions: Option<Array2<f64>>,

    /// Antenna names. A side channel; formats without native string arrays
    /// pack these however they like, their codecs unpack them here.
    pub antenna_names: Option<Vec<String>>,

    pub history: String,

    /// Reference epoch of the phase centre (e.g. 2000.0). Only meaningful
    /// for tracking data.
    pub epoch: Option<f64>,

    /// Declared unique-time count, for cross checking.
    pub num_times: Option<usize>,

    /// Declared unique-baseline count, for cross checking.
    pub num_bls: Option<usize>,

    /// Declared row count, for cross checking.
    pub num_blts: Option<usize>,
}

/// One visibility record: a single (time, baseline, polarisation) sample.
#[derive(Debug, Clone)]
pub struct UvRecord {
    /// The baseline vector in the stream's native light-travel nanoseconds.
    pub uvw: UVW,

    pub timestamp: Epoch,

    /// 0-based antenna indices as used by the native format. For this format
    /// they double as the logical antenna numbers.
    pub ant_pair: (u32, u32),

    pub pol: PolCode,

    /// The complex spectrum, one value per channel.
    pub data: Vec<c32>,

    /// True where a channel is flagged.
    pub flags: Vec<bool>,

    /// Sample counts, one per channel. Absent means unit counts.
    pub nsamples: Option<Vec<f64>>,

    /// Where this record points \[radians\].
    pub pointing: RADec,

    /// The observing target this record belongs to.
    pub source: String,

    /// How many spectral windows the spectrum spans. Anything other than 1
    /// is rejected by the reader.
    pub num_spws: usize,
}

/// A stream being read. One pass: [`UvSource::header`] first, then
/// [`UvSource::next_record`] until it returns `None`.
pub trait UvSource {
    fn header(&mut self) -> Result<UvHeader, StreamError>;

    fn next_record(&mut self) -> Result<Option<UvRecord>, StreamError>;
}

/// A stream being written. The header must be declared before any record.
pub trait UvSink {
    /// Does the destination already exist?
    fn exists(&self) -> bool;

    /// Remove whatever is at the destination.
    fn clobber(&mut self) -> Result<(), StreamError>;

    fn write_header(&mut self, header: &UvHeader) -> Result<(), StreamError>;

    fn write_record(&mut self, record: &UvRecord) -> Result<(), StreamError>;

    /// Flush anything the codec has buffered.
    fn finalise(&mut self) -> Result<(), StreamError>;
}
