//! Convert radio-interferometer visibility data between a sparse, per-record
//! stream representation and a dense, regularly gridded representation.
//!
//! The stream side is a sequence of one record per (time, baseline,
//! polarisation) sample behind the [`stream::UvSource`]/[`stream::UvSink`]
//! traits; the gridded side is a [`UvDataSet`], whose arrays are indexed by
//! (time x baseline row, spectral window, frequency channel, polarisation).
//! [`read`] reconstructs a consistent grid from irregular, possibly
//! incomplete stream input; [`write`] is its exact inverse.

pub mod antenna;
pub mod baseline;
pub mod read;
pub mod stream;
pub mod telescopes;
pub mod write;


use hifitime::Epoch;
use marlu::{c32, constants::VEL_C, LatLngHeight, RADec};
use ndarray::{Array2, Array4, Axis};
use vec1::Vec1;

use antenna::AntennaRegistry;
use stream::PolCode;

pub use read::{read, ReadError, ReadOptions};
pub use write::{write, WriteError, WriteOptions};

/// Metres of baseline per light-travel nanosecond, the stream's native uvw
/// unit.
pub(crate) const METRES_PER_LIGHT_NS: f64 = VEL_C / 1e9;

/// Roughly a milliarcsecond, in radians.
pub(crate) const ANGLE_TOL_RAD: f64 = 2.0 * std::f64::consts::PI * 1e-3 / (60.0 * 60.0 * 24.0);

/// The numeric tolerances a dataset is reconciled and checked with.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    /// Relative tolerance on frequency comparisons.
    pub freq_rtol: f64,

    /// Absolute tolerance on frequency comparisons \[Hz\].
    pub freq_atol: f64,

    /// Absolute tolerance on pointing comparisons \[radians\].
    pub angle_atol: f64,

    /// Absolute tolerance on baseline-vector comparisons \[metres\].
    pub uvw_atol: f64,
}

impl Default for Tolerances {
    fn default() -> Tolerances {
        Tolerances {
            freq_rtol: 1e-5,
            freq_atol: 1e-8,
            angle_atol: ANGLE_TOL_RAD,
            uvw_atol: 1e-3,
        }
    }
}

/// How the data are phased.
#[derive(Debug, Clone)]
pub enum Phasing {
    /// A fixed phase centre was followed across time.
    Tracking {
        centre: RADec,
        /// The reference epoch of the centre coordinates (e.g. 2000.0).
        epoch: f64,
    },

    /// The pointing varies with each row, e.g. fixed to the local zenith.
    /// One entry per row.
    Drift { pointings: Vec<RADec> },
}

/// A dense, regularly gridded visibility dataset.
///
/// The rows are the cross product of every observed timestamp with every
/// unordered antenna pair drawn from the antennas seen in the stream, sorted
/// by time and then by pair. Rows for combinations that were never actually
/// observed hold zeros and are fully flagged.
pub struct UvDataSet {
    /// Complex visibilities, shaped (row, spectral window, channel,
    /// polarisation). There is always exactly one spectral window.
    pub data: Array4<c32>,

    /// True where a sample is flagged. Same shape as `data`.
    pub flags: Array4<bool>,

    /// Sample counts. Same shape as `data`.
    pub nsamples: Array4<f64>,

    /// Baseline vectors in metres, shaped (row, 3).
    pub uvws: Array2<f64>,

    /// The timestamp of each row.
    pub times: Vec<Epoch>,

    /// The first antenna number of each row. Never greater than the second.
    pub ant_1: Vec<u32>,

    /// The second antenna number of each row.
    pub ant_2: Vec<u32>,

    /// The baseline key of each row (see [`baseline`]).
    pub baselines: Vec<u32>,

    /// The polarisations present, in the order of the polarisation axis.
    pub pols: Vec1<PolCode>,

    /// Channel centre frequencies \[Hz\].
    pub freqs: Vec1<f64>,

    /// Channel width \[Hz\].
    pub channel_width: f64,

    /// Integration time \[s\].
    pub integration_time: f64,

    /// The observing target.
    pub source: String,

    pub telescope_name: String,

    /// The telescope location, if it could be determined.
    pub location: Option<LatLngHeight>,

    pub history: String,

    /// The units of `data`, e.g. "UNCALIB".
    pub vis_units: String,

    pub phasing: Phasing,

    /// Antenna numbering, positions and names.
    pub antennas: AntennaRegistry,

    /// How many antennas appear in the visibilities. At most
    /// `antennas.num_ants()`.
    pub num_ants_data: usize,

    pub tolerances: Tolerances,
}

impl UvDataSet {
    pub fn num_blts(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn num_spws(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn num_chans(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn num_pols(&self) -> usize {
        self.data.len_of(Axis(3))
    }

    /// The number of unique timestamps.
    pub fn num_times(&self) -> usize {
        let mut keys: Vec<i128> = self.times.iter().map(|&t| read::grid::time_key(t)).collect();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    }

    /// The number of unique baselines.
    pub fn num_bls(&self) -> usize {
        let mut keys = self.baselines.clone();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    }
}
