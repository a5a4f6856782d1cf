//! Writing a gridded dataset back out as a visibility stream.
//!
//! The exact inverse of [`crate::read`]: one record is emitted per (row,
//! polarisation), in ascending row order, after the whole dataset has passed
//! the format's preconditions. Nothing is written to the sink until they all
//! hold.

mod error;

pub use error::WriteError;

use log::{debug, info};
use marlu::UVW;
use ndarray::prelude::*;

use crate::{
    baseline,
    stream::{UvHeader, UvRecord, UvSink},
    Phasing, UvDataSet, METRES_PER_LIGHT_NS,
};

/// Options for [`write`].
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Overwrite the destination if it already exists.
    pub clobber: bool,

    /// Emit the antenna number table, so that a later read reconstructs the
    /// registry exactly. Without the table a reader falls back to inferring
    /// the registry from positions and visibilities, and the antenna count
    /// may differ.
    pub write_antenna_numbers: bool,
}

impl Default for WriteOptions {
    fn default() -> WriteOptions {
        WriteOptions {
            clobber: false,
            write_antenna_numbers: true,
        }
    }
}

/// Write a gridded dataset to a visibility stream sink.
pub fn write<S: UvSink>(
    dataset: &UvDataSet,
    sink: &mut S,
    options: WriteOptions,
) -> Result<(), WriteError> {
    let num_spws = dataset.num_spws();
    if num_spws != 1 {
        return Err(WriteError::MultipleSpws(num_spws));
    }

    // The frequency axis must be contiguous: evenly spaced, and spaced by
    // exactly the channel width. A select operation can break either.
    let tols = dataset.tolerances;
    if dataset.freqs.len() > 1 {
        let mut min_spacing = f64::INFINITY;
        let mut max_spacing = f64::NEG_INFINITY;
        for pair in dataset.freqs.windows(2) {
            let spacing = pair[1] - pair[0];
            min_spacing = min_spacing.min(spacing);
            max_spacing = max_spacing.max(spacing);
        }
        if !is_close(min_spacing, max_spacing, tols.freq_rtol, tols.freq_atol) {
            return Err(WriteError::UnevenChannelSpacing {
                min: min_spacing,
                max: max_spacing,
            });
        }
        if !is_close(
            max_spacing,
            dataset.channel_width,
            tols.freq_rtol,
            tols.freq_atol,
        ) {
            return Err(WriteError::SpacingNotChannelWidth {
                spacing: max_spacing,
                width: dataset.channel_width,
            });
        }
    }

    let location = dataset.location.ok_or(WriteError::NoTelescopeLocation)?;

    // Refuse up front anything the baseline encoding can't represent.
    if let Some(max) = dataset.antennas.max_number() {
        baseline::encode(0, max)?;
    }

    if sink.exists() {
        if options.clobber {
            info!("Destination exists: clobbering");
            sink.clobber()?;
        } else {
            return Err(WriteError::DestinationExists);
        }
    }

    let num_blts = dataset.num_blts();
    let num_chans = dataset.num_chans();
    let header = UvHeader {
        num_chans,
        num_pols: dataset.num_pols(),
        integration_time: dataset.integration_time,
        channel_width: dataset.channel_width,
        start_freq: *dataset.freqs.first(),
        source: dataset.source.clone(),
        telescope_name: dataset.telescope_name.clone(),
        latitude_rad: location.latitude_rad,
        longitude_rad: location.longitude_rad,
        altitude_m: Some(location.height_metres),
        num_ants: dataset.antennas.max_number().map_or(0, |m| m as usize + 1),
        antenna_numbers: if options.write_antenna_numbers {
            Some(dataset.antennas.numbers().to_vec())
        } else {
            None
        },
        antenna_positions: dataset.antennas.inflated_positions(),
        antenna_names: Some(dataset.antennas.names().to_vec()),
        history: dataset.history.clone(),
        epoch: match dataset.phasing {
            Phasing::Tracking { epoch, .. } => Some(epoch),
            Phasing::Drift { .. } => None,
        },
        num_times: Some(dataset.num_times()),
        num_bls: Some(dataset.num_bls()),
        num_blts: Some(num_blts),
    };
    debug!(
        "Writing header: {num_blts} rows, {num_chans} channels, {} polarisations",
        dataset.num_pols()
    );
    sink.write_header(&header)?;

    for row in 0..num_blts {
        let uvw = UVW {
            u: dataset.uvws[[row, 0]] / METRES_PER_LIGHT_NS,
            v: dataset.uvws[[row, 1]] / METRES_PER_LIGHT_NS,
            w: dataset.uvws[[row, 2]] / METRES_PER_LIGHT_NS,
        };
        let pointing = match &dataset.phasing {
            Phasing::Tracking { centre, .. } => *centre,
            Phasing::Drift { pointings } => pointings[row],
        };
        let (i, j) = (dataset.ant_1[row], dataset.ant_2[row]);

        for (pol_ind, &pol) in dataset.pols.iter().enumerate() {
            let mut data: Vec<_> = dataset.data.slice(s![row, 0, .., pol_ind]).to_vec();
            let flags = dataset.flags.slice(s![row, 0, .., pol_ind]).to_vec();
            let nsamples = dataset.nsamples.slice(s![row, 0, .., pol_ind]).to_vec();

            // The stream expects ant_1 <= ant_2; swapping a pair conjugates
            // the visibilities.
            let ant_pair = if i > j {
                for d in data.iter_mut() {
                    *d = d.conj();
                }
                (j, i)
            } else {
                (i, j)
            };

            sink.write_record(&UvRecord {
                uvw,
                timestamp: dataset.times[row],
                ant_pair,
                pol,
                data,
                flags,
                nsamples: Some(nsamples),
                pointing,
                source: dataset.source.clone(),
                num_spws: 1,
            })?;
        }
    }
    sink.finalise()?;
    debug!("Finished writing {num_blts} rows");

    Ok(())
}

fn is_close(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    (a - b).abs() <= atol + rtol * b.abs()
}
