//! Reading a sparse visibility stream into a gridded dataset.
//!
//! One full pass over the stream accumulates every record, grouped by
//! polarisation. The canonical row grid is then derived from the accumulated
//! timestamps and antenna indices, the records are scattered into dense
//! arrays, the per-polarisation copies of uvw/ra/dec are collapsed to one
//! value per row, and finally the phasing (tracking or drift) is classified
//! from the reconciled pointing.

mod error;
pub(crate) mod grid;

pub use error::ReadError;

use std::collections::BTreeSet;

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use marlu::{LatLngHeight, RADec};
use ndarray::prelude::*;
use vec1::Vec1;

use crate::{
    antenna::AntennaRegistry,
    baseline,
    stream::{PolCode, UvHeader, UvRecord, UvSource},
    telescopes, Phasing, Tolerances, UvDataSet, ANGLE_TOL_RAD, METRES_PER_LIGHT_NS,
};
use grid::{BltGrid, GridError};

/// Options for [`read`].
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Only matters when the stream header has no altitude and the telescope
    /// is known: take the known latitude and longitude as well as the known
    /// altitude, rather than keeping the header's latitude and longitude.
    pub correct_lat_lon: bool,
}

impl Default for ReadOptions {
    fn default() -> ReadOptions {
        ReadOptions {
            correct_lat_lon: true,
        }
    }
}

/// A mean consecutive-RA difference below this means the pointing is fixed
/// \[radians\].
const TRACKING_TOL: f64 = 1e-8;

/// Read a visibility stream into a gridded dataset.
pub fn read<S: UvSource>(source: &mut S, options: ReadOptions) -> Result<UvDataSet, ReadError> {
    let header = source.header()?;
    let num_chans = header.num_chans;
    if num_chans == 0 {
        return Err(ReadError::NoChannels);
    }

    let location = resolve_location(&header, options.correct_lat_lon);

    // Scan the stream, grouping records by polarisation in first-appearance
    // order.
    let mut accumulator: IndexMap<PolCode, Vec<UvRecord>> = IndexMap::new();
    let mut source_name: Option<String> = None;
    while let Some(record) = source.next_record()? {
        if record.num_spws != 1 {
            return Err(ReadError::MultipleSpws(record.num_spws));
        }
        let lengths = [
            record.data.len(),
            record.flags.len(),
            record.nsamples.as_ref().map_or(num_chans, |ns| ns.len()),
        ];
        if let Some(&got) = lengths.iter().find(|&&l| l != num_chans) {
            return Err(ReadError::WrongSpectrumLength {
                time_gps: record.timestamp.to_gpst_seconds(),
                expected: num_chans,
                got,
            });
        }
        match source_name.as_deref() {
            None => source_name = Some(record.source.clone()),
            Some(first) if first != record.source => {
                return Err(ReadError::MultipleSources {
                    first: first.to_string(),
                    second: record.source.clone(),
                });
            }
            Some(_) => (),
        }
        accumulator
            .entry(record.pol)
            .or_insert_with(Vec::new)
            .push(record);
    }
    if accumulator.is_empty() {
        return Err(ReadError::NoRecords);
    }

    let pols: Vec<PolCode> = accumulator.keys().copied().collect();
    if pols.len() != header.num_pols {
        warn!(
            "npol={} but found {} polarisations in the stream",
            header.num_pols,
            pols.len()
        );
    }
    let num_pols = pols.len();
    debug!("Polarisations found: {}", pols.iter().join(", "));

    // All timestamps ever listed in the stream, and the union of antenna
    // indices appearing as either member of a pair.
    let mut timestamps = Vec::new();
    let mut ants = BTreeSet::new();
    for record in accumulator.values().flatten() {
        timestamps.push(record.timestamp);
        ants.insert(record.ant_pair.0);
        ants.insert(record.ant_pair.1);
    }
    let num_ants_data = ants.len();

    let grid = BltGrid::new(timestamps, &ants)?;
    debug!(
        "Grid: {} times x {} baselines = {} rows",
        grid.num_times(),
        grid.num_bls(),
        grid.num_blts()
    );

    let antennas = AntennaRegistry::from_stream(
        header.num_ants,
        header.antenna_numbers.clone(),
        header.antenna_positions.clone(),
        header.antenna_names.clone(),
        &ants,
    )?;

    // Cross check any counts the stream declared against the reconstruction.
    if let Some(n) = header.num_blts {
        if n != grid.num_blts() {
            warn!(
                "nblts ({n}) does not match the number of unique blts in the data ({})",
                grid.num_blts()
            );
        }
    }
    if let Some(n) = header.num_times {
        if n != grid.num_times() {
            warn!(
                "ntimes ({n}) does not match the number of unique times in the data ({})",
                grid.num_times()
            );
        }
    }
    if let Some(n) = header.num_bls {
        if n != grid.num_bls() {
            warn!(
                "nbls ({n}) does not match the number of unique baselines in the data ({})",
                grid.num_bls()
            );
        }
    }

    // Slot the records into the grid. Missing data stays zeroed and flagged.
    let num_blts = grid.num_blts();
    let shape = (num_blts, 1, num_chans, num_pols);
    let mut data = Array4::zeros(shape);
    let mut flags = Array4::from_elem(shape, true);
    let mut nsamples = Array4::ones(shape);
    // uvw/ra/dec arrive once per polarisation; hold every copy until the
    // polarisation axis can be collapsed.
    let mut uvw_cands = Array3::zeros((num_blts, 3, num_pols));
    let mut ra_cands = Array2::zeros((num_blts, num_pols));
    let mut dec_cands = Array2::zeros((num_blts, num_pols));

    for (pol_ind, records) in accumulator.values().enumerate() {
        for record in records {
            let key = baseline::encode(record.ant_pair.0, record.ant_pair.1)
                .map_err(GridError::from)?;
            let row = grid.row(record.timestamp, key)?;
            for (c, &d) in record.data.iter().enumerate() {
                data[[row, 0, c, pol_ind]] = d;
            }
            for (c, &f) in record.flags.iter().enumerate() {
                flags[[row, 0, c, pol_ind]] = f;
            }
            if let Some(ns) = record.nsamples.as_ref() {
                for (c, &n) in ns.iter().enumerate() {
                    nsamples[[row, 0, c, pol_ind]] = n;
                }
            }
            let uvw_m = record.uvw * METRES_PER_LIGHT_NS;
            uvw_cands[[row, 0, pol_ind]] = uvw_m.u;
            uvw_cands[[row, 1, pol_ind]] = uvw_m.v;
            uvw_cands[[row, 2, pol_ind]] = uvw_m.w;
            ra_cands[[row, pol_ind]] = record.pointing.ra;
            dec_cands[[row, pol_ind]] = record.pointing.dec;
        }
    }
    drop(accumulator);

    // Collapse the per-polarisation uvw/ra/dec candidates to one value per
    // row, keyed on which polarisations have unflagged data there.
    let tolerances = Tolerances::default();
    let mut uvws = Array2::zeros((num_blts, 3));
    let mut ras = vec![0.0; num_blts];
    let mut decs = vec![0.0; num_blts];
    for row in 0..num_blts {
        let good_pols: Vec<usize> = (0..num_pols)
            .filter(|&p| flags.slice(s![row, .., .., p]).iter().any(|&f| !f))
            .collect();
        let pick = match good_pols.as_slice() {
            // Only one polarisation has data here; it's authoritative.
            [only] => *only,

            // No polarisation has data here; fall back to the first slot.
            [] => 0,

            // Several polarisations have data; they must agree.
            [first, rest @ ..] => {
                for &p in rest {
                    for k in 0..3 {
                        if (uvw_cands[[row, k, p]] - uvw_cands[[row, k, *first]]).abs()
                            > tolerances.uvw_atol
                        {
                            return Err(ReadError::PolarisationDependentUvw { row });
                        }
                    }
                    if (ra_cands[[row, p]] - ra_cands[[row, *first]]).abs() > tolerances.angle_atol
                    {
                        return Err(ReadError::PolarisationDependentRa { row });
                    }
                    if (dec_cands[[row, p]] - dec_cands[[row, *first]]).abs()
                        > tolerances.angle_atol
                    {
                        return Err(ReadError::PolarisationDependentDec { row });
                    }
                }
                *first
            }
        };
        for k in 0..3 {
            uvws[[row, k]] = uvw_cands[[row, k, pick]];
        }
        ras[row] = ra_cands[[row, pick]];
        decs[row] = dec_cands[[row, pick]];
    }

    // If the RA of the rows with data is constant throughout, the stream was
    // tracking a fixed phase centre; otherwise it was drift scanning.
    let good_rows: Vec<usize> = (0..num_blts)
        .filter(|&r| flags.slice(s![r, .., .., ..]).iter().any(|&f| !f))
        .collect();
    let is_tracking = if good_rows.len() >= 2 {
        let n = (good_rows.len() - 1) as f64;
        let mean_diff: f64 = good_rows
            .windows(2)
            .map(|w| ras[w[1]] - ras[w[0]])
            .sum::<f64>()
            / n;
        mean_diff.abs() < TRACKING_TOL
    } else {
        false
    };
    let phasing = if is_tracking {
        let first = good_rows[0];
        Phasing::Tracking {
            centre: RADec::from_radians(ras[first], decs[first]),
            epoch: header.epoch.ok_or(ReadError::NoEpoch)?,
        }
    } else {
        Phasing::Drift {
            pointings: ras
                .iter()
                .zip(decs.iter())
                .map(|(&ra, &dec)| RADec::from_radians(ra, dec))
                .collect(),
        }
    };

    let freqs = Vec1::try_from_vec(
        (0..num_chans)
            .map(|c| header.start_freq + c as f64 * header.channel_width)
            .collect(),
    )
    .expect("num_chans was checked to be non-zero");

    let mut history = header.history;
    let version_marker = format!("uvgrid {}", env!("CARGO_PKG_VERSION"));
    if !history.contains(&version_marker) {
        if !history.is_empty() && !history.ends_with('\n') {
            history.push('\n');
        }
        history.push_str(&version_marker);
    }

    Ok(UvDataSet {
        data,
        flags,
        nsamples,
        uvws,
        times: grid.row_times,
        ant_1: grid.ant_1,
        ant_2: grid.ant_2,
        baselines: grid.baselines,
        pols: Vec1::try_from_vec(pols).expect("at least one record was accumulated"),
        freqs,
        channel_width: header.channel_width,
        integration_time: header.integration_time,
        source: source_name.expect("at least one record was accumulated"),
        telescope_name: header.telescope_name,
        location,
        history,
        vis_units: "UNCALIB".to_string(),
        phasing,
        antennas,
        num_ants_data,
        tolerances,
    })
}

/// Determine the telescope location. A header altitude settles it; without
/// one the known-telescope registry is consulted and its latitude/longitude
/// compared against the header's.
fn resolve_location(header: &UvHeader, correct_lat_lon: bool) -> Option<LatLngHeight> {
    if let Some(altitude) = header.altitude_m {
        return Some(LatLngHeight {
            longitude_rad: header.longitude_rad,
            latitude_rad: header.latitude_rad,
            height_metres: altitude,
        });
    }

    let name = &header.telescope_name;
    let known = match telescopes::known_location(name) {
        Some(k) => k,
        None => {
            warn!(
                "Altitude is not present in the stream, and telescope {name} is not in the known list; telescope location not set"
            );
            return None;
        }
    };

    let lat_close = (known.latitude_rad - header.latitude_rad).abs() <= ANGLE_TOL_RAD;
    let lon_close = (known.longitude_rad - header.longitude_rad).abs() <= ANGLE_TOL_RAD;
    if lat_close && lon_close {
        if correct_lat_lon {
            warn!("Altitude is not present in the stream; using known location values for {name}");
        } else {
            warn!(
                "Altitude is not present in the stream; using the known altitude for {name} and lat/lon from the stream"
            );
        }
    } else {
        let what = if !lat_close && !lon_close {
            "latitude and longitude values do not match values"
        } else if !lat_close {
            "latitude value does not match value"
        } else {
            "longitude value does not match value"
        };
        if correct_lat_lon {
            warn!(
                "Altitude is not present in the stream and {what} for {name} in known telescopes; using values from known telescopes"
            );
        } else {
            warn!(
                "Altitude is not present in the stream and {what} for {name} in known telescopes; using the known altitude and lat/lon from the stream"
            );
        }
    }

    Some(if correct_lat_lon {
        known
    } else {
        LatLngHeight {
            longitude_rad: header.longitude_rad,
            latitude_rad: header.latitude_rad,
            height_metres: known.height_metres,
        }
    })
}
