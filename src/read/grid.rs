//! The canonical (time, baseline) row grid of a dataset.

use std::collections::{BTreeSet, HashMap};

use hifitime::Epoch;
use thiserror::Error;

use crate::baseline::{self, BaselineError};

#[derive(Error, Debug)]
pub enum GridError {
    #[error(transparent)]
    Baseline(#[from] BaselineError),

    #[error("Grid construction produced more than one row for GPS {time_gps} and baseline key {baseline}")]
    DuplicateRow { time_gps: f64, baseline: u32 },

    #[error("No grid row corresponds to GPS {time_gps} and baseline key {baseline}")]
    NoSuchRow { time_gps: f64, baseline: u32 },
}

/// An exact, hashable key for a timestamp.
pub(crate) fn time_key(t: Epoch) -> i128 {
    (t - Epoch::from_jde_utc(0.0)).total_nanoseconds()
}

/// The full cross product of observed times with the unordered antenna pairs
/// (i <= j) drawn from the antenna-index union, in time-major order. Rows
/// exist for baselines never observed at a given time; those stay flagged and
/// zero when the grid is populated.
pub(crate) struct BltGrid {
    /// Unique timestamps, ascending.
    pub(crate) times: Vec<Epoch>,

    /// The timestamp of each row.
    pub(crate) row_times: Vec<Epoch>,

    /// The first antenna number of each row.
    pub(crate) ant_1: Vec<u32>,

    /// The second antenna number of each row. `ant_1[r] <= ant_2[r]`.
    pub(crate) ant_2: Vec<u32>,

    /// The baseline key of each row.
    pub(crate) baselines: Vec<u32>,

    num_bls: usize,
    rows: HashMap<(i128, u32), usize>,
}

impl BltGrid {
    /// `timestamps` may contain duplicates in any order; `ants` is the union
    /// of all first and second antenna indices seen in the stream.
    pub(crate) fn new(
        mut timestamps: Vec<Epoch>,
        ants: &BTreeSet<u32>,
    ) -> Result<BltGrid, GridError> {
        timestamps.sort_unstable_by_key(|&t| time_key(t));
        timestamps.dedup_by_key(|t| time_key(*t));

        let mut pairs = Vec::with_capacity(ants.len() * (ants.len() + 1) / 2);
        for &i in ants {
            for &j in ants.range(i..) {
                pairs.push((i, j, baseline::encode(i, j)?));
            }
        }
        let num_bls = pairs.len();

        let num_blts = timestamps.len() * num_bls;
        let mut row_times = Vec::with_capacity(num_blts);
        let mut ant_1 = Vec::with_capacity(num_blts);
        let mut ant_2 = Vec::with_capacity(num_blts);
        let mut baselines = Vec::with_capacity(num_blts);
        let mut rows = HashMap::with_capacity(num_blts);
        for &t in &timestamps {
            for &(i, j, key) in &pairs {
                let row = row_times.len();
                row_times.push(t);
                ant_1.push(i);
                ant_2.push(j);
                baselines.push(key);
                if rows.insert((time_key(t), key), row).is_some() {
                    return Err(GridError::DuplicateRow {
                        time_gps: t.to_gpst_seconds(),
                        baseline: key,
                    });
                }
            }
        }

        Ok(BltGrid {
            times: timestamps,
            row_times,
            ant_1,
            ant_2,
            baselines,
            num_bls,
            rows,
        })
    }

    /// The unique row for a (time, baseline key) pair.
    pub(crate) fn row(&self, time: Epoch, baseline: u32) -> Result<usize, GridError> {
        self.rows
            .get(&(time_key(time), baseline))
            .copied()
            .ok_or(GridError::NoSuchRow {
                time_gps: time.to_gpst_seconds(),
                baseline,
            })
    }

    pub(crate) fn num_blts(&self) -> usize {
        self.row_times.len()
    }

    pub(crate) fn num_times(&self) -> usize {
        self.times.len()
    }

    pub(crate) fn num_bls(&self) -> usize {
        self.num_bls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_times(n: usize) -> Vec<Epoch> {
        (0..n)
            .map(|i| Epoch::from_gpst_seconds(1_090_008_640.0 + 2.0 * i as f64))
            .collect()
    }

    #[test]
    fn complete_cross_product() {
        let ants: BTreeSet<u32> = [0, 1, 3].into_iter().collect();
        // Pass the timestamps twice over, unsorted; the grid dedups.
        let mut timestamps = test_times(4);
        timestamps.extend(test_times(4).into_iter().rev());
        let grid = BltGrid::new(timestamps, &ants).unwrap();

        // 3 antennas make 6 unordered pairs, including autos.
        assert_eq!(grid.num_bls(), 6);
        assert_eq!(grid.num_times(), 4);
        assert_eq!(grid.num_blts(), 24);
        assert_eq!(grid.ant_1[0..6], [0, 0, 0, 1, 1, 3]);
        assert_eq!(grid.ant_2[0..6], [0, 1, 3, 1, 3, 3]);
    }

    #[test]
    fn every_row_is_found_exactly_once() {
        let ants: BTreeSet<u32> = [0, 2].into_iter().collect();
        let timestamps = test_times(3);
        let grid = BltGrid::new(timestamps.clone(), &ants).unwrap();

        let mut seen = vec![false; grid.num_blts()];
        for &t in &timestamps {
            for &(i, j) in &[(0, 0), (0, 2), (2, 2)] {
                let key = crate::baseline::encode(i, j).unwrap();
                let row = grid.row(t, key).unwrap();
                assert!(!seen[row]);
                seen[row] = true;
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn unknown_key_is_an_error() {
        let ants: BTreeSet<u32> = [0, 1].into_iter().collect();
        let timestamps = test_times(2);
        let grid = BltGrid::new(timestamps.clone(), &ants).unwrap();

        // Antenna 5 was never seen.
        let key = crate::baseline::encode(1, 5).unwrap();
        assert!(matches!(
            grid.row(timestamps[0], key),
            Err(GridError::NoSuchRow { .. })
        ));
    }
}
