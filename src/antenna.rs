//! The antenna registry: logical antenna numbers, compact indices, positions
//! and names.
//!
//! The native stream format has no way to keep track of antenna numbers; the
//! numbers are simply the index of each antenna in any array that describes
//! antenna attributes. On write, the position array is therefore inflated to
//! `max(antenna number) + 1` rows, with zeros at indices for which we have no
//! antenna. On read the inflation has to be undone: with an explicit number
//! table that is exact, otherwise the registry is inferred from non-zero
//! positions and the antennas that actually appear in the visibilities.

use std::collections::{BTreeSet, HashMap};

use log::warn;
use ndarray::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AntennaError {
    #[error("Antenna number {0} appears more than once in the antenna number table")]
    DuplicateNumber(u32),

    #[error("The antenna position table has {rows} rows for {nants} antennas")]
    BadPositionTable { rows: usize, nants: usize },

    #[error("Antenna number {number} does not fit in the stream's position table of {nants} entries")]
    NumberOutOfRange { number: u32, nants: usize },

    #[error("Antenna {0} has visibilities, but is not listed in the stream's antenna number table")]
    NotInTable(u32),
}

/// A bidirectional mapping between compact 0-based indices and logical
/// antenna numbers, along with the per-antenna positions and names.
#[derive(Debug, Clone)]
pub struct AntennaRegistry {
    /// The logical antenna number at each compact index.
    numbers: Vec<u32>,

    /// Antenna positions, one row of 3 per compact index. `None` if the
    /// stream supplied no positions at all.
    positions: Option<Array2<f64>>,

    /// Antenna names, one per compact index.
    names: Vec<String>,

    /// Antenna number to compact index.
    index_map: HashMap<u32, usize>,
}

impl AntennaRegistry {
    /// Make a registry from already-compact tables. Name tables of the wrong
    /// length are dropped in favour of stringified numbers.
    pub fn new(
        numbers: Vec<u32>,
        positions: Option<Array2<f64>>,
        names: Option<Vec<String>>,
    ) -> Result<AntennaRegistry, AntennaError> {
        if let Some(p) = positions.as_ref() {
            if p.nrows() != numbers.len() || p.ncols() != 3 {
                return Err(AntennaError::BadPositionTable {
                    rows: p.nrows(),
                    nants: numbers.len(),
                });
            }
        }

        let names = match names {
            Some(n) if n.len() == numbers.len() => n,
            Some(n) => {
                warn!(
                    "{} antenna names were supplied for {} antennas; using numeric names instead",
                    n.len(),
                    numbers.len()
                );
                numbers.iter().map(|n| n.to_string()).collect()
            }
            None => numbers.iter().map(|n| n.to_string()).collect(),
        };

        let mut index_map = HashMap::with_capacity(numbers.len());
        for (i, &num) in numbers.iter().enumerate() {
            if index_map.insert(num, i).is_some() {
                return Err(AntennaError::DuplicateNumber(num));
            }
        }

        Ok(AntennaRegistry {
            numbers,
            positions,
            names,
            index_map,
        })
    }

    /// Build the registry from what a stream header supplies, plus the set of
    /// antennas that actually appear in the visibility records.
    ///
    /// An explicit number table wins. Without one, the registry is the union
    /// of antennas with a non-zero stored position and antennas with
    /// visibilities; an antenna with visibilities but an all-zero position is
    /// kept, with a warning. Without positions either, only the antennas with
    /// visibilities are known.
    pub fn from_stream(
        nants: usize,
        numbers: Option<Vec<u32>>,
        positions: Option<Array2<f64>>,
        names: Option<Vec<String>>,
        ants_with_data: &BTreeSet<u32>,
    ) -> Result<AntennaRegistry, AntennaError> {
        if let Some(p) = positions.as_ref() {
            if p.nrows() != nants || p.ncols() != 3 {
                return Err(AntennaError::BadPositionTable {
                    rows: p.nrows(),
                    nants,
                });
            }
        }

        let registry = match (numbers, positions) {
            (Some(numbers), Some(inflated)) => {
                let positions = if numbers.len() == nants {
                    // No inflation happened on write; the table is already
                    // compact.
                    inflated
                } else {
                    let mut compact = Array2::zeros((numbers.len(), 3));
                    for (i, &num) in numbers.iter().enumerate() {
                        if num as usize >= nants {
                            return Err(AntennaError::NumberOutOfRange { number: num, nants });
                        }
                        compact.row_mut(i).assign(&inflated.row(num as usize));
                    }
                    compact
                };
                AntennaRegistry::new(numbers, Some(positions), names)?
            }

            (Some(numbers), None) => AntennaRegistry::new(numbers, None, names)?,

            (None, Some(inflated)) => {
                let mut keep: BTreeSet<u32> = ants_with_data.clone();
                for (i, row) in inflated.outer_iter().enumerate() {
                    let length = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                    if length > 0.0 {
                        keep.insert(i as u32);
                    }
                }
                let numbers: Vec<u32> = keep.into_iter().collect();
                let mut compact = Array2::zeros((numbers.len(), 3));
                for (i, &num) in numbers.iter().enumerate() {
                    if num as usize >= nants {
                        return Err(AntennaError::NumberOutOfRange { number: num, nants });
                    }
                    let row = inflated.row(num as usize);
                    compact.row_mut(i).assign(&row);
                    let length = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                    if length == 0.0 && ants_with_data.contains(&num) {
                        warn!(
                            "Antenna number {num} has visibilities associated with it, but it has a position of (0,0,0)"
                        );
                    }
                }
                AntennaRegistry::new(numbers, Some(compact), names)?
            }

            (None, None) => {
                AntennaRegistry::new(ants_with_data.iter().copied().collect(), None, names)?
            }
        };

        // Every antenna that appears in the data must be resolvable.
        for &ant in ants_with_data {
            if registry.index_of(ant).is_none() {
                return Err(AntennaError::NotInTable(ant));
            }
        }

        Ok(registry)
    }

    pub fn num_ants(&self) -> usize {
        self.numbers.len()
    }

    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }

    pub fn positions(&self) -> Option<&Array2<f64>> {
        self.positions.as_ref()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The compact index of an antenna number.
    pub fn index_of(&self, number: u32) -> Option<usize> {
        self.index_map.get(&number).copied()
    }

    /// The largest antenna number in the registry.
    pub fn max_number(&self) -> Option<u32> {
        self.numbers.iter().copied().max()
    }

    /// The position table inflated for writing: `max(antenna number) + 1`
    /// rows, each antenna's position at the row equal to its number, zeros
    /// everywhere else.
    pub fn inflated_positions(&self) -> Option<Array2<f64>> {
        let positions = self.positions.as_ref()?;
        let nants = self.max_number().map_or(0, |m| m as usize + 1);
        let mut inflated = Array2::zeros((nants, 3));
        for (i, &num) in self.numbers.iter().enumerate() {
            inflated.row_mut(num as usize).assign(&positions.row(i));
        }
        Some(inflated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions_for(numbers: &[u32]) -> Array2<f64> {
        let mut p = Array2::zeros((numbers.len(), 3));
        for (i, &num) in numbers.iter().enumerate() {
            p[[i, 0]] = num as f64 + 1.0;
            p[[i, 1]] = 2.0 * (num as f64 + 1.0);
            p[[i, 2]] = -1.0;
        }
        p
    }

    #[test]
    fn explicit_table_is_used_directly() {
        let numbers = vec![0, 2, 5];
        let positions = positions_for(&numbers);
        let seen: BTreeSet<u32> = [0, 2].into_iter().collect();
        let reg = AntennaRegistry::from_stream(
            3,
            Some(numbers.clone()),
            Some(positions.clone()),
            None,
            &seen,
        )
        .unwrap();
        assert_eq!(reg.numbers(), &[0, 2, 5]);
        assert_eq!(reg.positions().unwrap(), &positions);
        assert_eq!(reg.index_of(5), Some(2));
        assert_eq!(reg.index_of(1), None);
        assert_eq!(reg.names(), &["0", "2", "5"]);
    }

    #[test]
    fn explicit_table_with_inflated_positions_is_compacted() {
        let numbers = vec![0, 2, 5];
        // As written: 6 rows, only rows 0, 2 and 5 non-zero.
        let mut inflated = Array2::zeros((6, 3));
        for &num in &numbers {
            inflated[[num as usize, 0]] = num as f64 + 1.0;
        }
        let seen: BTreeSet<u32> = numbers.iter().copied().collect();
        let reg =
            AntennaRegistry::from_stream(6, Some(numbers), Some(inflated), None, &seen).unwrap();
        assert_eq!(reg.num_ants(), 3);
        assert_eq!(reg.positions().unwrap()[[2, 0]], 6.0);
    }

    #[test]
    fn inference_takes_the_union_of_positions_and_data() {
        // Rows 1 and 3 have positions; antennas 0 and 1 have data.
        let mut inflated = Array2::zeros((4, 3));
        inflated[[1, 2]] = 5.0;
        inflated[[3, 2]] = 6.0;
        let seen: BTreeSet<u32> = [0, 1].into_iter().collect();
        let reg = AntennaRegistry::from_stream(4, None, Some(inflated), None, &seen).unwrap();
        assert_eq!(reg.numbers(), &[0, 1, 3]);
        // Antenna 0 had data but a zero position; it's kept.
        assert_eq!(reg.positions().unwrap().row(0).to_vec(), vec![0.0; 3]);
    }

    #[test]
    fn inflate_then_infer_round_trips_when_absent_slots_are_zero() {
        let numbers = vec![0, 2, 5];
        let reg =
            AntennaRegistry::new(numbers.clone(), Some(positions_for(&numbers)), None).unwrap();
        let inflated = reg.inflated_positions().unwrap();
        assert_eq!(inflated.nrows(), 6);

        let seen: BTreeSet<u32> = [0, 2].into_iter().collect();
        let inferred =
            AntennaRegistry::from_stream(6, None, Some(inflated), None, &seen).unwrap();
        assert_eq!(inferred.numbers(), &[0, 2, 5]);
        assert_eq!(
            inferred.positions().unwrap(),
            reg.positions().unwrap()
        );
    }

    #[test]
    fn data_antenna_missing_from_table_is_an_error() {
        let seen: BTreeSet<u32> = [0, 7].into_iter().collect();
        let result = AntennaRegistry::from_stream(3, Some(vec![0, 1, 2]), None, None, &seen);
        assert!(matches!(result, Err(AntennaError::NotInTable(7))));
    }

    #[test]
    fn bad_name_table_falls_back_to_numbers() {
        let reg = AntennaRegistry::new(
            vec![0, 1, 2],
            None,
            Some(vec!["only one".to_string()]),
        )
        .unwrap();
        assert_eq!(reg.names(), &["0", "1", "2"]);
    }
}
