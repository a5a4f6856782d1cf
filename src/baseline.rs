//! Encoding antenna-number pairs as single baseline keys.

use thiserror::Error;

/// The largest antenna number that can be encoded in a baseline key.
pub const MAX_ANT_NUMBER: u32 = 2046;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineError {
    #[error(
        "Antenna number {0} is too large to encode in a baseline key (the maximum is {MAX_ANT_NUMBER})"
    )]
    AntennaNumberTooLarge(u32),
}

/// Encode an antenna-number pair as a baseline key, using the miriad
/// convention to handle more than 255 antennas: with 1-indexed numbers a =
/// i + 1 and b = j + 1, the key is 256a + b when both fit in a byte,
/// otherwise 2048a + b + 65536. Only defined for i <= j.
// Same convention as the RTS and Marlu; the two regimes can't collide because
// the small form never exceeds 65535.
pub fn encode(i: u32, j: u32) -> Result<u32, BaselineError> {
    if i > MAX_ANT_NUMBER {
        return Err(BaselineError::AntennaNumberTooLarge(i));
    }
    if j > MAX_ANT_NUMBER {
        return Err(BaselineError::AntennaNumberTooLarge(j));
    }
    let (a, b) = (i + 1, j + 1);
    if a < 256 && b < 256 {
        Ok(256 * a + b)
    } else {
        Ok(2048 * a + b + 65_536)
    }
}

/// Decode a baseline key back into the antenna-number pair that formed it.
/// The inverse of [`encode`] over its domain.
pub const fn decode(key: u32) -> (u32, u32) {
    if key > 65_536 {
        let b = (key - 65_536) % 2048;
        let a = (key - 65_536 - b) / 2048;
        (a - 1, b - 1)
    } else {
        let b = key % 256;
        let a = (key - b) / 256;
        (a - 1, b - 1)
    }
}
