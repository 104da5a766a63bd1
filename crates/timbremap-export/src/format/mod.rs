//! On-disk encodings for flattened matrices
//!
//! - `text`: one decimal value per line, row-major. Always written, always
//!   readable; this is what the host runtime parses.
//! - `npy`: NumPy `.npy` sibling of identical content (feature `npy`).

pub mod text;

#[cfg(feature = "npy")]
pub mod npy;

/// Flattened row-major values plus the shape they were stored with.
///
/// Text files carry no shape, so `shape` is `None` for them and the caller
/// recovers it from the surrounding layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArray {
    pub shape: Option<Vec<usize>>,
    pub data: Vec<f64>,
}

impl RawArray {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
