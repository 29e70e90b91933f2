pub mod bits;
pub mod charset;
pub mod ec;
pub mod error;
pub mod geometry;
pub mod matrix;

pub use bits::{BitReader, BitStream};
pub use error::{BarcodeError, BarcodeResult};
pub use geometry::{Homography, Point};
pub use matrix::BitMatrix;
