mod decoder;
mod encoder;
mod galois;

pub use decoder::{rectify, rectify_bytes, rectify_info};
pub use encoder::{ec_bytes, ec_codewords};
pub use galois::*;
