//! # barcodism
//!
//! Barcode and QR code generation and reading, with an HTTP service on top.
//!
//! ## Features
//!
//! - **Generation**: QR, Data Matrix, Aztec, PDF417, Code 39, Code 93,
//!   Code 128, Codabar, ITF, UPC-A, UPC-E, EAN-8 and EAN-13, rendered to an exact pixel size
//! - **Reading**: hybrid binarization, then every candidate symbology in turn
//! - **Reed-Solomon Error Correction**: hand-written over the QR, Data Matrix and Aztec fields
//! - **Service**: `/generate`, `/getBarcode` and `/read` over axum with optional storage
//!
//! ## Quick Start
//!
//! ```rust
//! use barcodism::builder::Encoder;
//! use barcodism::reader::{decode, DecodeHints};
//! use barcodism::symbology::resolve;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = Encoder::new("Hello, World!", resolve("qr")?).size(200, 200).build()?;
//! assert_eq!(img.dimensions(), (200, 200));
//!
//! let res = decode(&img, DecodeHints::default())?;
//! assert_eq!(res.text, "Hello, World!");
//! # Ok(())
//! # }
//! ```
//!
//! ### Hints
//!
//! ```rust
//! use barcodism::builder::Encoder;
//! use barcodism::symbology::resolve;
//! use barcodism::{Charset, ECLevel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let _img = Encoder::new("Grüße", resolve("qr")?)
//!     .size(300, 300)
//!     .ec_level(ECLevel::H)      // QR only, defaults to L
//!     .charset(Charset::Latin1)  // written behind an ECI
//!     .margin(2)                 // quiet zone in modules
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod aztec;
pub mod builder;
pub mod common;
pub mod config;
pub mod datamatrix;
pub mod image_codec;
pub mod oned;
pub mod pdf417;
pub mod qr;
pub mod reader;
pub mod service;
pub mod symbology;
pub mod telemetry;

pub use builder::{EncodeHints, Encoder};
pub use common::charset::Charset;
pub use common::{BarcodeError, BarcodeResult, BitMatrix};
pub use qr::ECLevel;
pub use reader::{DecodeHints, DecodedResult, Decoder, ReadError};
pub use symbology::{BarcodeFormat, Symbology, UnknownSymbology};
