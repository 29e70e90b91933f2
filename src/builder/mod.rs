//! Barcode generation. An [`Encoder`] dispatches to the symbology's encoder and renders
//! the resulting modules to a raster of exactly the requested size.

mod render;

pub use render::{render_matrix, render_row};

use image::GrayImage;
use tracing::debug;

use crate::common::charset::Charset;
use crate::common::{BarcodeError, BarcodeResult, BitMatrix};
use crate::qr::ECLevel;
use crate::symbology::{EncoderKind, Symbology};
use crate::{aztec, datamatrix, oned, pdf417, qr};

pub const DEFAULT_SIZE: u32 = 400;

// Encode hints
//------------------------------------------------------------------------------

/// Optional encoder settings. Hints a symbology has no use for are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeHints {
    /// Character set for non-ASCII text in QR, Data Matrix and Aztec.
    pub charset: Option<Charset>,
    /// QR error correction level.
    pub ec_level: Option<ECLevel>,
    /// Aztec error correction as a percentage of the data.
    pub ec_percent: Option<usize>,
    /// Quiet zone in modules, replacing the symbology default.
    pub margin: Option<usize>,
}

// Modules
//------------------------------------------------------------------------------

/// Encoded symbol before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modules {
    Matrix(BitMatrix),
    Row(BitMatrix),
}

impl Modules {
    pub fn matrix(&self) -> &BitMatrix {
        match self {
            Self::Matrix(m) | Self::Row(m) => m,
        }
    }
}

fn default_quiet_zone(kind: EncoderKind) -> usize {
    match kind {
        EncoderKind::Qr => 4,
        EncoderKind::DataMatrix | EncoderKind::Aztec => 1,
        EncoderKind::Pdf417 => 2,
        EncoderKind::UpcEan => 9,
        _ => 10,
    }
}

// Encoder
//------------------------------------------------------------------------------

pub struct Encoder<'a> {
    data: &'a str,
    symbology: Symbology,
    width: u32,
    height: u32,
    hints: EncodeHints,
}

impl<'a> Encoder<'a> {
    pub fn new(data: &'a str, symbology: Symbology) -> Self {
        Self { data, symbology, width: DEFAULT_SIZE, height: DEFAULT_SIZE, hints: EncodeHints::default() }
    }

    pub fn size(&mut self, width: u32, height: u32) -> &mut Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn hints(&mut self, hints: EncodeHints) -> &mut Self {
        self.hints = hints;
        self
    }

    pub fn charset(&mut self, charset: Charset) -> &mut Self {
        self.hints.charset = Some(charset);
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.hints.ec_level = Some(ec_level);
        self
    }

    pub fn ec_percent(&mut self, percent: usize) -> &mut Self {
        self.hints.ec_percent = Some(percent);
        self
    }

    pub fn margin(&mut self, margin: usize) -> &mut Self {
        self.hints.margin = Some(margin);
        self
    }

    /// Encodes the data into modules without rendering.
    pub fn modules(&self) -> BarcodeResult<Modules> {
        let (data, hints) = (self.data, &self.hints);
        if data.is_empty() {
            return Err(BarcodeError::EmptyData);
        }
        let modules = match self.symbology.encoder() {
            EncoderKind::Qr => Modules::Matrix(qr::encode(data, hints.ec_level.unwrap_or_default(), hints.charset)?),
            EncoderKind::DataMatrix => Modules::Matrix(datamatrix::encode(data, hints.charset)?),
            EncoderKind::Aztec => Modules::Matrix(aztec::encode(
                data,
                hints.ec_percent.unwrap_or(aztec::DEFAULT_EC_PERCENT),
                hints.charset,
            )?),
            EncoderKind::Pdf417 => Modules::Matrix(pdf417::encode(data)?),
            _ => Modules::Row(BitMatrix::from_row(&oned::encode(data, self.symbology.format())?)),
        };
        Ok(modules)
    }

    /// Encodes and renders to a raster of exactly the configured size.
    pub fn build(&self) -> BarcodeResult<GrayImage> {
        if self.width == 0 || self.height == 0 {
            return Err(BarcodeError::InvalidDimensions);
        }
        let modules = self.modules()?;
        let quiet = self.hints.margin.unwrap_or_else(|| default_quiet_zone(self.symbology.encoder()));
        let (w, h) = (self.width as usize, self.height as usize);
        debug!(
            symbology = %self.symbology,
            cols = modules.matrix().width(),
            rows = modules.matrix().height(),
            quiet,
            "Rendering symbol"
        );

        Ok(match &modules {
            Modules::Matrix(m) => render_matrix(m, quiet, w, h),
            Modules::Row(m) => render_row(m, quiet, w, h),
        })
    }
}

/// Encodes `data` in `symbology` and renders it to exactly `width` x `height` pixels.
pub fn encode(data: &str, symbology: Symbology, width: u32, height: u32, hints: EncodeHints) -> BarcodeResult<GrayImage> {
    Encoder::new(data, symbology).size(width, height).hints(hints).build()
}
