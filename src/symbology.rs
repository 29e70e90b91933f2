use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Barcode format
//------------------------------------------------------------------------------

/// Output format of a symbology, serialized with its upper-case wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BarcodeFormat {
    #[serde(rename = "QR_CODE")]
    QrCode,
    #[serde(rename = "DATA_MATRIX")]
    DataMatrix,
    #[serde(rename = "AZTEC")]
    Aztec,
    #[serde(rename = "PDF_417")]
    Pdf417,
    #[serde(rename = "CODE_39")]
    Code39,
    #[serde(rename = "CODE_93")]
    Code93,
    #[serde(rename = "CODE_128")]
    Code128,
    #[serde(rename = "CODABAR")]
    Codabar,
    #[serde(rename = "ITF")]
    Itf,
    #[serde(rename = "UPC_A")]
    UpcA,
    #[serde(rename = "UPC_E")]
    UpcE,
    #[serde(rename = "EAN_8")]
    Ean8,
    #[serde(rename = "EAN_13")]
    Ean13,
}

impl BarcodeFormat {
    pub const ALL: [BarcodeFormat; 13] = [
        Self::QrCode,
        Self::DataMatrix,
        Self::Aztec,
        Self::Pdf417,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::Codabar,
        Self::Itf,
        Self::UpcA,
        Self::UpcE,
        Self::Ean8,
        Self::Ean13,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QrCode => "QR_CODE",
            Self::DataMatrix => "DATA_MATRIX",
            Self::Aztec => "AZTEC",
            Self::Pdf417 => "PDF_417",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Code128 => "CODE_128",
            Self::Codabar => "CODABAR",
            Self::Itf => "ITF",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::Ean8 => "EAN_8",
            Self::Ean13 => "EAN_13",
        }
    }

    /// Two dimensional symbologies are rendered from a module grid rather than a single row
    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::QrCode | Self::DataMatrix | Self::Aztec | Self::Pdf417)
    }
}

impl Display for BarcodeFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarcodeFormat {
    type Err = UnknownSymbology;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| UnknownSymbology(s.to_string()))
    }
}

// Encoder kind
//------------------------------------------------------------------------------

/// Tag naming the encoding algorithm a symbology is generated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderKind {
    Qr,
    DataMatrix,
    Aztec,
    Pdf417,
    Code39,
    Code93,
    Code128,
    Codabar,
    Itf,
    UpcEan,
}

// Symbology
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbology {
    key: &'static str,
    aliases: &'static [&'static str],
    format: BarcodeFormat,
    encoder: EncoderKind,
}

impl Symbology {
    const fn new(
        key: &'static str,
        aliases: &'static [&'static str],
        format: BarcodeFormat,
        encoder: EncoderKind,
    ) -> Self {
        Self { key, aliases, format, encoder }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn format(&self) -> BarcodeFormat {
        self.format
    }

    pub fn encoder(&self) -> EncoderKind {
        self.encoder
    }

    /// Every registered symbology in a stable order.
    pub fn all() -> &'static [Symbology] {
        &REGISTRY
    }

    /// Canonical registry entry for a format.
    pub fn for_format(format: BarcodeFormat) -> Symbology {
        // Every format has exactly one entry
        REGISTRY[format as usize]
    }

    fn matches(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
            || self.format.as_str().eq_ignore_ascii_case(key)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(key))
    }
}

impl Display for Symbology {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key)
    }
}

// Ordered like BarcodeFormat so a format indexes its own entry
static REGISTRY: [Symbology; 13] = [
    Symbology::new("qr", &["qrcode"], BarcodeFormat::QrCode, EncoderKind::Qr),
    Symbology::new("dataMatrix", &["data-matrix"], BarcodeFormat::DataMatrix, EncoderKind::DataMatrix),
    Symbology::new("aztec", &[], BarcodeFormat::Aztec, EncoderKind::Aztec),
    Symbology::new("pdf417", &["pdf-417"], BarcodeFormat::Pdf417, EncoderKind::Pdf417),
    Symbology::new("code39", &["code-39"], BarcodeFormat::Code39, EncoderKind::Code39),
    Symbology::new("code93", &["code-93"], BarcodeFormat::Code93, EncoderKind::Code93),
    Symbology::new("code128", &["code-128"], BarcodeFormat::Code128, EncoderKind::Code128),
    Symbology::new("codebar", &["codabar"], BarcodeFormat::Codabar, EncoderKind::Codabar),
    Symbology::new("itf", &["itf-14", "interleaved2of5"], BarcodeFormat::Itf, EncoderKind::Itf),
    Symbology::new("upc-a", &["upca"], BarcodeFormat::UpcA, EncoderKind::UpcEan),
    Symbology::new("upc-e", &["upce"], BarcodeFormat::UpcE, EncoderKind::UpcEan),
    Symbology::new("ean-8", &["ean8"], BarcodeFormat::Ean8, EncoderKind::UpcEan),
    Symbology::new("ean-13", &["ean13"], BarcodeFormat::Ean13, EncoderKind::UpcEan),
];

// Lookup
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSymbology(pub String);

impl Display for UnknownSymbology {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown barcode type: {}", self.0)
    }
}

impl std::error::Error for UnknownSymbology {}

/// Resolves a symbology key, ignoring ASCII case. Unknown keys are an error.
pub fn resolve(key: &str) -> Result<Symbology, UnknownSymbology> {
    REGISTRY.iter().find(|s| s.matches(key)).copied().ok_or_else(|| UnknownSymbology(key.to_string()))
}

#[cfg(test)]
mod symbology_tests {
    use super::*;
    use test_case::test_case;

    #[test_case("qr", BarcodeFormat::QrCode)]
    #[test_case("QR", BarcodeFormat::QrCode)]
    #[test_case("dataMatrix", BarcodeFormat::DataMatrix)]
    #[test_case("DATAMATRIX", BarcodeFormat::DataMatrix)]
    #[test_case("aztec", BarcodeFormat::Aztec)]
    #[test_case("pdf417", BarcodeFormat::Pdf417)]
    #[test_case("code39", BarcodeFormat::Code39)]
    #[test_case("code93", BarcodeFormat::Code93)]
    #[test_case("Code128", BarcodeFormat::Code128)]
    #[test_case("codebar", BarcodeFormat::Codabar)]
    #[test_case("codabar", BarcodeFormat::Codabar)]
    #[test_case("itf", BarcodeFormat::Itf)]
    #[test_case("upc-a", BarcodeFormat::UpcA)]
    #[test_case("UPC-E", BarcodeFormat::UpcE)]
    #[test_case("ean-8", BarcodeFormat::Ean8)]
    #[test_case("Ean-13", BarcodeFormat::Ean13)]
    #[test_case("EAN_13", BarcodeFormat::Ean13)]
    #[test_case("qr_code", BarcodeFormat::QrCode)]
    fn test_resolve(key: &str, format: BarcodeFormat) {
        assert_eq!(resolve(key).unwrap().format(), format);
    }

    #[test_case("not-a-real-type")]
    #[test_case("")]
    #[test_case("qr ")]
    #[test_case("ean")]
    fn test_resolve_unknown(key: &str) {
        let err = resolve(key).unwrap_err();
        assert_eq!(err.to_string(), format!("Unknown barcode type: {key}"));
    }

    #[test]
    fn test_case_insensitive_identity() {
        assert_eq!(resolve("QR").unwrap(), resolve("qr").unwrap());
    }

    #[test]
    fn test_registry_order() {
        for f in BarcodeFormat::ALL {
            assert_eq!(Symbology::for_format(f).format(), f);
        }
        assert_eq!(Symbology::all().len(), BarcodeFormat::ALL.len());
    }

    #[test]
    fn test_format_wire_names() {
        assert_eq!(serde_json::to_string(&BarcodeFormat::Code128).unwrap(), "\"CODE_128\"");
        assert_eq!("pdf_417".parse::<BarcodeFormat>().unwrap(), BarcodeFormat::Pdf417);
        assert!("CODE128".parse::<BarcodeFormat>().is_err());
    }

    #[test]
    fn test_upc_ean_share_encoder() {
        for key in ["upc-a", "upc-e", "ean-8", "ean-13"] {
            assert_eq!(resolve(key).unwrap().encoder(), EncoderKind::UpcEan);
        }
    }
}
