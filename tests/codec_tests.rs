use barcodism::builder::{encode, EncodeHints};
use barcodism::image_codec::{gray_from_bytes, to_png};
use barcodism::reader::{decode, DecodeHints, ReadError};
use barcodism::symbology::{resolve, Symbology};
use barcodism::{BarcodeError, BarcodeFormat, Charset, ECLevel};
use image::{GrayImage, Luma};
use test_case::test_case;

fn canvas(format: BarcodeFormat) -> (u32, u32) {
    if format.is_matrix() {
        (300, 300)
    } else {
        (500, 150)
    }
}

fn only(format: BarcodeFormat) -> DecodeHints {
    DecodeHints { possible_formats: vec![format], ..Default::default() }
}

#[test]
fn test_registry_covers_every_format() {
    assert_eq!(Symbology::all().len(), 13);
    for format in BarcodeFormat::ALL {
        assert_eq!(Symbology::for_format(format).format(), format);
        assert_eq!(resolve(format.as_str()).unwrap().format(), format);
    }
    assert_eq!(resolve("QR").unwrap().format(), BarcodeFormat::QrCode);
    assert_eq!(resolve("codebar").unwrap().format(), BarcodeFormat::Codabar);
    assert_eq!(resolve("maxicode").unwrap_err().to_string(), "Unknown barcode type: maxicode");
}

#[test_case("qr", "https://example.com/?q=barcode", "https://example.com/?q=barcode")]
#[test_case("dataMatrix", "Serial 0042-ABC", "Serial 0042-ABC")]
#[test_case("aztec", "Boarding pass 7C", "Boarding pass 7C")]
#[test_case("pdf417", "PDF417 payload", "PDF417 payload")]
#[test_case("code39", "CODE39 TEST", "CODE39 TEST")]
#[test_case("code93", "Code93 Mixed", "Code93 Mixed")]
#[test_case("code128", "Hello, World!", "Hello, World!")]
#[test_case("codebar", "A40156B", "40156")]
#[test_case("itf", "30712345000010", "30712345000010")]
#[test_case("upc-a", "01234567890", "012345678905")]
#[test_case("upc-e", "0123456", "01234565")]
#[test_case("ean-8", "9638507", "96385074")]
#[test_case("ean-13", "400638133393", "4006381333931")]
fn test_generate_then_read(key: &str, data: &str, expected: &str) {
    let s = resolve(key).unwrap();
    let (w, h) = canvas(s.format());
    let img = encode(data, s, w, h, EncodeHints::default()).unwrap();
    assert_eq!(img.dimensions(), (w, h));

    // Through PNG, as the service does
    let img = gray_from_bytes(&to_png(&img).unwrap()).unwrap();
    let res = decode(&img, only(s.format())).unwrap();
    assert_eq!((res.text.as_str(), res.format), (expected, s.format()));
}

#[test_case(120, 40)]
#[test_case(333, 333)]
#[test_case(1000, 250)]
fn test_output_has_requested_size(w: u32, h: u32) {
    for s in Symbology::all() {
        let data = match s.format() {
            BarcodeFormat::Ean13 => "400638133393",
            BarcodeFormat::Ean8 => "9638507",
            BarcodeFormat::UpcA => "01234567890",
            BarcodeFormat::UpcE => "0123456",
            BarcodeFormat::Itf | BarcodeFormat::Codabar => "1234",
            _ => "SIZE",
        };
        let img = encode(data, *s, w, h, EncodeHints::default()).unwrap();
        assert_eq!(img.dimensions(), (w, h), "{s}");
    }
}

#[test]
fn test_generation_is_deterministic() {
    let s = resolve("qr").unwrap();
    let a = to_png(&encode("same input", s, 256, 256, EncodeHints::default()).unwrap()).unwrap();
    let b = to_png(&encode("same input", s, 256, 256, EncodeHints::default()).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_hints_change_the_symbol() {
    let s = resolve("qr").unwrap();
    let low = encode("hint sensitive", s, 300, 300, EncodeHints::default()).unwrap();
    let high = encode("hint sensitive", s, 300, 300, EncodeHints { ec_level: Some(ECLevel::H), ..Default::default() })
        .unwrap();
    assert_ne!(low, high);
    assert_eq!(decode(&high, only(BarcodeFormat::QrCode)).unwrap().text, "hint sensitive");
}

#[test]
fn test_latin1_round_trip() {
    let s = resolve("qr").unwrap();
    let hints = EncodeHints { charset: Some(Charset::Latin1), ..Default::default() };
    let img = encode("Grüße aus Köln", s, 300, 300, hints).unwrap();
    assert_eq!(decode(&img, DecodeHints::default()).unwrap().text, "Grüße aus Köln");
}

#[test_case("ean-13", "12345", BarcodeError::InvalidLength)]
#[test_case("itf", "12a4", BarcodeError::InvalidChar)]
#[test_case("code39", "café", BarcodeError::InvalidChar)]
#[test_case("qr", "", BarcodeError::EmptyData)]
fn test_unrepresentable_data(key: &str, data: &str, err: BarcodeError) {
    assert_eq!(encode(data, resolve(key).unwrap(), 200, 200, EncodeHints::default()), Err(err));
}

#[test]
fn test_zero_dimension() {
    let s = resolve("code128").unwrap();
    assert_eq!(encode("x", s, 0, 100, EncodeHints::default()), Err(BarcodeError::InvalidDimensions));
}

#[test]
fn test_nothing_to_read() {
    let blank = GrayImage::from_pixel(320, 240, Luma([255]));
    assert_eq!(decode(&blank, DecodeHints::default()), Err(ReadError::NotFound));

    let gradient = GrayImage::from_fn(320, 240, |x, _| Luma([(x * 255 / 319) as u8]));
    assert_eq!(decode(&gradient, DecodeHints::default()), Err(ReadError::NotFound));
}

#[test]
fn test_not_an_image() {
    assert!(matches!(gray_from_bytes(b"definitely not a png"), Err(ReadError::InvalidImage(_))));
}

mod codec_proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn proptest_qr(data in "[ -~]{1,120}") {
            let img = encode(&data, resolve("qr").unwrap(), 400, 400, EncodeHints::default()).unwrap();
            prop_assert_eq!(decode(&img, only(BarcodeFormat::QrCode)).unwrap().text, data);
        }

        #[test]
        fn proptest_code128(data in "[ -~]{1,24}") {
            let img = encode(&data, resolve("code128").unwrap(), 1600, 100, EncodeHints::default()).unwrap();
            prop_assert_eq!(decode(&img, only(BarcodeFormat::Code128)).unwrap().text, data);
        }

        #[test]
        fn proptest_data_matrix(data in "[ -~]{1,60}") {
            let img = encode(&data, resolve("dataMatrix").unwrap(), 300, 300, EncodeHints::default()).unwrap();
            prop_assert_eq!(decode(&img, only(BarcodeFormat::DataMatrix)).unwrap().text, data);
        }
    }
}
