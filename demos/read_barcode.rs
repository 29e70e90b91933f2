use std::error::Error;

use barcodism::reader::{DecodeHints, Decoder};

fn main() -> Result<(), Box<dyn Error>> {
    // Read an image produced by the generate_barcode demo, or any other path
    let path = std::env::args().nth(1).unwrap_or_else(|| "qr.png".to_string());
    let img = image::open(&path)?;

    let decoder = Decoder::new(DecodeHints { try_harder: true, ..Default::default() });
    match decoder.decode_dynamic(&img) {
        Ok(res) => {
            println!("Successfully decoded barcode from: {}", path);
            println!("Format: {}", res.format);
            println!("Decoded message: {}", res.text);
        }
        Err(e) => println!("No barcode read from {}: {}", path, e),
    }

    Ok(())
}
