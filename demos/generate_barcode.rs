use std::error::Error;

use barcodism::builder::Encoder;
use barcodism::symbology::resolve;
use barcodism::ECLevel;

fn main() -> Result<(), Box<dyn Error>> {
    // Type key and payload from the command line, QR by default
    let mut args = std::env::args().skip(1);
    let kind = args.next().unwrap_or_else(|| "qr".to_string());
    let data = args.next().unwrap_or_else(|| "Hello, World!".to_string());

    let symbology = resolve(&kind)?;
    let (width, height) = if symbology.format().is_matrix() { (300, 300) } else { (500, 150) };

    // Exact output size, EC level only matters for QR
    let img = Encoder::new(&data, symbology).size(width, height).ec_level(ECLevel::M).build()?;

    let path = format!("{kind}.png");
    img.save(&path)?;

    println!("{} barcode saved to: {}", symbology.format(), path);
    Ok(())
}
