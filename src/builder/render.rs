use image::{GrayImage, Luma};

use crate::common::BitMatrix;

// Rendering
// Symbols are drawn onto a canvas of exactly the requested size:
// 1. The quiet zone is added around the module grid (left and right only for rows)
// 2. If the grid fits, every module becomes a square of the largest integer scale that
//    fits both axes, and the symbol is centred
// 3. Otherwise each pixel samples its nearest module
// Linear symbols are a single row stretched over the full height.
//------------------------------------------------------------------------------

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

// Module under each pixel along one axis, None in the quiet zone or padding. A zero
// scale samples the nearest module instead.
fn axis(pixels: usize, modules: usize, quiet: usize, scale: usize) -> Vec<Option<usize>> {
    let total = modules + 2 * quiet;
    let offset = (pixels.saturating_sub(total * scale)) / 2;
    (0..pixels)
        .map(|p| {
            let m = if scale > 0 { p.checked_sub(offset)? / scale } else { p * total / pixels };
            m.checked_sub(quiet).filter(|&m| m < modules)
        })
        .collect()
}

fn paint(modules: &BitMatrix, xs: &[Option<usize>], ys: &[Option<usize>]) -> GrayImage {
    GrayImage::from_fn(xs.len() as u32, ys.len() as u32, |x, y| match (xs[x as usize], ys[y as usize]) {
        (Some(mx), Some(my)) if modules.get(mx, my) => DARK,
        _ => LIGHT,
    })
}

/// Draws a two dimensional module grid with `quiet` light modules on every side.
pub fn render_matrix(modules: &BitMatrix, quiet: usize, width: usize, height: usize) -> GrayImage {
    let (cols, rows) = (modules.width(), modules.height());
    let scale = (width / (cols + 2 * quiet)).min(height / (rows + 2 * quiet));
    let xs = axis(width, cols, quiet, scale);
    let ys = axis(height, rows, quiet, scale);
    paint(modules, &xs, &ys)
}

/// Draws a row of modules with `quiet` light modules left and right, stretched to the
/// full height.
pub fn render_row(modules: &BitMatrix, quiet: usize, width: usize, height: usize) -> GrayImage {
    let cols = modules.width();
    let xs = axis(width, cols, quiet, width / (cols + 2 * quiet));
    let ys = vec![Some(0); height];
    paint(modules, &xs, &ys)
}
