use image::GrayImage;
use imageproc::contrast::otsu_level;

use crate::common::BitMatrix;

// Hybrid binarizer
// Steps:
// 1. Divides image into blocks of 8x8 pixels. The last fractional block on each edge is
//    computed from the last 8 pixels, so a few pixels overlap into 2 blocks
// 2. Calculates average of each block. Blocks with a dynamic range under MIN_DYNAMIC_RANGE
//    take half their minimum, or the average of their top/left neighbours when larger
// 3. Calculates the threshold for each block by averaging the 5x5 blocks around it
// 4. Marks a pixel dark if its value is less than or equal to the threshold
// Images too small for a 5x5 block neighbourhood fall back to a global Otsu threshold.
//------------------------------------------------------------------------------

const BLOCK: usize = 8;
const MIN_DYNAMIC_RANGE: u8 = 24;
const MIN_SIZE: usize = BLOCK * 5;

pub fn binarize(img: &GrayImage) -> BitMatrix {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w < MIN_SIZE || h < MIN_SIZE {
        return global_threshold(img);
    }

    let (ws, hs) = (w.div_ceil(BLOCK), h.div_ceil(BLOCK));
    let avg = block_averages(img, ws, hs);
    let thresh = block_thresholds(&avg, ws, hs);

    let mut res = BitMatrix::new(w, h);
    for (y, row) in img.rows().enumerate() {
        let off = (y / BLOCK) * ws;
        for (x, p) in row.enumerate() {
            if p[0] <= thresh[off + x / BLOCK] {
                res.set(x, y, true);
            }
        }
    }
    res
}

fn block_averages(img: &GrayImage, ws: usize, hs: usize) -> Vec<u32> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut avg = vec![0u32; ws * hs];

    for by in 0..hs {
        let y0 = (by * BLOCK).min(h - BLOCK);
        for bx in 0..ws {
            let x0 = (bx * BLOCK).min(w - BLOCK);
            let (mut sum, mut mn, mut mx) = (0u32, u8::MAX, u8::MIN);
            for y in y0..y0 + BLOCK {
                for x in x0..x0 + BLOCK {
                    let p = img.get_pixel(x as u32, y as u32)[0];
                    sum += p as u32;
                    mn = mn.min(p);
                    mx = mx.max(p);
                }
            }

            let i = by * ws + bx;
            if mx - mn > MIN_DYNAMIC_RANGE {
                avg[i] = sum >> 6;
                continue;
            }

            // Flat block, assume light unless the neighbourhood says otherwise
            avg[i] = mn as u32 / 2;
            if by > 0 && bx > 0 {
                let ng = (avg[i - ws] + 2 * avg[i - 1] + avg[i - ws - 1]) / 4;
                if (mn as u32) < ng {
                    avg[i] = ng;
                }
            }
        }
    }
    avg
}

fn block_thresholds(avg: &[u32], ws: usize, hs: usize) -> Vec<u8> {
    let (maxx, maxy) = (ws - 3, hs - 3);
    let mut res = vec![0u8; ws * hs];
    for by in 0..hs {
        let cy = by.clamp(2, maxy);
        for bx in 0..ws {
            let cx = bx.clamp(2, maxx);
            let sum: u32 = (cy - 2..=cy + 2).map(|ny| avg[ny * ws + cx - 2..=ny * ws + cx + 2].iter().sum::<u32>()).sum();
            res[by * ws + bx] = (sum / 25) as u8;
        }
    }
    res
}

fn global_threshold(img: &GrayImage) -> BitMatrix {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut res = BitMatrix::new(w, h);
    let (mn, mx) = img.pixels().fold((u8::MAX, u8::MIN), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));
    if mx.saturating_sub(mn) <= MIN_DYNAMIC_RANGE {
        return res;
    }

    let level = otsu_level(img);
    for (x, y, p) in img.enumerate_pixels() {
        if p[0] <= level {
            res.set(x as usize, y as usize, true);
        }
    }
    res
}

#[cfg(test)]
mod binarize_tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_blank_is_light() {
        let img = GrayImage::from_pixel(200, 200, Luma([255]));
        assert_eq!(binarize(&img).count_dark(), 0);
    }

    #[test]
    fn test_block_pattern() {
        let mut img = GrayImage::from_pixel(120, 120, Luma([230]));
        for y in 40..80 {
            for x in 40..80 {
                img.put_pixel(x, y, Luma([20]));
            }
        }
        let bm = binarize(&img);
        assert!(bm.get(60, 60));
        assert!(bm.get(40, 40) && bm.get(79, 79));
        assert!(!bm.get(10, 10) && !bm.get(39, 60) && !bm.get(80, 60));
    }

    #[test]
    fn test_gradient_background() {
        // Dark stripes on a background that fades from grey to white
        let mut img = GrayImage::new(160, 80);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let bg = 120 + (x as u8 / 2);
            *p = if (x / 4) % 2 == 0 && (20..60).contains(&y) { Luma([bg / 4]) } else { Luma([bg]) };
        }
        let bm = binarize(&img);
        assert!(bm.get(1, 40) && bm.get(153, 40));
        assert!(!bm.get(5, 40) && !bm.get(157, 40));
    }

    #[test]
    fn test_small_image_uses_otsu() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([240]));
        for y in 5..15 {
            img.put_pixel(10, y, Luma([10]));
        }
        let bm = binarize(&img);
        assert_eq!(bm.count_dark(), 10);
        assert!(bm.get(10, 7));
    }
}
