//! Flattening, aspect-preserving fit and centred square canvases.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Pixel, Rgb, RgbImage, Rgba};

use crate::error::BrandingError;

pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Composites the image onto an opaque `background`. The result has no alpha
/// channel, so it is safe for formats without transparency (BMP).
pub fn flatten_alpha(image: &DynamicImage, background: Rgb<u8>) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let Rgb([bg_r, bg_g, bg_b]) = background;
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        Rgb([blend(r, bg_r, a), blend(g, bg_g, a), blend(b, bg_b, a)])
    })
}

fn blend(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = u32::from(alpha);
    ((u32::from(fg) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8
}

/// Largest `(w, h)` with the source's aspect ratio that fits in a
/// `target x target` box. Small sources are scaled up; each side is >= 1.
pub fn compute_fit(width: u32, height: u32, target: u32) -> (u32, u32) {
    if width == 0 || height == 0 || target == 0 {
        return (target.max(1), target.max(1));
    }

    let scaled = |short: u32, long: u32| -> u32 {
        let value = (u64::from(short) * u64::from(target) + u64::from(long) / 2) / u64::from(long);
        (value as u32).clamp(1, target)
    };

    if width >= height {
        (target, scaled(height, width))
    } else {
        (scaled(width, height), target)
    }
}

/// Scales `source` to fit inside `size x size` and centres it on a canvas
/// filled with `background`. The canvas is always exactly `size x size`.
pub fn fit_on_canvas<P>(
    source: &ImageBuffer<P, Vec<P::Subpixel>>,
    size: u32,
    background: P,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let (content_w, content_h) = compute_fit(source.width(), source.height(), size);
    let resized = imageops::resize(source, content_w, content_h, RESIZE_FILTER);

    let mut canvas = ImageBuffer::from_pixel(size, size, background);
    let offset_x = i64::from(size.saturating_sub(content_w) / 2);
    let offset_y = i64::from(size.saturating_sub(content_h) / 2);
    imageops::replace(&mut canvas, &resized, offset_x, offset_y);
    canvas
}

pub fn check_size(size: u32, min: u32, max: u32) -> Result<u32, BrandingError> {
    if (min..=max).contains(&size) {
        Ok(size)
    } else {
        Err(BrandingError::InvalidSize { size, min, max })
    }
}

/// Parses `#rgb` / `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>, BrandingError> {
    let invalid = || BrandingError::InvalidColor(value.to_string());
    let hex = value.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let expand = |i: usize| channel(hex[i..=i].repeat(2).as_str());
            Ok(Rgb([expand(0)?, expand(1)?, expand(2)?]))
        }
        6 => Ok(Rgb([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;

    #[test]
    fn fit_preserves_aspect_ratio() {
        assert_eq!(compute_fit(400, 100, 96), (96, 24));
        assert_eq!(compute_fit(100, 400, 96), (24, 96));
        assert_eq!(compute_fit(512, 512, 192), (192, 192));
    }

    #[test]
    fn fit_scales_small_sources_up() {
        assert_eq!(compute_fit(20, 10, 192), (192, 96));
        assert_eq!(compute_fit(3, 3, 256), (256, 256));
    }

    #[test]
    fn fit_never_collapses_a_side() {
        assert_eq!(compute_fit(1000, 1, 16), (16, 1));
    }

    #[test]
    fn transparent_pixels_take_the_background_colour() {
        let mut rgba = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 0]));
        rgba.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        rgba.put_pixel(1, 0, Rgba([200, 100, 0, 128]));

        let flat = flatten_alpha(&DynamicImage::ImageRgba8(rgba), Rgb([0, 0, 0]));

        assert_eq!(*flat.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*flat.get_pixel(1, 0), Rgb([100, 50, 0]));
        assert_eq!(*flat.get_pixel(3, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn opaque_images_pass_through_flattening() {
        let rgb = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let flat = flatten_alpha(&DynamicImage::ImageRgb8(rgb.clone()), Rgb([0, 0, 0]));
        assert_eq!(flat, rgb);
    }

    #[test]
    fn canvas_is_exact_size_and_content_is_centred() {
        let source = RgbImage::from_pixel(400, 100, Rgb([255, 255, 255]));
        let canvas = fit_on_canvas(&source, 96, Rgb([0, 0, 0]));

        assert_eq!(canvas.dimensions(), (96, 96));
        // 96x24 content sits between rows 36 and 59.
        assert_eq!(*canvas.get_pixel(48, 10), Rgb([0, 0, 0]));
        assert_eq!(*canvas.get_pixel(48, 48), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(48, 85), Rgb([0, 0, 0]));
    }

    #[test]
    fn transparent_canvas_keeps_padding_transparent() {
        let source = RgbaImage::from_pixel(10, 20, Rgba([0, 200, 200, 255]));
        let canvas = fit_on_canvas(&source, 32, Rgba([0, 0, 0, 0]));

        assert_eq!(canvas.dimensions(), (32, 32));
        assert_eq!(canvas.get_pixel(0, 16)[3], 0);
        assert_eq!(canvas.get_pixel(16, 16)[3], 255);
    }

    #[test]
    fn hex_colours_parse_in_both_lengths() {
        assert_eq!(parse_hex_color("#000000").unwrap(), Rgb([0, 0, 0]));
        assert_eq!(parse_hex_color("1ab").unwrap(), Rgb([0x11, 0xaa, 0xbb]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }

    #[test]
    fn sizes_are_bounded() {
        assert!(check_size(256, 1, 256).is_ok());
        assert!(matches!(
            check_size(0, 1, 256),
            Err(BrandingError::InvalidSize { size: 0, .. })
        ));
    }
}
