use crate::error::LabelError;
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Crops the source to the target aspect ratio, anchored by the crop
/// fractions, then resizes to exactly the target dimensions.
///
/// Only the axis that is "too long" for the target ratio is cropped; the
/// anchor maps 0 → keep the top/left edge, 100 → keep the bottom/right
/// edge, 50 → center. Resampling is Lanczos3.
pub(crate) fn resolve(
    source: &RgbaImage,
    target_width: u32,
    target_height: u32,
    crop_x: f32,
    crop_y: f32,
) -> Result<RgbaImage, LabelError> {
    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(LabelError::Input(
            "source image has no usable pixels".to_string(),
        ));
    }
    if target_width == 0 || target_height == 0 {
        return Err(LabelError::InvalidConfiguration(format!(
            "degenerate crop target {target_width}x{target_height}"
        )));
    }

    let target_ratio = target_width as f32 / target_height as f32;
    let src_ratio = src_w as f32 / src_h as f32;

    let cropped = if src_ratio > target_ratio {
        // Source is relatively wider: crop width, keep full height.
        let new_width = (target_ratio * src_h as f32) as u32;
        if new_width == 0 {
            return Err(LabelError::Input(
                "crop collapses the source to zero width".to_string(),
            ));
        }
        let left = ((src_w - new_width) as f32 * crop_x / 100.0) as u32;
        imageops::crop_imm(source, left, 0, new_width, src_h).to_image()
    } else {
        let new_height = (src_w as f32 / target_ratio) as u32;
        if new_height == 0 {
            return Err(LabelError::Input(
                "crop collapses the source to zero height".to_string(),
            ));
        }
        let top = ((src_h - new_height) as f32 * crop_y / 100.0) as u32;
        imageops::crop_imm(source, 0, top, src_w, new_height).to_image()
    };

    Ok(imageops::resize(
        &cropped,
        target_width,
        target_height,
        FilterType::Lanczos3,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

    fn split_columns(width: u32, height: u32, boundary: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| if x < boundary { RED } else { GREEN })
    }

    fn split_rows(width: u32, height: u32, boundary: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |_, y| if y < boundary { RED } else { GREEN })
    }

    fn is_reddish(px: &Rgba<u8>) -> bool {
        px.0[0] > 200 && px.0[1] < 50
    }

    fn is_greenish(px: &Rgba<u8>) -> bool {
        px.0[1] > 200 && px.0[0] < 50
    }

    #[test]
    fn output_always_matches_target_dimensions() {
        let wide = split_columns(100, 37, 50);
        let tall = split_rows(37, 100, 50);
        for (tw, th) in [(50, 50), (24, 31), (91, 13), (1, 1)] {
            let out = resolve(&wide, tw, th, 50.0, 50.0).unwrap();
            assert_eq!(out.dimensions(), (tw, th));
            let out = resolve(&tall, tw, th, 50.0, 50.0).unwrap();
            assert_eq!(out.dimensions(), (tw, th));
        }
    }

    #[test]
    fn horizontal_anchor_selects_opposite_ends_of_a_wide_source() {
        // 100x50 source, square target: the crop keeps a 50-wide window.
        let source = split_columns(100, 50, 50);
        let left = resolve(&source, 50, 50, 0.0, 50.0).unwrap();
        assert!(is_reddish(left.get_pixel(25, 25)));
        let right = resolve(&source, 50, 50, 100.0, 50.0).unwrap();
        assert!(is_greenish(right.get_pixel(25, 25)));
    }

    #[test]
    fn horizontal_anchor_fifty_centers_the_crop() {
        // Centered crop spans columns 25..75; the color boundary lands mid-output.
        let source = split_columns(100, 50, 50);
        let out = resolve(&source, 50, 50, 50.0, 50.0).unwrap();
        assert!(is_reddish(out.get_pixel(15, 25)));
        assert!(is_greenish(out.get_pixel(35, 25)));
    }

    #[test]
    fn vertical_anchor_selects_opposite_ends_of_a_tall_source() {
        let source = split_rows(50, 100, 50);
        let top = resolve(&source, 50, 50, 50.0, 0.0).unwrap();
        assert!(is_reddish(top.get_pixel(25, 25)));
        let bottom = resolve(&source, 50, 50, 50.0, 100.0).unwrap();
        assert!(is_greenish(bottom.get_pixel(25, 25)));
    }

    #[test]
    fn zero_sized_source_is_an_input_error() {
        let empty = RgbaImage::new(0, 10);
        assert!(matches!(
            resolve(&empty, 10, 10, 50.0, 50.0),
            Err(LabelError::Input(_))
        ));
    }

    #[test]
    fn degenerate_target_is_rejected() {
        let source = split_columns(10, 10, 5);
        assert!(matches!(
            resolve(&source, 0, 10, 50.0, 50.0),
            Err(LabelError::InvalidConfiguration(_))
        ));
    }
}
