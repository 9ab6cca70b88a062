use crate::error::LabelError;
use crate::font::FontLibrary;
use crate::geometry;
use crate::layout::{self, GlyphPathBuilder, LineInput, PlacedLine};
use crate::raster::{self, SourceImage};
use crate::spec::LabelSpec;
use crate::types::Color;
use tiny_skia::{FillRule, Paint, Pixmap, PixmapPaint, Rect as SkRect, Transform};
use ttf_parser::GlyphId;

const BORDER_WIDTH: u32 = 1;
const PANEL_MARGIN: f32 = 8.0;
const WATERMARK_SIZE: f32 = 100.0;
const WATERMARK_ALPHA: f32 = 64.0 / 255.0;

/// How one design variant parameterizes the shared compositing path:
/// per-element font-size drops, and whether the source photo honors
/// `image_rotation`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PanelStyle {
    pub subtitle_drop: u32,
    pub abv_drop: u32,
    pub honor_rotation: bool,
}

/// One finished label raster. Produced fresh per render call and never
/// mutated afterwards.
pub struct RenderedLabel {
    pixmap: Pixmap,
}

impl RenderedLabel {
    pub(crate) fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Lossless PNG encoding of the raster.
    pub fn to_png(&self) -> Result<Vec<u8>, LabelError> {
        raster::encode_png(&self.pixmap)
    }

    pub(crate) fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

/// Assembles one label raster at exactly `canvas_w` x `canvas_h`:
/// background photo (or placeholder fill), rotated text panel, watermark
/// letter, border. Deterministic for identical inputs.
pub(crate) fn compose(
    source: Option<&SourceImage>,
    spec: &LabelSpec,
    canvas_w: u32,
    canvas_h: u32,
    fonts: &FontLibrary,
    style: &PanelStyle,
) -> Result<RenderedLabel, LabelError> {
    let mut canvas = Pixmap::new(canvas_w, canvas_h).ok_or_else(|| {
        LabelError::InvalidConfiguration(format!("empty canvas {canvas_w}x{canvas_h}"))
    })?;

    // 1. Background: the cropped photo on white, or a solid placeholder.
    match source {
        None => canvas.fill(to_sk(Color::BLUE, 1.0)),
        Some(source) => {
            canvas.fill(to_sk(Color::WHITE, 1.0));
            let (crop_w, crop_h) = if canvas_h > canvas_w {
                (canvas_w, canvas_h)
            } else {
                let side = canvas_w.min(canvas_h);
                (side, side)
            };
            let cropped =
                geometry::resolve(source.pixels(), crop_w, crop_h, spec.crop_x, spec.crop_y)?;
            let mut photo = raster::pixmap_from_rgba(&cropped).ok_or_else(|| {
                LabelError::InvalidConfiguration("cropped photo has no pixels".to_string())
            })?;
            if style.honor_rotation && spec.image_rotation != 0.0 {
                photo = raster::rotate_ccw_expand(&photo, spec.image_rotation);
            }
            let paste_x =
                ((canvas_w as f32 - photo.width() as f32) * spec.image_x / 100.0) as i32;
            let paste_y =
                ((canvas_h as f32 - photo.height() as f32) * spec.image_y / 100.0) as i32;
            canvas.draw_pixmap(
                paste_x,
                paste_y,
                photo.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
    }

    // 2. Text panel, laid out horizontally before its 90-degree turn. The
    // panel length spans the canvas height minus the border on both ends.
    let panel_len = canvas_h.saturating_sub(2 * BORDER_WIDTH);
    let panel_thickness = canvas_w / 5;
    let mut panel = Pixmap::new(panel_len, panel_thickness).ok_or_else(|| {
        LabelError::InvalidConfiguration(format!(
            "canvas {canvas_w}x{canvas_h} leaves no room for the text panel"
        ))
    })?;
    panel.fill(to_sk(Color::WHITE, 1.0));

    let title_face = fonts.select_bold(&spec.font);
    let body_face = fonts.select(&spec.font);
    let lines = vec![
        LineInput {
            text: spec.beer_name.clone(),
            face: title_face.clone(),
            size: spec.font_size as f32,
            color: spec.text_color,
        },
        LineInput {
            text: spec.subtitle.clone(),
            face: body_face.clone(),
            size: spec.element_font_size(style.subtitle_drop) as f32,
            color: spec.text_color,
        },
        LineInput {
            text: spec.size_abv_line(),
            face: body_face,
            size: spec.element_font_size(style.abv_drop) as f32,
            color: spec.text_color,
        },
    ];
    for line in layout::stack_lines(lines, PANEL_MARGIN, PANEL_MARGIN) {
        draw_line(&mut panel, &line, 1.0);
    }

    // 3 + 4. Turn the panel upright, then drop the oversized first letter
    // of the title into it. The letter lands after the text lines on the
    // same layer; overlap with a long subtitle is part of the design.
    let mut panel = raster::rotate90_ccw(&panel);
    if let Some(first) = spec.beer_name.chars().next() {
        let letter = first.to_string();
        if let Some(face) = title_face {
            let ink = layout::ink_extents(&face.data, &letter, WATERMARK_SIZE);
            let letter_x = ((panel.width() as f32 - ink.width) / 2.0).floor();
            let line = PlacedLine {
                text: letter,
                face: Some(face),
                size: WATERMARK_SIZE,
                color: Color::BLACK,
                x: letter_x,
                y: PANEL_MARGIN,
            };
            draw_line(&mut panel, &line, WATERMARK_ALPHA);
        }
    }

    let panel_left = canvas_w as i32 - panel.width() as i32 - BORDER_WIDTH as i32;
    let panel_top = (canvas_h as i32 - panel.height() as i32) / 2;
    canvas.draw_pixmap(
        panel_left,
        panel_top,
        panel.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );

    // 5. Border, one unit wide, along every canvas edge.
    draw_border(&mut canvas, spec.border_color);

    Ok(RenderedLabel::from_pixmap(canvas))
}

/// Fills one line's glyph outlines. Lines without a resolvable face draw
/// nothing; the render still completes.
fn draw_line(pixmap: &mut Pixmap, line: &PlacedLine, opacity: f32) {
    let Some(face_data) = line.face.as_ref() else {
        return;
    };
    if line.text.is_empty() {
        return;
    }
    let Ok(face) = ttf_parser::Face::parse(&face_data.data, 0) else {
        return;
    };

    let baseline_y = line.y + layout::ascent_px(&face_data.data, line.size);
    let placements = layout::shape_line(&face_data.data, &line.text, line.size, line.x, baseline_y);

    let mut paint = Paint::default();
    paint.set_color(to_sk(line.color, opacity));
    paint.anti_alias = true;

    for placement in placements {
        let mut builder =
            GlyphPathBuilder::new(placement.origin_x, placement.origin_y, placement.scale);
        if face
            .outline_glyph(GlyphId(placement.glyph_id), &mut builder)
            .is_none()
        {
            continue;
        }
        let Some(path) = builder.finish() else {
            continue;
        };
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

fn draw_border(canvas: &mut Pixmap, color: Color) {
    let w = canvas.width() as f32;
    let h = canvas.height() as f32;
    let bw = BORDER_WIDTH as f32;
    let mut paint = Paint::default();
    paint.set_color(to_sk(color, 1.0));
    paint.anti_alias = false;

    let edges = [
        SkRect::from_xywh(0.0, 0.0, w, bw),
        SkRect::from_xywh(0.0, h - bw, w, bw),
        SkRect::from_xywh(0.0, 0.0, bw, h),
        SkRect::from_xywh(w - bw, 0.0, bw, h),
    ];
    for rect in edges.into_iter().flatten() {
        canvas.fill_rect(rect, &paint, Transform::identity(), None);
    }
}

fn to_sk(color: Color, opacity: f32) -> tiny_skia::Color {
    let r = color.r.clamp(0.0, 1.0);
    let g = color.g.clamp(0.0, 1.0);
    let b = color.b.clamp(0.0, 1.0);
    let a = opacity.clamp(0.0, 1.0);
    tiny_skia::Color::from_rgba(r, g, b, a)
        .unwrap_or_else(|| tiny_skia::Color::from_rgba8(0, 0, 0, 255))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const PREVIEW_W: u32 = 540;
    const PREVIEW_H: u32 = 600;

    fn style() -> PanelStyle {
        PanelStyle {
            subtitle_drop: 10,
            abv_drop: 10,
            honor_rotation: false,
        }
    }

    fn rotating_style() -> PanelStyle {
        PanelStyle {
            subtitle_drop: 4,
            abv_drop: 8,
            honor_rotation: true,
        }
    }

    fn red_photo() -> SourceImage {
        SourceImage::from_rgba(RgbaImage::from_pixel(64, 48, Rgba([200, 10, 10, 255]))).unwrap()
    }

    fn rgb_at(label: &RenderedLabel, x: u32, y: u32) -> (u8, u8, u8) {
        let px = label.pixmap().pixel(x, y).unwrap().demultiply();
        (px.red(), px.green(), px.blue())
    }

    #[test]
    fn output_is_exactly_the_requested_canvas() {
        let fonts = FontLibrary::new();
        let label = compose(
            None,
            &LabelSpec::default(),
            PREVIEW_W,
            PREVIEW_H,
            &fonts,
            &style(),
        )
        .unwrap();
        assert_eq!((label.width(), label.height()), (PREVIEW_W, PREVIEW_H));
    }

    #[test]
    fn missing_photo_paints_the_placeholder_fill() {
        let fonts = FontLibrary::new();
        let label = compose(
            None,
            &LabelSpec::default(),
            PREVIEW_W,
            PREVIEW_H,
            &fonts,
            &style(),
        )
        .unwrap();
        // Left of the panel, inside the border.
        assert_eq!(rgb_at(&label, 100, 300), (0, 0, 255));
    }

    #[test]
    fn border_and_panel_land_where_the_design_puts_them() {
        let fonts = FontLibrary::new();
        let label = compose(
            None,
            &LabelSpec::default(),
            PREVIEW_W,
            PREVIEW_H,
            &fonts,
            &style(),
        )
        .unwrap();
        // Border corner in the default border color.
        assert_eq!(rgb_at(&label, 0, 0), (0, 0, 0));
        assert_eq!(rgb_at(&label, PREVIEW_W - 1, PREVIEW_H - 1), (0, 0, 0));
        // The vertical panel hugs the right edge; its far side is blank white.
        assert_eq!(rgb_at(&label, PREVIEW_W - 20, 300), (255, 255, 255));
    }

    #[test]
    fn photo_fills_a_tall_canvas_behind_the_panel() {
        let fonts = FontLibrary::new();
        let label = compose(
            Some(&red_photo()),
            &LabelSpec::default(),
            PREVIEW_W,
            PREVIEW_H,
            &fonts,
            &style(),
        )
        .unwrap();
        let (r, g, b) = rgb_at(&label, 100, 300);
        assert!(r > 150 && g < 60 && b < 60, "got ({r},{g},{b})");
    }

    #[test]
    fn square_canvas_crops_the_photo_to_a_centered_square() {
        let fonts = FontLibrary::new();
        let label = compose(
            Some(&red_photo()),
            &LabelSpec::default(),
            400,
            300,
            &fonts,
            &style(),
        )
        .unwrap();
        assert_eq!((label.width(), label.height()), (400, 300));
        // Square photo of side 300 centered at x 50..350.
        let (r, ..) = rgb_at(&label, 200, 150);
        assert!(r > 150);
        // Outside the pasted square the white background shows.
        assert_eq!(rgb_at(&label, 10, 150), (255, 255, 255));
    }

    #[test]
    fn identical_inputs_produce_identical_rasters() {
        let fonts = FontLibrary::new();
        let spec = LabelSpec {
            beer_name: "Nocturne".to_string(),
            subtitle: "Dry Stout".to_string(),
            abv: "4.8".to_string(),
            ..LabelSpec::default()
        };
        let photo = red_photo();
        let first = compose(Some(&photo), &spec, PREVIEW_W, PREVIEW_H, &fonts, &style())
            .unwrap()
            .to_png()
            .unwrap();
        let second = compose(Some(&photo), &spec, PREVIEW_W, PREVIEW_H, &fonts, &style())
            .unwrap()
            .to_png()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rotation_is_ignored_unless_the_variant_honors_it() {
        let fonts = FontLibrary::new();
        let photo = red_photo();
        let mut rotated = LabelSpec::default();
        rotated.image_rotation = 45.0;
        let plain = LabelSpec::default();

        let with_rotation =
            compose(Some(&photo), &rotated, PREVIEW_W, PREVIEW_H, &fonts, &style())
                .unwrap()
                .to_png()
                .unwrap();
        let without =
            compose(Some(&photo), &plain, PREVIEW_W, PREVIEW_H, &fonts, &style())
                .unwrap()
                .to_png()
                .unwrap();
        assert_eq!(with_rotation, without);
    }

    #[test]
    fn zero_rotation_matches_the_unrotated_path() {
        let fonts = FontLibrary::new();
        let photo = red_photo();
        let spec = LabelSpec::default();
        let honoring = compose(
            Some(&photo),
            &spec,
            PREVIEW_W,
            PREVIEW_H,
            &fonts,
            &rotating_style(),
        )
        .unwrap()
        .to_png()
        .unwrap();
        let ignoring = compose(
            Some(&photo),
            &spec,
            PREVIEW_W,
            PREVIEW_H,
            &fonts,
            &PanelStyle {
                honor_rotation: false,
                ..rotating_style()
            },
        )
        .unwrap()
        .to_png()
        .unwrap();
        assert_eq!(honoring, ignoring);
    }

    #[test]
    fn unknown_font_family_still_completes_the_render() {
        let fonts = FontLibrary::new();
        let spec = LabelSpec {
            beer_name: "Glacier".to_string(),
            font: "No Such Family".to_string(),
            ..LabelSpec::default()
        };
        let label = compose(Some(&red_photo()), &spec, PREVIEW_W, PREVIEW_H, &fonts, &style());
        assert!(label.is_ok());
    }
}
