use crate::font::FaceData;
use crate::types::Color;
use rustybuzz::{Direction, Face as ShapingFace, UnicodeBuffer};
use tiny_skia::{Path, PathBuilder};
use ttf_parser::{GlyphId, OutlineBuilder};

/// Vertical gap inserted between stacked lines, and the panel's text margin.
pub(crate) const LINE_SPACING: f32 = 8.0;

/// One glyph ready to be filled: outline origin on the baseline, with the
/// em-to-pixel scale baked in.
pub(crate) struct GlyphPlacement {
    pub glyph_id: u16,
    pub origin_x: f32,
    pub origin_y: f32,
    pub scale: f32,
}

pub(crate) struct LineInput {
    pub text: String,
    pub face: Option<FaceData>,
    pub size: f32,
    pub color: Color,
}

pub(crate) struct PlacedLine {
    pub text: String,
    pub face: Option<FaceData>,
    pub size: f32,
    pub color: Color,
    /// Left edge of the line.
    pub x: f32,
    /// Top of the line's em box (the baseline sits one ascent below).
    pub y: f32,
}

/// Ink (rendered glyph bounding box) extents of one line, in pixels.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct InkExtents {
    pub width: f32,
    pub height: f32,
}

/// Stacks lines top-to-bottom from a fixed left margin. Each line's
/// vertical advance is its own ink height plus [`LINE_SPACING`] rather
/// than a fixed line height, so mixed sizes pack naturally.
pub(crate) fn stack_lines(lines: Vec<LineInput>, left: f32, top: f32) -> Vec<PlacedLine> {
    let mut placed = Vec::with_capacity(lines.len());
    let mut cursor_y = top;
    for line in lines {
        let ink = match line.face.as_ref() {
            Some(face) => ink_extents(&face.data, &line.text, line.size),
            None => InkExtents::default(),
        };
        placed.push(PlacedLine {
            text: line.text,
            face: line.face,
            size: line.size,
            color: line.color,
            x: left,
            y: cursor_y,
        });
        cursor_y += ink.height + LINE_SPACING;
    }
    placed
}

/// Shapes a line and lays each glyph out along the baseline with a
/// left-to-right pen advance. Falls back to plain cmap lookups when the
/// face cannot be shaped.
pub(crate) fn shape_line(
    font_data: &[u8],
    text: &str,
    font_size: f32,
    baseline_x: f32,
    baseline_y: f32,
) -> Vec<GlyphPlacement> {
    let Some(face) = ShapingFace::from_slice(font_data, 0) else {
        return layout_unshaped(font_data, text, font_size, baseline_x, baseline_y);
    };
    let units = face.units_per_em().max(1) as f32;
    let scale = font_size / units;
    let mut buffer = UnicodeBuffer::new();
    buffer.set_direction(Direction::LeftToRight);
    buffer.push_str(text);
    let output = rustybuzz::shape(&face, &[], buffer);
    let infos = output.glyph_infos();
    let positions = output.glyph_positions();
    if infos.is_empty() || infos.len() != positions.len() {
        return layout_unshaped(font_data, text, font_size, baseline_x, baseline_y);
    }

    let mut out = Vec::with_capacity(infos.len());
    let mut pen_x = 0.0f32;
    for (info, pos) in infos.iter().zip(positions.iter()) {
        let gid = info.glyph_id as u16;
        if gid == 0 {
            pen_x += (pos.x_advance as f32 / units) * font_size;
            continue;
        }
        let x_off = (pos.x_offset as f32 / units) * font_size;
        let y_off = (pos.y_offset as f32 / units) * font_size;
        out.push(GlyphPlacement {
            glyph_id: gid,
            origin_x: baseline_x + pen_x + x_off,
            origin_y: baseline_y - y_off,
            scale,
        });
        pen_x += (pos.x_advance as f32 / units) * font_size;
    }
    out
}

fn layout_unshaped(
    font_data: &[u8],
    text: &str,
    font_size: f32,
    baseline_x: f32,
    baseline_y: f32,
) -> Vec<GlyphPlacement> {
    let Ok(face) = ttf_parser::Face::parse(font_data, 0) else {
        return Vec::new();
    };
    let units = face.units_per_em().max(1) as f32;
    let scale = font_size / units;

    let mut out = Vec::new();
    let mut pen_x = 0.0f32;
    for ch in text.chars() {
        let gid = face.glyph_index(ch).map(|id| id.0).unwrap_or(0);
        if gid == 0 {
            pen_x += font_size * 0.5;
            continue;
        }
        out.push(GlyphPlacement {
            glyph_id: gid,
            origin_x: baseline_x + pen_x,
            origin_y: baseline_y,
            scale,
        });
        let advance_units = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0) as f32;
        let mut adv = (advance_units / units) * font_size;
        if adv <= 0.0 {
            adv = font_size * 0.5;
        }
        pen_x += adv;
    }
    out
}

/// Rendered bounding box of a line, from per-glyph outlines placed on a
/// zero baseline. Empty text (or text with no outlines) has zero extents.
pub(crate) fn ink_extents(font_data: &[u8], text: &str, font_size: f32) -> InkExtents {
    let Ok(face) = ttf_parser::Face::parse(font_data, 0) else {
        return InkExtents::default();
    };
    let placements = shape_line(font_data, text, font_size, 0.0, 0.0);
    let mut min_x = f32::MAX;
    let mut max_x = f32::MIN;
    let mut min_y = f32::MAX;
    let mut max_y = f32::MIN;
    let mut any = false;
    for placement in &placements {
        let Some(bbox) = face.glyph_bounding_box(GlyphId(placement.glyph_id)) else {
            continue;
        };
        any = true;
        // Font units are y-up; placements carry a y-down origin.
        min_x = min_x.min(placement.origin_x + bbox.x_min as f32 * placement.scale);
        max_x = max_x.max(placement.origin_x + bbox.x_max as f32 * placement.scale);
        min_y = min_y.min(placement.origin_y - bbox.y_max as f32 * placement.scale);
        max_y = max_y.max(placement.origin_y - bbox.y_min as f32 * placement.scale);
    }
    if !any {
        return InkExtents::default();
    }
    InkExtents {
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

/// Distance from the top of the em box to the baseline, in pixels.
pub(crate) fn ascent_px(font_data: &[u8], font_size: f32) -> f32 {
    let Ok(face) = ttf_parser::Face::parse(font_data, 0) else {
        return font_size * 0.8;
    };
    let units = face.units_per_em().max(1) as f32;
    face.ascender() as f32 / units * font_size
}

/// Collects a glyph outline into a pixmap-space path: scaled about the
/// baseline origin with the y axis flipped (outlines are y-up, rasters
/// y-down).
pub(crate) struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    pub fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    pub fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x2 * self.scale,
            self.origin_y - y2 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_lines_advances_by_spacing_for_inkless_lines() {
        let lines = vec![
            LineInput {
                text: "one".to_string(),
                face: None,
                size: 32.0,
                color: Color::BLACK,
            },
            LineInput {
                text: "two".to_string(),
                face: None,
                size: 22.0,
                color: Color::BLACK,
            },
            LineInput {
                text: String::new(),
                face: None,
                size: 22.0,
                color: Color::BLACK,
            },
        ];
        let placed = stack_lines(lines, 8.0, 8.0);
        assert_eq!(placed.len(), 3);
        assert!(placed.iter().all(|line| line.x == 8.0));
        assert_eq!(placed[0].y, 8.0);
        assert_eq!(placed[1].y, 8.0 + LINE_SPACING);
        assert_eq!(placed[2].y, 8.0 + 2.0 * LINE_SPACING);
    }

    #[test]
    fn shape_line_is_empty_for_unparseable_face() {
        assert!(shape_line(&[0u8; 8], "abc", 12.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn ink_extents_default_to_zero_without_outlines() {
        let ink = ink_extents(&[0u8; 8], "abc", 12.0);
        assert_eq!(ink.width, 0.0);
        assert_eq!(ink.height, 0.0);
    }

    #[test]
    fn ascent_guess_scales_with_size_when_face_is_missing() {
        assert!((ascent_px(&[0u8; 4], 10.0) - 8.0).abs() < 0.001);
    }
}
