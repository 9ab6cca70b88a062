use crate::error::LabelError;
use base64::Engine;
use image::RgbaImage;
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

/// A decoded caller-supplied photo. Decoding happens once at construction;
/// rendering only ever reads the pixels.
pub struct SourceImage {
    pixels: RgbaImage,
}

impl SourceImage {
    /// Decodes PNG or JPEG bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LabelError> {
        let decoded = image::load_from_memory(data)
            .map_err(|e| LabelError::Input(format!("undecodable source image: {e}")))?;
        Self::from_rgba(decoded.to_rgba8())
    }

    /// Decodes a `data:` URI as produced by browser upload previews.
    pub fn from_data_uri(uri: &str) -> Result<Self, LabelError> {
        let (_mime, data) = parse_data_uri(uri)
            .ok_or_else(|| LabelError::Input("malformed data URI".to_string()))?;
        Self::from_bytes(&data)
    }

    /// Wraps an already-decoded buffer.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, LabelError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(LabelError::Input(
                "source image has no usable pixels".to_string(),
            ));
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub(crate) fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

pub(crate) fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, payload) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}

/// Straight-alpha RGBA rows into a premultiplied pixmap.
pub(crate) fn pixmap_from_rgba(rgba: &RgbaImage) -> Option<Pixmap> {
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    let src = rgba.as_raw();
    let dst = pixmap.data_mut();
    for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let r = src_px[0];
        let g = src_px[1];
        let b = src_px[2];
        let a = src_px[3];
        dst_px[0] = premul_u8(r, a);
        dst_px[1] = premul_u8(g, a);
        dst_px[2] = premul_u8(b, a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

pub(crate) fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

/// Counter-clockwise rotation with the destination expanded so no corner is
/// clipped. Zero degrees is the identity (byte-for-byte). The uncovered
/// corners stay transparent and composite over whatever sits below.
pub(crate) fn rotate_ccw_expand(source: &Pixmap, degrees: f32) -> Pixmap {
    if degrees % 360.0 == 0.0 {
        return source.clone();
    }
    let w = source.width() as f32;
    let h = source.height() as f32;
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let new_w = (w * cos.abs() + h * sin.abs()).round().max(1.0) as u32;
    let new_h = (w * sin.abs() + h * cos.abs()).round().max(1.0) as u32;

    let mut dst = match Pixmap::new(new_w, new_h) {
        Some(pixmap) => pixmap,
        None => return source.clone(),
    };

    // Screen coordinates are y-down, so a visually counter-clockwise turn
    // uses [cos, sin; -sin, cos] about the image center.
    let ts = Transform::from_translate(-w / 2.0, -h / 2.0)
        .post_concat(Transform::from_row(cos, -sin, sin, cos, 0.0, 0.0))
        .post_concat(Transform::from_translate(new_w as f32 / 2.0, new_h as f32 / 2.0));

    let mut paint = PixmapPaint::default();
    paint.quality = FilterQuality::Bilinear;
    dst.draw_pixmap(0, 0, source.as_ref(), &paint, ts, None);
    dst
}

/// Exact 90-degree counter-clockwise turn (dimension swap, no resampling).
pub(crate) fn rotate90_ccw(source: &Pixmap) -> Pixmap {
    let src_w = source.width();
    let src_h = source.height();
    let mut dst = match Pixmap::new(src_h, src_w) {
        Some(pixmap) => pixmap,
        None => return source.clone(),
    };
    let src_data = source.data();
    let dst_data = dst.data_mut();
    for dy in 0..src_w {
        for dx in 0..src_h {
            let sx = src_w - 1 - dy;
            let sy = dx;
            let src_idx = ((sy * src_w + sx) * 4) as usize;
            let dst_idx = ((dy * src_h + dx) * 4) as usize;
            dst_data[dst_idx..dst_idx + 4].copy_from_slice(&src_data[src_idx..src_idx + 4]);
        }
    }
    dst
}

pub(crate) fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, LabelError> {
    pixmap
        .encode_png()
        .map_err(|e| LabelError::Asset(format!("png encode failed: {e}")))
}

/// Demultiplied RGB rows for PDF image embedding. Labels composite onto an
/// opaque background, so alpha is already saturated by the time this runs.
pub(crate) fn rgb_bytes(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity((pixmap.width() * pixmap.height() * 3) as usize);
    for px in pixmap.pixels() {
        let color = px.demultiply();
        out.push(color.red());
        out.push(color.green());
        out.push(color.blue());
    }
    out
}
