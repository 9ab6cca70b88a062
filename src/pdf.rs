use crate::compose::RenderedLabel;
use crate::error::LabelError;
use crate::metrics::AssemblyMetrics;
use crate::pack;
use crate::presets::PresetRegistry;
use crate::raster;
use crate::types::{Pt, Size};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

const PAGE_MARGIN: f32 = 36.0;
const TILE_SPACING: f32 = 5.0;
const BOTTLE_CAPTION_SIZE: f32 = 8.0;
const BOTTLE_CAPTION_GAP: f32 = 10.0;
const KEG_CAPTION_SIZE: f32 = 10.0;
const KEG_CAPTION_GAP: f32 = 20.0;

// Fixed object layout for the two-page document.
const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const RESOURCES_ID: usize = 3;
const CAPTION_FONT_ID: usize = 4;
const BOTTLE_IMAGE_ID: usize = 5;
const KEG_IMAGE_ID: usize = 6;
const PAGE_ONE_CONTENT_ID: usize = 7;
const PAGE_ONE_ID: usize = 8;
const PAGE_TWO_CONTENT_ID: usize = 9;
const PAGE_TWO_ID: usize = 10;

/// Builds the print document: page one tiles the bottle label at its
/// physical preset size, page two centers the keg label, captions under
/// every placement. Output is deterministic for identical rasters.
pub(crate) fn assemble(
    bottle: &RenderedLabel,
    keg: &RenderedLabel,
    size_key: &str,
    presets: &PresetRegistry,
) -> Result<Vec<u8>, LabelError> {
    assemble_with_metrics(bottle, keg, size_key, presets).map(|(bytes, _)| bytes)
}

pub(crate) fn assemble_with_metrics(
    bottle: &RenderedLabel,
    keg: &RenderedLabel,
    size_key: &str,
    presets: &PresetRegistry,
) -> Result<(Vec<u8>, AssemblyMetrics), LabelError> {
    let label = presets.resolve(size_key)?;
    let page = Size::a4();
    let usable_w = page.width.to_f32() - 2.0 * PAGE_MARGIN;
    let usable_h = page.height.to_f32() - 2.0 * PAGE_MARGIN;
    if label.width.to_f32() > usable_w || label.height.to_f32() > usable_h {
        return Err(LabelError::InvalidConfiguration(format!(
            "label preset {size_key} does not fit the page inside its margins"
        )));
    }

    let placements = pack::pack(
        page,
        Pt::from_f32(PAGE_MARGIN),
        Pt::from_f32(TILE_SPACING),
        label,
    );

    let mut page_one = String::new();
    let bottle_caption = format!("Bottle Label ({size_key})");
    for rect in &placements {
        let x = rect.x.to_f32();
        let y = rect.y.to_f32();
        page_one.push_str("q\n");
        page_one.push_str(&format!(
            "{} 0 0 {} {} {} cm\n",
            fmt_num(rect.width.to_f32()),
            fmt_num(rect.height.to_f32()),
            fmt_num(x),
            fmt_num(y)
        ));
        page_one.push_str("/Im1 Do\nQ\n");
        page_one.push_str(&caption_ops(
            &bottle_caption,
            BOTTLE_CAPTION_SIZE,
            x,
            y - BOTTLE_CAPTION_GAP,
        ));
    }

    let keg_side = usable_w.min(usable_h);
    let keg_x = (page.width.to_f32() - keg_side) / 2.0;
    let keg_y = (page.height.to_f32() - keg_side) / 2.0;
    let mut page_two = String::new();
    page_two.push_str("q\n");
    page_two.push_str(&format!(
        "{} 0 0 {} {} {} cm\n",
        fmt_num(keg_side),
        fmt_num(keg_side),
        fmt_num(keg_x),
        fmt_num(keg_y)
    ));
    page_two.push_str("/Im2 Do\nQ\n");
    page_two.push_str(&caption_ops(
        "Keg Label (Square)",
        KEG_CAPTION_SIZE,
        keg_x,
        keg_y - KEG_CAPTION_GAP,
    ));

    let media_box = format!(
        "[0 0 {} {}]",
        fmt_num(page.width.to_f32()),
        fmt_num(page.height.to_f32())
    );
    let objects = vec![
        format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>"),
        format!("<< /Type /Pages /Kids [{PAGE_ONE_ID} 0 R {PAGE_TWO_ID} 0 R] /Count 2 >>"),
        format!(
            "<< /Font << /F1 {CAPTION_FONT_ID} 0 R >> /XObject << /Im1 {BOTTLE_IMAGE_ID} 0 R /Im2 {KEG_IMAGE_ID} 0 R >> >>"
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        image_object(bottle.pixmap()),
        image_object(keg.pixmap()),
        content_object(&page_one),
        page_object(PAGE_ONE_CONTENT_ID, &media_box),
        content_object(&page_two),
        page_object(PAGE_TWO_CONTENT_ID, &media_box),
    ];
    debug_assert_eq!(objects.len(), PAGE_TWO_ID);
    debug_assert!(objects[CATALOG_ID - 1].contains("/Catalog"));
    debug_assert!(objects[RESOURCES_ID - 1].contains("/XObject"));

    let bytes = serialize(&objects);
    let metrics = AssemblyMetrics {
        pages: 2,
        bottle_tiles: placements.len(),
        document_bytes: bytes.len(),
    };
    Ok((bytes, metrics))
}

fn caption_ops(text: &str, font_size: f32, x: f32, y: f32) -> String {
    format!(
        "BT\n/F1 {} Tf\n{} {} Td\n({}) Tj\nET\n",
        fmt_num(font_size),
        fmt_num(x),
        fmt_num(y),
        escape_pdf_text(text)
    )
}

fn page_object(content_id: usize, media_box: &str) -> String {
    format!(
        "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox {media_box} /Resources {RESOURCES_ID} 0 R /Contents {content_id} 0 R >>"
    )
}

fn content_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}endstream",
        content.len(),
        content
    )
}

/// RGB image XObject. Hex-encoding on top of the zlib stream keeps every
/// object body printable, so offsets stay byte-exact across platforms.
fn image_object(pixmap: &tiny_skia::Pixmap) -> String {
    let rgb = raster::rgb_bytes(pixmap);
    let compressed = flate_compress(&rgb);
    let stream_data = encode_stream_data(&compressed);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>\nstream\n{}\nendstream",
        pixmap.width(),
        pixmap.height(),
        stream_data.len(),
        stream_data
    )
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = String::with_capacity(data.len() * 2 + 1);
    for byte in data {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex.push('>');
    hex
}

fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            _ => out.push(ch),
        }
    }
    out
}

/// Trims trailing zeros so coordinates stay compact and stable.
fn fmt_num(value: f32) -> String {
    let mut out = format!("{value:.2}");
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    out
}

fn serialize(objects: &[String]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", index + 1, body).as_bytes());
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF",
            objects.len() + 1,
            CATALOG_ID,
            xref_start
        )
        .as_bytes(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Pixmap;

    fn solid_label(w: u32, h: u32, rgba: (u8, u8, u8, u8)) -> RenderedLabel {
        let mut pixmap = Pixmap::new(w, h).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(rgba.0, rgba.1, rgba.2, rgba.3));
        RenderedLabel::from_pixmap(pixmap)
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn document_has_two_pages_and_both_captions() {
        let bottle = solid_label(4, 4, (200, 10, 10, 255));
        let keg = solid_label(6, 6, (10, 200, 10, 255));
        let presets = PresetRegistry::new();
        let bytes = assemble(&bottle, &keg, "500ML", &presets).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.starts_with("%PDF-1.7\n"));
        assert!(text.ends_with("%%EOF"));
        assert_eq!(count(&text, "/Type /Page /Parent"), 2);
        assert!(text.contains("Bottle Label \\(500ML\\)"));
        assert!(text.contains("Keg Label \\(Square\\)"));
        assert!(text.contains("startxref"));
    }

    #[test]
    fn bottle_preset_tiles_four_copies() {
        let bottle = solid_label(4, 4, (0, 0, 0, 255));
        let keg = solid_label(4, 4, (0, 0, 0, 255));
        let presets = PresetRegistry::new();
        let (_, metrics) = assemble_with_metrics(&bottle, &keg, "500ML", &presets).unwrap();
        assert_eq!(metrics.pages, 2);
        assert_eq!(metrics.bottle_tiles, 4);

        let (bytes, _) = assemble_with_metrics(&bottle, &keg, "500ML", &presets).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(count(&text, "/Im1 Do"), 4);
        assert_eq!(count(&text, "/Im2 Do"), 1);
    }

    #[test]
    fn unknown_size_key_fails_assembly() {
        let bottle = solid_label(2, 2, (0, 0, 0, 255));
        let keg = solid_label(2, 2, (0, 0, 0, 255));
        let presets = PresetRegistry::new();
        assert!(matches!(
            assemble(&bottle, &keg, "1L", &presets),
            Err(LabelError::UnknownSizePreset(_))
        ));
    }

    #[test]
    fn oversized_preset_is_rejected_rather_than_overflowing() {
        let bottle = solid_label(2, 2, (0, 0, 0, 255));
        let keg = solid_label(2, 2, (0, 0, 0, 255));
        let presets = PresetRegistry::new();
        presets.register("A2", 42.0, 59.4);
        assert!(matches!(
            assemble(&bottle, &keg, "A2", &presets),
            Err(LabelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn identical_rasters_produce_identical_documents() {
        let bottle = solid_label(3, 5, (120, 80, 40, 255));
        let keg = solid_label(5, 5, (40, 80, 120, 255));
        let presets = PresetRegistry::new();
        let first = assemble(&bottle, &keg, "330ML", &presets).unwrap();
        let second = assemble(&bottle, &keg, "330ML", &presets).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn xref_offsets_point_at_object_headers() {
        let bottle = solid_label(2, 2, (0, 0, 0, 255));
        let keg = solid_label(2, 2, (0, 0, 0, 255));
        let presets = PresetRegistry::new();
        let bytes = assemble(&bottle, &keg, "330ML", &presets).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        let startxref_pos = text.rfind("startxref\n").unwrap();
        let xref_start: usize = text[startxref_pos + "startxref\n".len()..]
            .lines()
            .next()
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let table = &text[xref_start..];
        assert!(table.starts_with("xref\n"));
        for (index, line) in table.lines().skip(3).take(PAGE_TWO_ID).enumerate() {
            let offset: usize = line[..10].parse().unwrap();
            let header = format!("{} 0 obj", index + 1);
            assert!(
                text[offset..].starts_with(&header),
                "object {} offset {} mismatched",
                index + 1,
                offset
            );
        }
    }

    #[test]
    fn fmt_num_trims_trailing_zeros() {
        assert_eq!(fmt_num(36.0), "36");
        assert_eq!(fmt_num(255.15), "255.15");
        assert_eq!(fmt_num(12.5), "12.5");
    }
}
