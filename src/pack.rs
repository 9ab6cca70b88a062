use crate::types::{Pt, Rect, Size};

/// Positions copies of a label on one page. All units are page points.
///
/// Column/row counts come from how many label-plus-gap strides fit into
/// the usable span; the leftover usable space is then redistributed as the
/// actual gap so the grid fills the span evenly instead of leaving one
/// trailing hole. Positions are emitted row-major, top row first, and `y`
/// is the lower-left corner in page space (top of page minus margin minus
/// the rows laid so far).
pub(crate) fn pack(page: Size, margin: Pt, spacing: Pt, label: Size) -> Vec<Rect> {
    let page_w = page.width.to_f32();
    let page_h = page.height.to_f32();
    let margin = margin.to_f32();
    let spacing = spacing.to_f32();
    let label_w = label.width.to_f32();
    let label_h = label.height.to_f32();

    let usable_w = page_w - 2.0 * margin;
    let usable_h = page_h - 2.0 * margin;

    let columns = (((usable_w + spacing) / (label_w + spacing)).floor() as i32).max(1);
    let rows = (((usable_h + spacing) / (label_h + spacing)).floor() as i32).max(1);

    let h_spacing = if columns > 1 {
        (usable_w - columns as f32 * label_w) / (columns - 1) as f32
    } else {
        0.0
    };
    let v_spacing = if rows > 1 {
        (usable_h - rows as f32 * label_h) / (rows - 1) as f32
    } else {
        0.0
    };

    let mut positions = Vec::with_capacity((rows * columns) as usize);
    for row in 0..rows {
        for col in 0..columns {
            let x = margin + col as f32 * (label_w + h_spacing);
            let y = page_h - margin - label_h - row as f32 * (label_h + v_spacing);
            positions.push(Rect {
                x: Pt::from_f32(x),
                y: Pt::from_f32(y),
                width: label.width,
                height: label.height,
            });
        }
    }
    positions
}
