/// Facts about one assembled print document, reported alongside the bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblyMetrics {
    pub pages: usize,
    /// Copies of the bottle label tiled onto page one.
    pub bottle_tiles: usize,
    pub document_bytes: usize,
}
