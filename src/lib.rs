mod compose;
mod debug;
mod design;
mod error;
mod font;
mod geometry;
mod layout;
mod metrics;
mod pack;
mod pdf;
mod presets;
mod raster;
mod spec;
mod types;

pub use compose::RenderedLabel;
pub use error::LabelError;
pub use font::FontChoice;
pub use metrics::AssemblyMetrics;
pub use raster::SourceImage;
pub use spec::{LabelSpec, MIN_READABLE_FONT_SIZE};
pub use types::{Color, PT_PER_CM, Pt, Rect, Size};

use crate::debug::DebugLogger;
use crate::design::DesignRegistry;
use crate::font::FontLibrary;
use crate::presets::PresetRegistry;
use std::path::PathBuf;

/// The built engine: fonts, print-size presets and the design registry.
/// Every render call is a pure function of its arguments; the studio holds
/// no per-render state and can be shared behind an `Arc`.
pub struct LabelStudio {
    fonts: FontLibrary,
    presets: PresetRegistry,
    designs: DesignRegistry,
    debug: Option<DebugLogger>,
}

#[derive(Default)]
pub struct LabelStudioBuilder {
    font_dirs: Vec<PathBuf>,
    font_files: Vec<PathBuf>,
    font_bytes: Vec<(Option<String>, Vec<u8>)>,
    label_sizes: Vec<(String, f32, f32)>,
    debug_path: Option<PathBuf>,
}

impl LabelStudioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every `.ttf`/`.otf` face found in `path`.
    pub fn font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_files.push(path.into());
        self
    }

    pub fn font_bytes(mut self, data: Vec<u8>, source_name: Option<&str>) -> Self {
        self.font_bytes
            .push((source_name.map(|s| s.to_string()), data));
        self
    }

    /// Adds a custom physical label size, dimensions in centimeters.
    pub fn label_size(mut self, name: impl Into<String>, width_cm: f32, height_cm: f32) -> Self {
        self.label_sizes.push((name.into(), width_cm, height_cm));
        self
    }

    /// Writes JSON-lines diagnostics to `path`. Purely observational;
    /// rendered bytes do not change.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<LabelStudio, LabelError> {
        let mut fonts = FontLibrary::new();
        for dir in &self.font_dirs {
            fonts.register_dir(dir);
        }
        for file in &self.font_files {
            fonts.register_file(file);
        }
        for (source, data) in self.font_bytes {
            fonts.register_bytes(data, source.as_deref())?;
        }

        let presets = PresetRegistry::new();
        for (name, width_cm, height_cm) in self.label_sizes {
            presets.register(name, width_cm, height_cm);
        }

        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };

        Ok(LabelStudio {
            fonts,
            presets,
            designs: DesignRegistry::new(),
            debug,
        })
    }
}

impl LabelStudio {
    pub fn builder() -> LabelStudioBuilder {
        LabelStudioBuilder::new()
    }

    /// Renders the preview raster for `spec` and returns it as PNG bytes.
    pub fn render_preview(
        &self,
        spec: &LabelSpec,
        source: Option<&SourceImage>,
    ) -> Result<Vec<u8>, LabelError> {
        self.render_preview_label(spec, source)?.to_png()
    }

    /// Renders the preview raster without encoding it.
    pub fn render_preview_label(
        &self,
        spec: &LabelSpec,
        source: Option<&SourceImage>,
    ) -> Result<RenderedLabel, LabelError> {
        let started = std::time::Instant::now();
        let spec = spec.validated()?;
        let variant = self.designs.resolve(&spec.design_type)?;
        let label = variant.preview(&self.fonts, &spec, source)?;
        if let Some(logger) = self.debug.as_ref() {
            let json = format!(
                "{{\"type\":\"render.preview\",\"design\":\"{}\",\"canvas\":{{\"w\":{},\"h\":{}}},\"ms\":{:.3}}}",
                debug::json_escape(&spec.design_type),
                label.width(),
                label.height(),
                started.elapsed().as_secs_f64() * 1000.0
            );
            logger.log_json(&json);
            logger.increment("render.preview", 1);
            logger.emit_summary("render.preview");
            logger.flush();
        }
        Ok(label)
    }

    /// Renders the two print rasters and assembles the two-page document.
    pub fn render_print(
        &self,
        spec: &LabelSpec,
        source: Option<&SourceImage>,
    ) -> Result<Vec<u8>, LabelError> {
        self.render_print_with_metrics(spec, source)
            .map(|(bytes, _)| bytes)
    }

    pub fn render_print_with_metrics(
        &self,
        spec: &LabelSpec,
        source: Option<&SourceImage>,
    ) -> Result<(Vec<u8>, AssemblyMetrics), LabelError> {
        let started = std::time::Instant::now();
        let spec = spec.validated()?;
        let variant = self.designs.resolve(&spec.design_type)?;
        let rasters = variant.print_rasters(&self.fonts, &spec, source)?;
        let (bytes, metrics) = pdf::assemble_with_metrics(
            &rasters.bottle,
            &rasters.keg,
            &spec.beer_size,
            &self.presets,
        )?;
        if let Some(logger) = self.debug.as_ref() {
            let json = format!(
                "{{\"type\":\"render.print\",\"design\":\"{}\",\"size\":\"{}\",\"pages\":{},\"tiles\":{},\"bytes\":{},\"ms\":{:.3}}}",
                debug::json_escape(&spec.design_type),
                debug::json_escape(&spec.beer_size),
                metrics.pages,
                metrics.bottle_tiles,
                metrics.document_bytes,
                started.elapsed().as_secs_f64() * 1000.0
            );
            logger.log_json(&json);
            logger.increment("render.print", 1);
            logger.emit_summary("render.print");
            logger.flush();
        }
        Ok((bytes, metrics))
    }

    /// Registers a custom physical label size at runtime, dimensions in
    /// centimeters. Registration is serialized; concurrent renders keep
    /// reading.
    pub fn add_label_size(&self, name: impl Into<String>, width_cm: f32, height_cm: f32) {
        self.presets.register(name, width_cm, height_cm);
    }

    /// Reports whether `family` resolves to a registered face or degrades
    /// to the documented default. `None` means no face is available at
    /// all; renders still complete, skipping text draws. Hosts can use
    /// this to warn the user before printing.
    pub fn font_choice(&self, family: &str) -> Option<FontChoice> {
        self.fonts.select(family).map(|face| face.choice)
    }

    /// Keys of the registered design variants, sorted.
    pub fn design_keys(&self) -> Vec<String> {
        self.designs.keys()
    }

    /// Primary names of the registered font faces, in registration order.
    pub fn font_families(&self) -> Vec<String> {
        self.fonts.family_names()
    }
}
