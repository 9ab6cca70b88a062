use crate::compose::{self, PanelStyle, RenderedLabel};
use crate::error::LabelError;
use crate::font::FontLibrary;
use crate::raster::SourceImage;
use crate::spec::LabelSpec;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Canvas sizes shared by the built-in designs: a tall bottle face for
/// previews and print, and a large square for the keg lid.
const PREVIEW_CANVAS: (u32, u32) = (540, 600);
const BOTTLE_CANVAS: (u32, u32) = (540, 600);
const KEG_CANVAS: (u32, u32) = (2160, 2400);

pub(crate) struct PrintRasters {
    pub bottle: RenderedLabel,
    pub keg: RenderedLabel,
}

/// One label template. All variants share the same contract: a preview
/// raster at a fixed canvas, and the bottle + keg print rasters.
pub(crate) trait DesignVariant: Send + Sync {
    fn preview(
        &self,
        fonts: &FontLibrary,
        spec: &LabelSpec,
        source: Option<&SourceImage>,
    ) -> Result<RenderedLabel, LabelError>;

    fn print_rasters(
        &self,
        fonts: &FontLibrary,
        spec: &LabelSpec,
        source: Option<&SourceImage>,
    ) -> Result<PrintRasters, LabelError>;
}

/// The standard panel-on-photo template. Variants differ only in panel
/// typography and whether the photo honors `image_rotation`, so both
/// built-ins are this one struct with different parameters.
struct ClassicDesign {
    style: PanelStyle,
}

impl DesignVariant for ClassicDesign {
    fn preview(
        &self,
        fonts: &FontLibrary,
        spec: &LabelSpec,
        source: Option<&SourceImage>,
    ) -> Result<RenderedLabel, LabelError> {
        let (w, h) = PREVIEW_CANVAS;
        compose::compose(source, spec, w, h, fonts, &self.style)
    }

    fn print_rasters(
        &self,
        fonts: &FontLibrary,
        spec: &LabelSpec,
        source: Option<&SourceImage>,
    ) -> Result<PrintRasters, LabelError> {
        let (bw, bh) = BOTTLE_CANVAS;
        let (kw, kh) = KEG_CANVAS;
        Ok(PrintRasters {
            bottle: compose::compose(source, spec, bw, bh, fonts, &self.style)?,
            keg: compose::compose(source, spec, kw, kh, fonts, &self.style)?,
        })
    }
}

pub(crate) struct DesignRegistry {
    variants: BTreeMap<String, Arc<dyn DesignVariant>>,
}

impl DesignRegistry {
    /// Registers the built-in designs. Registration is explicit and
    /// exhaustive; lookups fail loudly on a miss.
    pub fn new() -> Self {
        let mut variants: BTreeMap<String, Arc<dyn DesignVariant>> = BTreeMap::new();
        variants.insert(
            "design1".to_string(),
            Arc::new(ClassicDesign {
                style: PanelStyle {
                    subtitle_drop: 10,
                    abv_drop: 10,
                    honor_rotation: false,
                },
            }),
        );
        variants.insert(
            "design2".to_string(),
            Arc::new(ClassicDesign {
                style: PanelStyle {
                    subtitle_drop: 4,
                    abv_drop: 8,
                    honor_rotation: true,
                },
            }),
        );
        Self { variants }
    }

    pub fn resolve(&self, key: &str) -> Result<&Arc<dyn DesignVariant>, LabelError> {
        self.variants
            .get(key)
            .ok_or_else(|| LabelError::UnknownDesign(key.to_string()))
    }

    pub fn keys(&self) -> Vec<String> {
        self.variants.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_designs_are_registered() {
        let registry = DesignRegistry::new();
        assert_eq!(registry.keys(), vec!["design1", "design2"]);
        assert!(registry.resolve("design1").is_ok());
        assert!(registry.resolve("design2").is_ok());
    }

    #[test]
    fn unknown_design_fails_loudly() {
        let registry = DesignRegistry::new();
        assert!(matches!(
            registry.resolve("design99"),
            Err(LabelError::UnknownDesign(_))
        ));
    }

    #[test]
    fn preview_uses_the_fixed_preview_canvas() {
        let registry = DesignRegistry::new();
        let fonts = FontLibrary::new();
        let variant = registry.resolve("design1").unwrap();
        let label = variant
            .preview(&fonts, &LabelSpec::default(), None)
            .unwrap();
        assert_eq!((label.width(), label.height()), PREVIEW_CANVAS);
    }

    #[test]
    fn print_rasters_cover_bottle_and_keg_canvases() {
        let registry = DesignRegistry::new();
        let fonts = FontLibrary::new();
        let variant = registry.resolve("design2").unwrap();
        let rasters = variant
            .print_rasters(&fonts, &LabelSpec::default(), None)
            .unwrap();
        assert_eq!((rasters.bottle.width(), rasters.bottle.height()), BOTTLE_CANVAS);
        assert_eq!((rasters.keg.width(), rasters.keg.height()), KEG_CANVAS);
    }
}
