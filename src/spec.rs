use crate::error::LabelError;
use crate::types::Color;

/// Smallest size a text line is allowed to shrink to after the per-element
/// offsets are applied.
pub const MIN_READABLE_FONT_SIZE: u32 = 8;

/// The full set of user-editable parameters describing one label: text,
/// colors and photo placement. A plain value object; rendering works on a
/// validated copy and never mutates the caller's instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSpec {
    pub beer_name: String,
    pub subtitle: String,
    pub abv: String,
    pub description: String,
    pub beer_size: String,
    pub border_color: Color,
    pub text_color: Color,
    pub font: String,
    pub font_size: u32,
    pub image_scale: f32,
    pub image_rotation: f32,
    pub image_x: f32,
    pub image_y: f32,
    pub crop_x: f32,
    pub crop_y: f32,
    pub design_type: String,
}

impl Default for LabelSpec {
    fn default() -> Self {
        Self {
            beer_name: String::new(),
            subtitle: String::new(),
            abv: String::new(),
            description: String::new(),
            beer_size: "500ML".to_string(),
            border_color: Color::BLACK,
            text_color: Color::BLACK,
            font: "Arial".to_string(),
            font_size: 32,
            image_scale: 100.0,
            image_rotation: 0.0,
            image_x: 50.0,
            image_y: 50.0,
            crop_x: 50.0,
            crop_y: 50.0,
            design_type: "design1".to_string(),
        }
    }
}

impl LabelSpec {
    /// Returns a checked copy of the spec, or an input error when an anchor
    /// or percentage field lies outside [0, 100] or the base font size is
    /// zero. Key fields (`design_type`, `beer_size`) are resolved later by
    /// the registries they index into and fail there as configuration
    /// errors.
    pub fn validated(&self) -> Result<LabelSpec, LabelError> {
        for (name, value) in [
            ("image_x", self.image_x),
            ("image_y", self.image_y),
            ("crop_x", self.crop_x),
            ("crop_y", self.crop_y),
            ("image_scale", self.image_scale),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(LabelError::Input(format!(
                    "{name} must lie in [0, 100], got {value}"
                )));
            }
        }
        if !self.image_rotation.is_finite() {
            return Err(LabelError::Input(
                "image_rotation must be a finite angle".to_string(),
            ));
        }
        if self.font_size == 0 {
            return Err(LabelError::Input("font_size must be positive".to_string()));
        }
        Ok(self.clone())
    }

    /// Size for a sub-element rendered `drop` units below the base size,
    /// floored so no line becomes unreadably small.
    pub(crate) fn element_font_size(&self, drop: u32) -> u32 {
        self.font_size.saturating_sub(drop).max(MIN_READABLE_FONT_SIZE)
    }

    /// The combined size/ABV line, e.g. `500ML // 5.2%/VOL`.
    pub(crate) fn size_abv_line(&self) -> String {
        format!("{} // {}%/VOL", self.beer_size, self.abv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_spec_matches_documented_defaults() {
        let spec = LabelSpec::default();
        assert_eq!(spec.beer_size, "500ML");
        assert_eq!(spec.font, "Arial");
        assert_eq!(spec.font_size, 32);
        assert_eq!(spec.design_type, "design1");
        assert_eq!(spec.image_x, 50.0);
        assert_eq!(spec.crop_y, 50.0);
        assert_eq!(spec.border_color, Color::BLACK);
        assert_eq!(spec.image_rotation, 0.0);
    }

    #[test]
    fn validated_rejects_out_of_range_anchor() {
        let mut spec = LabelSpec::default();
        spec.crop_x = 150.0;
        assert!(matches!(spec.validated(), Err(LabelError::Input(_))));

        let mut spec = LabelSpec::default();
        spec.image_y = -1.0;
        assert!(matches!(spec.validated(), Err(LabelError::Input(_))));
    }

    #[test]
    fn validated_accepts_boundary_anchors() {
        let mut spec = LabelSpec::default();
        spec.crop_x = 0.0;
        spec.crop_y = 100.0;
        assert!(spec.validated().is_ok());
    }

    #[test]
    fn validated_rejects_zero_font_size() {
        let mut spec = LabelSpec::default();
        spec.font_size = 0;
        assert!(matches!(spec.validated(), Err(LabelError::Input(_))));
    }

    #[test]
    fn validated_copies_rather_than_mutates() {
        let spec = LabelSpec {
            crop_x: 25.0,
            ..LabelSpec::default()
        };
        let checked = spec.validated().unwrap();
        assert_eq!(checked, spec);
    }

    #[test]
    fn element_font_size_floors_at_minimum() {
        let spec = LabelSpec {
            font_size: 12,
            ..LabelSpec::default()
        };
        assert_eq!(spec.element_font_size(10), MIN_READABLE_FONT_SIZE);
        assert_eq!(spec.element_font_size(2), 10);
    }

    #[test]
    fn size_abv_line_formats_like_the_printed_label() {
        let spec = LabelSpec {
            beer_size: "330ML".to_string(),
            abv: "4.7".to_string(),
            ..LabelSpec::default()
        };
        assert_eq!(spec.size_abv_line(), "330ML // 4.7%/VOL");
    }
}
