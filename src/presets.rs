use crate::error::LabelError;
use crate::types::Size;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Named physical label footprint used to size print output and drive page
/// packing. Reads are concurrent; registration takes the write lock.
pub(crate) struct PresetRegistry {
    sizes: RwLock<BTreeMap<String, Size>>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        let mut sizes = BTreeMap::new();
        sizes.insert("500ML".to_string(), Size::from_cm(9.0, 10.0));
        sizes.insert("330ML".to_string(), Size::from_cm(6.3, 7.0));
        Self {
            sizes: RwLock::new(sizes),
        }
    }

    pub fn register(&self, name: impl Into<String>, width_cm: f32, height_cm: f32) {
        let name = name.into();
        if let Ok(mut sizes) = self.sizes.write() {
            sizes.insert(name, Size::from_cm(width_cm, height_cm));
        }
    }

    pub fn resolve(&self, key: &str) -> Result<Size, LabelError> {
        self.sizes
            .read()
            .ok()
            .and_then(|sizes| sizes.get(key).copied())
            .ok_or_else(|| LabelError::UnknownSizePreset(key.to_string()))
    }
}
