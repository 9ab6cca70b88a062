use crate::error::LabelError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

/// Registered faces, looked up by normalized family name. Font resolution
/// never fails a render: a miss resolves to a documented default instead
/// (first a well-known registered family, then the first registered face,
/// then a system face), reported through [`FontChoice`].
pub(crate) struct FontLibrary {
    fonts: Vec<RegisteredFace>,
    lookup: HashMap<String, usize>,
}

pub(crate) struct RegisteredFace {
    pub name: String,
    pub data: Arc<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontChoice {
    Requested,
    Fallback,
}

#[derive(Clone)]
pub(crate) struct FaceData {
    pub data: Arc<Vec<u8>>,
    pub choice: FontChoice,
}

/// Families probed, in order, when the requested one is absent.
const FALLBACK_FAMILIES: [&str; 4] = ["arial", "helvetica", "dejavu sans", "liberation sans"];

impl FontLibrary {
    pub fn new() -> Self {
        Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Primary names of the registered faces, in registration order.
    pub fn family_names(&self) -> Vec<String> {
        self.fonts.iter().map(|face| face.name.clone()).collect()
    }

    pub fn register_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Ok(entries) = fs::read_dir(path) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                self.register_file(path);
            }
        }
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
            return;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" {
            return;
        }
        let Ok(data) = fs::read(path) else {
            return;
        };
        let _ = self.register_named_bytes(data, path.to_str());
    }

    pub fn register_bytes(
        &mut self,
        data: Vec<u8>,
        source_name: Option<&str>,
    ) -> Result<String, LabelError> {
        self.register_named_bytes(data, source_name)
    }

    fn register_named_bytes(
        &mut self,
        data: Vec<u8>,
        source_name: Option<&str>,
    ) -> Result<String, LabelError> {
        let source = source_name.unwrap_or("EmbeddedFont");
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(LabelError::Asset(format!("invalid font data for {source}")));
        };

        let (name, aliases) = face_names(&face, Path::new(source));
        let index = self.fonts.len();
        self.fonts.push(RegisteredFace {
            name: name.clone(),
            data: Arc::new(data),
        });

        let mut all_aliases = Vec::new();
        all_aliases.push(name.clone());
        all_aliases.extend(aliases);
        for alias in all_aliases {
            let key = normalize_name(&alias);
            if key.is_empty() || self.lookup.contains_key(&key) {
                continue;
            }
            self.lookup.insert(key, index);
        }

        Ok(name)
    }

    fn registered(&self, family: &str) -> Option<&RegisteredFace> {
        let key = normalize_name(family);
        self.lookup.get(&key).and_then(|index| self.fonts.get(*index))
    }

    /// Resolves a family name, falling back rather than failing. `None`
    /// means no face could be found anywhere; callers then skip text draws
    /// and the render still completes.
    pub fn select(&self, family: &str) -> Option<FaceData> {
        if let Some(face) = self.registered(family) {
            return Some(FaceData {
                data: face.data.clone(),
                choice: FontChoice::Requested,
            });
        }
        for fallback in FALLBACK_FAMILIES {
            if let Some(face) = self.registered(fallback) {
                return Some(FaceData {
                    data: face.data.clone(),
                    choice: FontChoice::Fallback,
                });
            }
        }
        if let Some(face) = self.fonts.first() {
            return Some(FaceData {
                data: face.data.clone(),
                choice: FontChoice::Fallback,
            });
        }
        system_face(false).map(|data| FaceData {
            data,
            choice: FontChoice::Fallback,
        })
    }

    /// Like [`select`], preferring a bold cut of the family when one is
    /// registered (the title line of every design asks for bold).
    pub fn select_bold(&self, family: &str) -> Option<FaceData> {
        for candidate in [
            format!("{family} Bold"),
            format!("{family}-Bold"),
            format!("{family}Bold"),
        ] {
            if let Some(face) = self.registered(&candidate) {
                return Some(FaceData {
                    data: face.data.clone(),
                    choice: FontChoice::Requested,
                });
            }
        }
        if self.registered(family).is_none() && self.fonts.is_empty() {
            if let Some(data) = system_face(true) {
                return Some(FaceData {
                    data,
                    choice: FontChoice::Fallback,
                });
            }
        }
        self.select(family)
    }
}

/// Lazily-probed system faces, shared across all libraries in the process.
static SYSTEM_FACE_CACHE: OnceLock<Mutex<HashMap<bool, Option<Arc<Vec<u8>>>>>> = OnceLock::new();

fn system_face(bold: bool) -> Option<Arc<Vec<u8>>> {
    let cache = SYSTEM_FACE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Ok(cache) = cache.lock() {
        if let Some(entry) = cache.get(&bold) {
            return entry.clone();
        }
    }
    let loaded = load_system_face(bold);
    if let Ok(mut cache) = cache.lock() {
        cache.insert(bold, loaded.clone());
    }
    loaded
}

fn load_system_face(bold: bool) -> Option<Arc<Vec<u8>>> {
    let dirs: [&str; 6] = [
        "/usr/share/fonts/truetype/dejavu",
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/TTF",
        "/usr/share/fonts",
        "/Library/Fonts",
        "C:\\Windows\\Fonts",
    ];
    let files: &[&str] = if bold {
        &[
            "DejaVuSans-Bold.ttf",
            "LiberationSans-Bold.ttf",
            "Arial Bold.ttf",
            "arialbd.ttf",
        ]
    } else {
        &[
            "DejaVuSans.ttf",
            "LiberationSans-Regular.ttf",
            "Arial.ttf",
            "arial.ttf",
        ]
    };
    for dir in dirs {
        for file in files {
            let path = Path::new(dir).join(file);
            if let Ok(data) = fs::read(&path) {
                if ttf_parser::Face::parse(&data, 0).is_ok() {
                    return Some(Arc::new(data));
                }
            }
        }
    }
    None
}

fn face_names(face: &ttf_parser::Face<'_>, path: &Path) -> (String, Vec<String>) {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;
    let mut post = None;

    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => {
                if family.is_none() {
                    family = Some(name);
                }
            }
            name_id::FULL_NAME => {
                if full.is_none() {
                    full = Some(name);
                }
            }
            name_id::POST_SCRIPT_NAME => {
                if post.is_none() {
                    post = Some(name);
                }
            }
            _ => {}
        }
    }

    let stem = path
        .file_stem()
        .and_then(|v| v.to_str())
        .map(|v| v.to_string());
    let primary = full
        .clone()
        .or_else(|| family.clone())
        .or_else(|| post.clone())
        .or_else(|| stem.clone())
        .unwrap_or_else(|| "EmbeddedFont".to_string());

    let mut aliases = Vec::new();
    for candidate in [family, full, post, stem].into_iter().flatten() {
        if candidate != primary {
            aliases.push(candidate);
        }
    }

    (primary, aliases)
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_strips_quotes_and_case() {
        assert_eq!(normalize_name("  \"Arial Bold\" "), "arial bold");
        assert_eq!(normalize_name("'DejaVu Sans'"), "dejavu sans");
    }

    #[test]
    fn register_bytes_rejects_non_font_data() {
        let mut library = FontLibrary::new();
        let result = library.register_bytes(vec![0u8; 64], Some("junk.ttf"));
        assert!(matches!(result, Err(LabelError::Asset(_))));
        assert_eq!(library.len(), 0);
    }

    #[test]
    fn register_file_ignores_unrelated_extensions() {
        let mut library = FontLibrary::new();
        let path = std::env::temp_dir().join("brewlabel-not-a-font.txt");
        fs::write(&path, b"plain text").unwrap();
        library.register_file(&path);
        assert_eq!(library.len(), 0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn empty_library_never_reports_requested() {
        let library = FontLibrary::new();
        if let Some(face) = library.select("Arial") {
            // Only a system face can satisfy this; it is a fallback by definition.
            assert_eq!(face.choice, FontChoice::Fallback);
            assert!(!face.data.is_empty());
        }
    }
}
