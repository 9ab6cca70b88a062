use std::fmt;

#[derive(Debug)]
pub enum LabelError {
    Input(String),
    UnknownDesign(String),
    UnknownSizePreset(String),
    InvalidConfiguration(String),
    Asset(String),
    Io(std::io::Error),
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::Input(message) => write!(f, "invalid input: {}", message),
            LabelError::UnknownDesign(key) => write!(f, "no such design: {}", key),
            LabelError::UnknownSizePreset(key) => {
                write!(f, "no such label size preset: {}", key)
            }
            LabelError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            LabelError::Asset(message) => write!(f, "asset error: {}", message),
            LabelError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for LabelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LabelError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LabelError {
    fn from(value: std::io::Error) -> Self {
        LabelError::Io(value)
    }
}
