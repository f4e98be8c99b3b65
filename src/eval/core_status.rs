use crate::utils::{open_record_reader, Result};
use std::{collections::HashMap, io::Read, path::Path};

const CORE: &str = "Core";

/// Core status of every frame element, keyed by frame name then role name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreStatus {
    frames: HashMap<String, HashMap<String, String>>,
}

impl CoreStatus {
    pub fn new(frames: HashMap<String, HashMap<String, String>>) -> Self {
        Self { frames }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let mut reader = open_record_reader(path)?;
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .map_err(|e| format!("File {}: {}", path.display(), e))?;
        Self::from_json(&contents).map_err(|e| format!("File {}: {}", path.display(), e))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let frames: HashMap<String, HashMap<String, String>> =
            serde_json::from_str(json).map_err(|e| format!("Invalid core status table: {}", e))?;
        Ok(Self { frames })
    }

    /// Unknown frames and roles are treated as non-core.
    pub fn is_core(&self, frame: &str, role: &str) -> bool {
        self.frames
            .get(frame)
            .and_then(|roles| roles.get(role))
            .is_some_and(|status| status == CORE)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}
