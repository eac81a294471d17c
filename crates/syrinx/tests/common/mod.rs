//! Shared fixtures and mock custom tags for the integration suites.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use syrinx::{CustomDecoder, CustomTag, PlaylistError};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> Vec<u8> {
    fs::read(fixture_path(name)).unwrap_or_else(|e| panic!("fixture {name}: {e}"))
}

pub fn fixture_names() -> Vec<String> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("fixtures directory")
        .filter_map(|entry| {
            let name = entry.ok()?.file_name().into_string().ok()?;
            name.ends_with(".m3u8").then_some(name)
        })
        .collect();
    names.sort();
    names
}

/// A scriptable custom tag that acts as its own decoder.
#[derive(Debug, Clone)]
pub struct MockCustomTag {
    pub name: &'static str,
    pub decode_error: Option<&'static str>,
    pub segment: bool,
    pub encoded: &'static str,
}

impl fmt::Display for MockCustomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoded)
    }
}

impl CustomTag for MockCustomTag {
    fn tag_name(&self) -> &str {
        self.name
    }

    fn encode(&self) -> Option<String> {
        if self.encoded.is_empty() {
            None
        } else {
            Some(self.encoded.to_string())
        }
    }
}

impl CustomDecoder for MockCustomTag {
    fn tag_name(&self) -> &str {
        self.name
    }

    fn decode(&self, _line: &str) -> Result<Box<dyn CustomTag>, PlaylistError> {
        match self.decode_error {
            Some(message) => Err(PlaylistError::Custom(message.to_string())),
            None => Ok(Box::new(self.clone())),
        }
    }

    fn is_segment_tag(&self) -> bool {
        self.segment
    }
}
