mod helpers;
pub mod java;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// How a discovered file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceLanguage {
    /// `.java` text, read with tree-sitter.
    JavaSource,
    /// `.class` bytes, read with the class-file reader.
    JavaBinary,
}

impl SourceLanguage {
    pub fn id(self) -> &'static str {
        match self {
            Self::JavaSource => "java-source",
            Self::JavaBinary => "java-binary",
        }
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::JavaSource => &["java"],
            Self::JavaBinary => &["class"],
        }
    }

    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        [Self::JavaSource, Self::JavaBinary]
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext))
    }
}
