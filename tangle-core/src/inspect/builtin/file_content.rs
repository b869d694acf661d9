use std::hash::{Hash, Hasher};
use std::path::Path;

use tangle_graphs::languages::SourceLanguage;

use crate::contracts::{properties, tags};
use crate::error::InspectError;
use crate::inspect::{InspectorContract, ItemInspector, ItemOutput, ItemView, PerItemCache};
use crate::types::NodeKind;

/// Reads a discovered file, records its content hash and tags it with the
/// reader that understands it.
#[derive(Debug)]
pub struct FileContentInspector {
    contract: InspectorContract,
}

impl FileContentInspector {
    pub fn new() -> Self {
        Self {
            contract: InspectorContract::new("file-content", NodeKind::File)
                .produces(tags::FILE_READ)
                .produces(tags::LANG_JAVA_SOURCE)
                .produces(tags::LANG_JAVA_BINARY)
                .produces(properties::FILE_HASH),
        }
    }
}

impl Default for FileContentInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemInspector for FileContentInspector {
    fn contract(&self) -> &InspectorContract {
        &self.contract
    }

    fn run(
        &self,
        item: &ItemView<'_>,
        out: &mut ItemOutput,
        cache: &mut PerItemCache,
    ) -> crate::error::Result<()> {
        let path = item.file_path();
        let bytes = cache.bytes_or_load(|| read_bytes(&path))?;

        out.set_property(properties::FILE_HASH, serde_json::json!(format!("{:016x}", hash_bytes(bytes))));
        out.enable_tag(tags::FILE_READ);
        match SourceLanguage::for_path(Path::new(item.id())) {
            Some(SourceLanguage::JavaSource) => out.enable_tag(tags::LANG_JAVA_SOURCE),
            Some(SourceLanguage::JavaBinary) => out.enable_tag(tags::LANG_JAVA_BINARY),
            None => {}
        }
        Ok(())
    }
}

/// Raw bytes of a file item.
pub(super) fn read_bytes(path: &Path) -> crate::error::Result<Vec<u8>> {
    Ok(std::fs::read(path).map_err(InspectError::Io)?)
}

fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}
