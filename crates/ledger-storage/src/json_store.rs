use crate::DumpStore;
use anyhow::{Context, Result};
use ledger_core::consensus::ChainSnapshot;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::info;

/// Dump kept as a single JSON document on disk.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DumpStore for JsonFileStore {
    fn save(&self, dump: &ChainSnapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(dump)?;
        // Write beside the target then rename, so a crash mid-write keeps the old dump.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        info!(
            "saved chain of {} blocks to {}",
            dump.chain.len(),
            self.path.display()
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<ChainSnapshot>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let dump: ChainSnapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(dump))
    }
}
