//! Voice banks on disk: one directory per bank, described by a `voicebank.toml`.
//!
//! ```toml
//! name = "Alice"
//! voice_type = "concatenative"
//!
//! [[subbanks]]
//! color = "soft"
//! suffix = "_S"
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use chorale_lib::{SingerCatalogue, SingerRef, Subbank, VoiceBank, VoiceType};

pub const MANIFEST_NAME: &str = "voicebank.toml";

/// The part of the manifest needed to list a bank without loading it.
#[derive(Debug, serde::Deserialize)]
struct ManifestHeader {
    name: String,
    voice_type: VoiceType,
}

#[derive(Debug, serde::Deserialize)]
struct ManifestBody {
    #[serde(default)]
    subbanks: Vec<Subbank>,
}

fn read_manifest<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid manifest {}", path.display()))
}

/// Reads the bank in `dir`. The id is the directory name; sub-voicebanks are only read once the
/// singer gets loaded.
pub fn open_voice_bank(dir: &Path) -> anyhow::Result<VoiceBank> {
    let id = dir
        .file_name()
        .with_context(|| format!("{} has no directory name", dir.display()))?
        .to_string_lossy()
        .into_owned();
    let manifest = dir.join(MANIFEST_NAME);
    let header: ManifestHeader = read_manifest(&manifest)?;

    Ok(VoiceBank::new(&id, &header.name, header.voice_type, move || {
        let body: ManifestBody = read_manifest(&manifest)?;
        Ok(body.subbanks)
    }))
}

/// Every bank directly under `root`, sorted by directory name. Broken banks are skipped.
pub fn scan_dir(root: &Path) -> anyhow::Result<Vec<Arc<VoiceBank>>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .with_context(|| format!("failed to list {}", root.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.join(MANIFEST_NAME).is_file())
        .collect();
    dirs.sort();

    let mut singers = Vec::with_capacity(dirs.len());
    for dir in dirs {
        match open_voice_bank(&dir) {
            Ok(bank) => singers.push(Arc::new(bank)),
            Err(err) => tracing::warn!("skipping voice bank: {err:#}"),
        }
    }
    Ok(singers)
}

/// Scans every root into `catalogue`, replacing whatever it held, and returns the banks found. A
/// root that can't be listed is skipped with a warning.
pub fn rescan(catalogue: &mut SingerCatalogue, roots: &[PathBuf]) -> Vec<Arc<VoiceBank>> {
    let mut singers = Vec::new();
    for root in roots {
        match scan_dir(root) {
            Ok(found) => {
                tracing::info!("found {} singers in {}", found.len(), root.display());
                singers.extend(found);
            }
            Err(err) => tracing::warn!("{err:#}"),
        }
    }
    catalogue.replace_all(singers.iter().map(|bank| bank.clone() as SingerRef));
    singers
}
