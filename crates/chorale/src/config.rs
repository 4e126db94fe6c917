use std::path::{Path, PathBuf};

use anyhow::Context;
use chorale_lib::{RendererTable, VoiceType};

/// Looked up in the working directory when `--config` isn't given.
pub const DEFAULT_CONFIG_PATH: &str = "chorale.toml";

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub singers_path: PathBuf,
    pub additional_singers_path: Option<PathBuf>,
    pub default_renderers: DefaultRenderers,
    /// Load every singer in the background right after scanning.
    pub preload_singers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            singers_path: PathBuf::from("singers"),
            additional_singers_path: None,
            default_renderers: DefaultRenderers::default(),
            preload_singers: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultRenderers {
    pub concatenative: Option<String>,
    pub parametric: Option<String>,
    pub neural: Option<String>,
}

impl DefaultRenderers {
    pub fn get(&self, voice_type: VoiceType) -> Option<&str> {
        match voice_type {
            VoiceType::Concatenative => self.concatenative.as_deref(),
            VoiceType::Parametric => self.parametric.as_deref(),
            VoiceType::Neural => self.neural.as_deref(),
        }
    }
}

impl Config {
    /// An explicitly given file has to exist. Without one, a missing `chorale.toml` means defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };
        if !required && !path.exists() {
            tracing::debug!("no {} found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Directories to scan, in order. Later ones win on id collisions.
    pub fn singer_dirs(&self) -> Vec<PathBuf> {
        std::iter::once(self.singers_path.clone())
            .chain(self.additional_singers_path.clone())
            .collect()
    }

    pub fn apply_default_renderers(&self, renderers: &mut RendererTable) {
        for voice_type in VoiceType::ALL {
            if let Some(name) = self.default_renderers.get(voice_type) {
                renderers.set_default(voice_type, name);
            }
        }
    }
}
