use std::{fmt, ops};

use ahash::{HashMap, HashMapExt};
use smallvec::SmallVec;

use crate::VoiceType;

/// Synthesis backend bound to a track. The actual synthesis lives elsewhere; tracks only need to know which one.
pub trait Renderer: Send + fmt::Debug {
    /// Name saved into projects.
    fn name(&self) -> &str;
}

pub trait RendererFactory {
    /// Errors if `name` isn't a known renderer or it couldn't be constructed.
    fn create(&self, name: &str) -> anyhow::Result<Box<dyn Renderer>>;
    fn default_name_for(&self, voice_type: VoiceType) -> &str;
}

/// Renderer that's fully described by its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRenderer(Box<str>);

impl NamedRenderer {
    pub fn new(name: &str) -> Self {
        Self(name.into())
    }
}

impl Renderer for NamedRenderer {
    fn name(&self) -> &str {
        &self.0
    }
}

pub struct RendererConstructor(pub Box<dyn Send + Sync + Fn() -> anyhow::Result<Box<dyn Renderer>>>);
impl ops::Deref for RendererConstructor {
    type Target = dyn Send + Sync + Fn() -> anyhow::Result<Box<dyn Renderer>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl fmt::Debug for RendererConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RendererConstructor {{ <{:?}> }}", self as *const _)
    }
}

/// The renderers the application ships with, plus which one each voice type starts out with.
#[derive(Debug)]
pub struct RendererTable {
    constructors: HashMap<Box<str>, RendererConstructor>,
    defaults: SmallVec<[(VoiceType, Box<str>); 3]>,
}

impl RendererTable {
    pub const CLASSIC: &'static str = "CLASSIC";
    pub const PARAMETRIC: &'static str = "PARAMETRIC";
    pub const NEURAL: &'static str = "NEURAL";

    pub fn new() -> Self {
        let mut this = Self::empty();
        for (name, voice_type) in [
            (Self::CLASSIC, VoiceType::Concatenative),
            (Self::PARAMETRIC, VoiceType::Parametric),
            (Self::NEURAL, VoiceType::Neural),
        ] {
            this.register(name, move || Ok(Box::new(NamedRenderer::new(name))));
            this.set_default(voice_type, name);
        }
        this
    }

    /// No renderers and no defaults.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
            defaults: SmallVec::new(),
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        constructor: impl 'static + Send + Sync + Fn() -> anyhow::Result<Box<dyn Renderer>>,
    ) {
        if self
            .constructors
            .insert(name.into(), RendererConstructor(Box::new(constructor)))
            .is_some()
        {
            panic!("renderer name collision for {name}");
        }
    }

    pub fn set_default(&mut self, voice_type: VoiceType, name: &str) {
        if !self.constructors.contains_key(name) {
            tracing::warn!("default renderer {name:?} for {voice_type:?} isn't registered");
        }
        match self.defaults.iter_mut().find(|(ty, _)| *ty == voice_type) {
            Some((_, existing)) => *existing = name.into(),
            None => self.defaults.push((voice_type, name.into())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Sorted for consistent display.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(|name| &**name).collect();
        names.sort_unstable();
        names
    }
}

impl Default for RendererTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererFactory for RendererTable {
    fn create(&self, name: &str) -> anyhow::Result<Box<dyn Renderer>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("unknown renderer {name:?}"))?;
        constructor()
    }
    fn default_name_for(&self, voice_type: VoiceType) -> &str {
        self.defaults
            .iter()
            .find(|(ty, _)| *ty == voice_type)
            .map(|(_, name)| &**name)
            .unwrap_or("")
    }
}
