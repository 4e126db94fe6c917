use std::{
    borrow::Cow,
    fmt,
    sync::{
        Arc, PoisonError, RwLock, RwLockWriteGuard,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use anyhow::Context;

/// Broad family of a voice bank. Renderers pick their defaults from this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceType {
    Concatenative,
    Parametric,
    Neural,
}

impl VoiceType {
    pub const ALL: [Self; 3] = [Self::Concatenative, Self::Parametric, Self::Neural];
}

/// A partition of a voice bank, tagged with a color so notes can pick a timbre.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Subbank {
    pub color: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
}

impl Subbank {
    pub fn with_color(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            ..Default::default()
        }
    }
}

/// A voice bank as seen by a track. Instances are owned by whatever catalogue loaded them; tracks only hold a [`SingerRef`].
pub trait Singer: Send + Sync + fmt::Debug {
    /// Stable identifier written into saved projects.
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn display_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.name())
    }
    fn voice_type(&self) -> VoiceType;

    /// Whether this singer is actually installed. Placeholders for missing singers return `false`.
    fn found(&self) -> bool;
    /// Whether the backing data (sub-voicebanks etc.) has been read.
    fn loaded(&self) -> bool;
    fn ensure_loaded(&self) -> anyhow::Result<()>;

    /// Empty until the singer is loaded.
    fn subbanks(&self) -> Arc<[Subbank]>;
}

pub type SingerRef = Arc<dyn Singer>;

/// Identity comparison. Two different instances with the same id are different singers.
pub fn same_singer(a: Option<&SingerRef>, b: Option<&SingerRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

type SubbankLoader = Box<dyn Send + Sync + Fn() -> anyhow::Result<Vec<Subbank>>>;

/// An installed voice bank. Sub-voicebanks are read lazily through `loader`.
pub struct VoiceBank {
    id: Box<str>,
    name: Box<str>,
    voice_type: VoiceType,
    loader: SubbankLoader,

    // swapped as a whole so nobody ever sees a half-loaded list
    subbanks: RwLock<Option<Arc<[Subbank]>>>,
}

impl VoiceBank {
    pub fn new(
        id: &str,
        name: &str,
        voice_type: VoiceType,
        loader: impl 'static + Send + Sync + Fn() -> anyhow::Result<Vec<Subbank>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            voice_type,
            loader: Box::new(loader),
            subbanks: RwLock::new(None),
        }
    }

    /// A voice bank whose data is already in memory. Still starts out unloaded.
    pub fn with_subbanks(
        id: &str,
        name: &str,
        voice_type: VoiceType,
        subbanks: Vec<Subbank>,
    ) -> Self {
        Self::new(id, name, voice_type, move || Ok(subbanks.clone()))
    }

    fn slot(&self) -> RwLockWriteGuard<'_, Option<Arc<[Subbank]>>> {
        self.subbanks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, subbanks: Vec<Subbank>, replace: bool) {
        let mut slot = self.slot();
        if replace || slot.is_none() {
            *slot = Some(subbanks.into());
        }
    }

    /// `cancelled` is only ever set while holding the slot, so checking it here orders every
    /// cancel either before or after the whole publish.
    fn publish_unless_cancelled(&self, subbanks: Vec<Subbank>, cancelled: &AtomicBool) -> bool {
        let mut slot = self.slot();
        if cancelled.load(Ordering::Acquire) {
            return false;
        }
        if slot.is_none() {
            *slot = Some(subbanks.into());
        }
        true
    }

    fn load(&self) -> anyhow::Result<Vec<Subbank>> {
        (self.loader)().with_context(|| format!("failed to load singer {:?}", self.id))
    }

    /// Reads the backing data again, even if it was already loaded.
    pub fn reload(&self) -> anyhow::Result<()> {
        let subbanks = self.load()?;
        self.publish(subbanks, true);
        tracing::debug!("reloaded singer {:?}", self.id);
        Ok(())
    }

    /// Loads on a separate thread. The result only becomes visible once the whole load is done,
    /// and not at all if [`LoadHandle::cancel`] got in first.
    pub fn load_in_background(self: &Arc<Self>) -> LoadHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::bounded(1);

        let this = self.clone();
        let thread_cancelled = cancelled.clone();
        let spawned = thread::Builder::new()
            .name(format!("load {}", self.id))
            .spawn(move || {
                let result = this.load_unless_cancelled(&thread_cancelled);
                // the handle might've been dropped, that's fine
                let _ = tx.send(result);
            });

        let thread = match spawned {
            Ok(thread) => Some(thread),
            Err(err) => {
                let (tx, failed) = crossbeam_channel::bounded(1);
                let _ = tx.send(Err(anyhow::Error::new(err).context("couldn't spawn loader thread")));
                return LoadHandle {
                    bank: self.clone(),
                    cancelled,
                    rx: failed,
                    thread: None,
                };
            }
        };

        LoadHandle {
            bank: self.clone(),
            cancelled,
            rx,
            thread,
        }
    }

    fn load_unless_cancelled(&self, cancelled: &AtomicBool) -> anyhow::Result<()> {
        if self.loaded() {
            return Ok(());
        }
        if cancelled.load(Ordering::Acquire) {
            anyhow::bail!("load of singer {:?} was cancelled", self.id);
        }
        let subbanks = self.load()?;
        if !self.publish_unless_cancelled(subbanks, cancelled) {
            anyhow::bail!("load of singer {:?} was cancelled", self.id);
        }
        Ok(())
    }
}

impl Singer for VoiceBank {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn voice_type(&self) -> VoiceType {
        self.voice_type
    }
    fn found(&self) -> bool {
        true
    }
    fn loaded(&self) -> bool {
        self.subbanks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
    fn ensure_loaded(&self) -> anyhow::Result<()> {
        if self.loaded() {
            return Ok(());
        }
        let subbanks = self.load()?;
        self.publish(subbanks, false);
        tracing::debug!("loaded singer {:?}", self.id);
        Ok(())
    }
    fn subbanks(&self) -> Arc<[Subbank]> {
        self.subbanks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| Arc::new([]))
    }
}

impl fmt::Debug for VoiceBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceBank")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("voice_type", &self.voice_type)
            .field("loaded", &self.loaded())
            .finish_non_exhaustive()
    }
}

/// Handle to a [`VoiceBank::load_in_background`] call.
#[derive(Debug)]
pub struct LoadHandle {
    bank: Arc<VoiceBank>,
    cancelled: Arc<AtomicBool>,
    rx: crossbeam_channel::Receiver<anyhow::Result<()>>,
    // `None` if the thread never started
    thread: Option<thread::JoinHandle<()>>,
}

impl LoadHandle {
    /// Once this returns, the load is either already visible or never will be.
    pub fn cancel(&self) {
        let _slot = self.bank.slot();
        self.cancelled.store(true, Ordering::Release);
    }
    /// Also true if the loader thread died without reporting, e.g. on a panic.
    pub fn is_finished(&self) -> bool {
        !self.rx.is_empty()
            || self
                .thread
                .as_ref()
                .is_none_or(thread::JoinHandle::is_finished)
    }
    pub fn wait(self) -> anyhow::Result<()> {
        self.rx
            .recv()
            .map_err(|_| anyhow::anyhow!("loader thread exited without reporting"))?
    }
}

/// Stand-in for a singer a project refers to but that isn't installed.
#[derive(Debug)]
pub struct MissingSinger {
    id: Box<str>,
    name: Box<str>,
}

impl MissingSinger {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Singer for MissingSinger {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn display_name(&self) -> Cow<'_, str> {
        Cow::Owned(format!("[Missing] {}", self.name))
    }
    fn voice_type(&self) -> VoiceType {
        VoiceType::Concatenative
    }
    fn found(&self) -> bool {
        false
    }
    fn loaded(&self) -> bool {
        false
    }
    fn ensure_loaded(&self) -> anyhow::Result<()> {
        anyhow::bail!("singer {:?} isn't installed", self.id)
    }
    fn subbanks(&self) -> Arc<[Subbank]> {
        Arc::new([])
    }
}
