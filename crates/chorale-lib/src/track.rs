use std::{borrow::Cow, collections::BTreeSet, sync::Arc};

use crate::{
    ExpressionDescriptor, ExpressionTable, MissingSinger, Phonemizer, PhonemizerRegistry,
    Registries, Renderer, RendererFactory, SingerLookup, SingerRef, VOICE_COLOR_KEY,
    singer::same_singer,
};

/// One lane of a project, bound to a singer, a phonemizer and a renderer.
///
/// The `singer`/`phonemizer`/`renderer` strings are what gets saved. They're only brought in sync
/// with the live instances by [`Track::before_save`], so they can be stale in between.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Track {
    #[serde(rename = "singer", default, skip_serializing_if = "Option::is_none")]
    singer_id: Option<String>,
    #[serde(rename = "phonemizer", default, skip_serializing_if = "Option::is_none")]
    phonemizer_key: Option<String>,
    #[serde(rename = "renderer", default, skip_serializing_if = "Option::is_none")]
    renderer_name: Option<String>,

    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub solo: bool,
    /// In decibels.
    #[serde(default)]
    pub volume: f64,
    #[serde(skip)]
    pub pan: f64,

    #[serde(skip)]
    singer: Option<SingerRef>,
    // None only between deserialization and after_load
    #[serde(skip)]
    phonemizer: Option<Box<dyn Phonemizer>>,
    #[serde(skip)]
    renderer: Option<Box<dyn Renderer>>,
    #[serde(skip)]
    voice_color: Option<ExpressionDescriptor>,
    #[serde(skip)]
    ordinal: usize,
}

/// What [`Track::rebind_singer`] did.
#[derive(Debug)]
pub enum SingerRebind {
    Unchanged,
    /// `renderer` is the binding that belonged to `previous`.
    Replaced {
        previous: Option<SingerRef>,
        renderer: RendererBinding,
    },
}

impl SingerRebind {
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }
}

/// A track's renderer choice: the saved name and the live instance, if any.
#[derive(Debug, Default)]
pub struct RendererBinding {
    name: Option<String>,
    renderer: Option<Box<dyn Renderer>>,
}

impl RendererBinding {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    pub fn renderer(&self) -> Option<&dyn Renderer> {
        self.renderer.as_deref()
    }
}

impl Track {
    /// A track created in-session. Starts out bound to the default phonemizer and no singer.
    pub fn new(phonemizers: &dyn PhonemizerRegistry) -> Self {
        Self {
            phonemizer: Some(phonemizers.create_default()),
            ..Self::unresolved(None, None, None)
        }
    }

    /// A track as it comes out of a saved project: identifiers only, nothing resolved.
    pub fn unresolved(singer: Option<&str>, phonemizer: Option<&str>, renderer: Option<&str>) -> Self {
        Self {
            singer_id: singer.map(Into::into),
            phonemizer_key: phonemizer.map(Into::into),
            renderer_name: renderer.map(Into::into),
            mute: false,
            solo: false,
            volume: 0.0,
            pan: 0.0,
            singer: None,
            phonemizer: None,
            renderer: None,
            voice_color: None,
            ordinal: 0,
        }
    }

    pub fn singer_id(&self) -> Option<&str> {
        self.singer_id.as_deref()
    }
    pub fn phonemizer_key(&self) -> Option<&str> {
        self.phonemizer_key.as_deref()
    }
    pub fn renderer_name(&self) -> Option<&str> {
        self.renderer_name.as_deref()
    }

    pub fn singer(&self) -> Option<&SingerRef> {
        self.singer.as_ref()
    }
    pub fn phonemizer(&self) -> Option<&dyn Phonemizer> {
        self.phonemizer.as_deref()
    }
    pub fn renderer(&self) -> Option<&dyn Renderer> {
        self.renderer.as_deref()
    }
    pub fn voice_color(&self) -> Option<&ExpressionDescriptor> {
        self.voice_color.as_ref()
    }

    /// Whether the live instances have been set up, either by [`Track::after_load`] or by being created in-session.
    pub fn is_resolved(&self) -> bool {
        self.phonemizer.is_some()
    }

    /// Zero-based position in the owning project.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
    pub fn display_ordinal(&self) -> usize {
        self.ordinal + 1
    }
    pub(crate) fn set_ordinal(&mut self, ordinal: usize) {
        self.ordinal = ordinal;
    }

    pub fn singer_name(&self) -> Cow<'_, str> {
        match &self.singer {
            Some(singer) => singer.display_name(),
            None => Cow::Borrowed("[No Singer]"),
        }
    }
    pub fn phonemizer_tag(&self) -> Option<&str> {
        self.phonemizer.as_ref().map(|phonemizer| phonemizer.tag())
    }

    /// Switches the track to another singer (or to none).
    ///
    /// If the singer actually changed, the phonemizer is told about it and the renderer binding is
    /// handed back in [`SingerRebind::Replaced`]. Resolving again then picks the new singer's
    /// default. The voice color override is always cleared.
    pub fn rebind_singer(&mut self, singer: Option<SingerRef>) -> SingerRebind {
        self.voice_color = None;
        if same_singer(self.singer.as_ref(), singer.as_ref()) {
            return SingerRebind::Unchanged;
        }

        let previous = std::mem::replace(&mut self.singer, singer);
        if let Some(phonemizer) = &mut self.phonemizer {
            phonemizer.set_singer(self.singer.as_ref());
        }
        // the saved name belonged to the old singer too
        let renderer = self.take_renderer();
        if renderer.renderer.is_some() {
            tracing::debug!("track {}: renderer set aside after singer change", self.ordinal);
        }
        SingerRebind::Replaced { previous, renderer }
    }

    pub fn take_renderer(&mut self) -> RendererBinding {
        RendererBinding {
            name: self.renderer_name.take(),
            renderer: self.renderer.take(),
        }
    }

    /// Puts back a binding from [`Track::take_renderer`] or [`SingerRebind::Replaced`]. The live
    /// renderer is only kept while the singer is found; the name is always restored.
    pub fn restore_renderer(&mut self, binding: RendererBinding) {
        self.renderer_name = binding.name;
        self.renderer = binding
            .renderer
            .filter(|_| self.singer.as_ref().is_some_and(|singer| singer.found()));
    }

    /// Replaces the phonemizer with one the user picked, keeping it bound to the current singer.
    pub fn set_phonemizer(&mut self, mut phonemizer: Box<dyn Phonemizer>) {
        phonemizer.set_singer(self.singer.as_ref());
        self.phonemizer = Some(phonemizer);
    }

    /// Switches to the renderer named `name`. Only possible while the singer is found.
    pub fn select_renderer(
        &mut self,
        renderers: &dyn RendererFactory,
        name: &str,
    ) -> anyhow::Result<()> {
        if !self.singer.as_ref().is_some_and(|singer| singer.found()) {
            anyhow::bail!("track {} has no usable singer to render with", self.ordinal);
        }
        self.renderer = Some(renderers.create(name)?);
        self.renderer_name = Some(name.into());
        Ok(())
    }

    /// Call whenever the singer catalogue was rescanned. A singer that disappeared is swapped for a placeholder.
    pub fn on_catalog_refreshed(&mut self, singers: &dyn SingerLookup) {
        let vanished = self
            .singer
            .as_ref()
            .filter(|singer| singer.loaded() && singers.by_id(singer.id()).is_none())
            .map(|singer| Arc::new(MissingSinger::new(singer.id(), singer.name())) as SingerRef);
        if let Some(placeholder) = vanished {
            tracing::info!(
                "track {}: singer {:?} was uninstalled",
                self.ordinal,
                placeholder.id()
            );
            self.rebind_singer(Some(placeholder));
        }
        self.voice_color = None;
    }

    /// Turns the saved identifiers into live instances. Nothing here fails; anything that can't be
    /// resolved falls back to a default or a placeholder.
    ///
    /// Running this again on a resolved track leaves it alone unless the registries changed.
    pub fn after_load(&mut self, ordinal: usize, registries: Registries<'_>) {
        self.ordinal = ordinal;
        self.resolve_phonemizer(registries.phonemizers);
        self.resolve_singer(registries.singers);
        if let Some(phonemizer) = &mut self.phonemizer {
            phonemizer.set_singer(self.singer.as_ref());
        }
        self.resolve_renderer(registries.renderers);
    }

    fn resolve_phonemizer(&mut self, phonemizers: &dyn PhonemizerRegistry) {
        if let Some(key) = self.phonemizer_key.take().filter(|key| !key.is_empty()) {
            let already_bound = self
                .phonemizer
                .as_ref()
                .is_some_and(|phonemizer| phonemizer.type_key() == key.as_str());
            if !already_bound {
                match phonemizers.by_type_key(&key) {
                    Some(factory) => match factory.create() {
                        Ok(phonemizer) => self.phonemizer = Some(phonemizer),
                        Err(err) => {
                            tracing::error!("failed to load phonemizer {key}: {err:#}");
                        }
                    },
                    None => {
                        tracing::warn!(
                            "track {}: unknown phonemizer {key:?}, using the default",
                            self.ordinal
                        );
                        self.phonemizer = None;
                    }
                }
            }
        }
        if self.phonemizer.is_none() {
            self.phonemizer = Some(phonemizers.create_default());
        }
    }

    fn resolve_singer(&mut self, singers: &dyn SingerLookup) {
        if self.singer.is_some() {
            return;
        }
        let Some(id) = self.singer_id.as_deref().filter(|id| !id.is_empty()) else {
            return;
        };
        self.singer = Some(singers.by_id(id).unwrap_or_else(|| {
            tracing::warn!("track {}: singer {id:?} not found", self.ordinal);
            Arc::new(MissingSinger::new(id, id))
        }));
    }

    /// Builds a renderer for the current singer if there isn't one already, falling back to the
    /// default for the singer's voice type. Tracks without a found singer get no renderer at all.
    pub fn resolve_renderer(&mut self, renderers: &dyn RendererFactory) {
        let Some(voice_type) = self
            .singer
            .as_ref()
            .filter(|singer| singer.found())
            .map(|singer| singer.voice_type())
        else {
            self.renderer = None;
            return;
        };
        if self.renderer.is_some() {
            return;
        }

        if let Some(name) = self.renderer_name.as_deref().filter(|name| !name.is_empty()) {
            match renderers.create(name) {
                Ok(renderer) => {
                    self.renderer = Some(renderer);
                    return;
                }
                Err(err) => {
                    tracing::warn!("track {}: {err:#}, using the default", self.ordinal);
                }
            }
        }

        let name = renderers.default_name_for(voice_type).to_owned();
        if name.is_empty() {
            tracing::error!(
                "track {}: no default renderer for {voice_type:?}",
                self.ordinal
            );
            self.renderer_name = None;
            return;
        }
        match renderers.create(&name) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(err) => {
                tracing::error!(
                    "track {}: default renderer for {voice_type:?} is unusable: {err:#}",
                    self.ordinal
                );
            }
        }
        self.renderer_name = Some(name);
    }

    /// Loads the singer if needed and derives the voice color options from its sub-voicebanks.
    ///
    /// The options are only derived while there's no override yet. Once set, they stay as they are
    /// until the singer is rebound or the catalogue is refreshed, even if the sub-voicebanks change.
    pub fn validate(&mut self, options: &ValidateOptions, expressions: &ExpressionTable) {
        if let Some(singer) = self.singer.as_ref().filter(|singer| singer.found()) {
            if options.load_singers && !singer.loaded() {
                if let Err(err) = singer.ensure_loaded() {
                    tracing::warn!("track {}: {err:#}", self.ordinal);
                }
            }
        }

        let Some(descriptor) = expressions.get(VOICE_COLOR_KEY) else {
            return;
        };
        if self.voice_color.is_some() {
            return;
        }
        let Some(singer) = self
            .singer
            .as_ref()
            .filter(|singer| singer.found() && singer.loaded())
        else {
            return;
        };

        let subbanks = singer.subbanks();
        let colors: BTreeSet<&str> = subbanks.iter().map(|subbank| &*subbank.color).collect();
        self.voice_color = Some(descriptor.with_options(colors.into_iter().map(Into::into).collect()));
    }

    /// Looks up `key` in the project's table, substituting this track's voice color override.
    /// `None` only if the project doesn't have `key` at all.
    pub fn try_get_expression<'a>(
        &'a self,
        expressions: &'a ExpressionTable,
        key: &str,
    ) -> Option<&'a ExpressionDescriptor> {
        let descriptor = expressions.get(key)?;
        if key == VOICE_COLOR_KEY {
            if let Some(voice_color) = &self.voice_color {
                return Some(voice_color);
            }
        }
        Some(descriptor)
    }

    /// Copies the identity of the live instances into the saved identifiers.
    ///
    /// Unresolved tracks keep whatever identifiers they were loaded with.
    pub fn before_save(&mut self) {
        if !self.is_resolved() {
            return;
        }
        self.singer_id = self.singer.as_ref().map(|singer| singer.id().to_owned());
        self.phonemizer_key = self
            .phonemizer
            .as_ref()
            .map(|phonemizer| phonemizer.type_key().to_string());
        self.renderer_name = self.renderer.as_ref().map(|renderer| renderer.name().to_owned());
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ValidateOptions {
    /// Load found-but-unloaded singers. Turning this off makes validation cheap, but voice colors
    /// won't be derived for singers that aren't loaded yet.
    pub load_singers: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self { load_singers: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DefaultPhonemizer, RendererTable, Subbank, VoiceType, default_expressions,
        test_util::{BROKEN_PHONEMIZER, Fixture, KanaPhonemizer},
    };

    fn addr<T: ?Sized>(r: &T) -> *const () {
        r as *const T as *const ()
    }

    fn resolved(fixture: &Fixture, singer: Option<&str>, phonemizer: Option<&str>, renderer: Option<&str>) -> Track {
        let mut track = Track::unresolved(singer, phonemizer, renderer);
        track.after_load(0, fixture.registries());
        track
    }

    fn bound_singer_of_phonemizer(track: &Track) -> Option<&SingerRef> {
        track.phonemizer().unwrap().singer()
    }

    fn assert_renderer_invariant(track: &Track) {
        if track.renderer().is_some() {
            assert!(track.singer().is_some_and(|singer| singer.found()));
        }
    }

    fn voice_color_table(options: &[&str]) -> ExpressionTable {
        let mut table = default_expressions();
        table.insert(
            VOICE_COLOR_KEY.into(),
            ExpressionDescriptor::options(
                "voice color",
                VOICE_COLOR_KEY,
                options.iter().map(|&o| o.into()).collect(),
            ),
        );
        table
    }

    #[test]
    fn test_full_resolution() {
        let fixture = Fixture::new();
        let track = resolved(&fixture, Some("alice"), Some(KanaPhonemizer::KEY), Some("NEURAL"));

        let singer = track.singer().unwrap();
        assert!(Arc::ptr_eq(singer, &fixture.singer("alice")));
        assert_eq!(track.phonemizer_tag(), Some("KANA"));
        assert!(Arc::ptr_eq(bound_singer_of_phonemizer(&track).unwrap(), singer));
        assert_eq!(track.renderer().unwrap().name(), "NEURAL");
        // the key is re-derived at save time
        assert_eq!(track.phonemizer_key(), None);
        assert!(track.voice_color().is_none());
    }

    #[test]
    fn test_missing_singer() {
        let fixture = Fixture::new();
        let track = resolved(&fixture, Some("foo"), None, Some("CLASSIC"));

        let singer = track.singer().unwrap();
        assert!(!singer.found());
        assert_eq!(singer.id(), "foo");
        assert!(track.singer_name().contains("foo"));
        assert!(track.renderer().is_none());
        assert!(!bound_singer_of_phonemizer(&track).unwrap().found());
    }

    #[test]
    fn test_unknown_phonemizer() {
        let fixture = Fixture::new();
        for key in ["Unknown.Type", "nobody:home", ""] {
            let track = resolved(&fixture, None, Some(key), None);
            assert_eq!(
                track.phonemizer().unwrap().type_key().as_str(),
                DefaultPhonemizer::KEY
            );
        }
    }

    #[test]
    fn test_broken_phonemizer() {
        let fixture = Fixture::new();
        let track = resolved(&fixture, Some("alice"), Some(BROKEN_PHONEMIZER), None);
        assert_eq!(track.phonemizer_tag(), Some(DefaultPhonemizer::TAG));
        assert_eq!(track.phonemizer_key(), None);
    }

    #[test]
    fn test_phonemizer_always_present() {
        let fixture = Fixture::new();
        for singer in [None, Some("alice"), Some("foo")] {
            for phonemizer in [None, Some(KanaPhonemizer::KEY), Some(BROKEN_PHONEMIZER), Some("x")] {
                for renderer in [None, Some("CLASSIC"), Some("TURBO")] {
                    let track = resolved(&fixture, singer, phonemizer, renderer);
                    assert!(track.phonemizer().is_some());
                    assert_renderer_invariant(&track);
                }
            }
        }
    }

    #[test]
    fn test_renderer_fallback() {
        let fixture = Fixture::new();

        let track = resolved(&fixture, Some("bob"), None, Some("TURBO"));
        assert_eq!(track.renderer().unwrap().name(), "NEURAL");
        assert_eq!(track.renderer_name(), Some("NEURAL"));

        let track = resolved(&fixture, Some("alice"), None, None);
        assert_eq!(track.renderer().unwrap().name(), "CLASSIC");
        assert_eq!(track.renderer_name(), Some("CLASSIC"));

        // a working saved name is kept even if it isn't the default
        let track = resolved(&fixture, Some("alice"), None, Some("PARAMETRIC"));
        assert_eq!(track.renderer().unwrap().name(), "PARAMETRIC");
    }

    #[test]
    fn test_no_singer_no_renderer() {
        let fixture = Fixture::new();
        let track = resolved(&fixture, None, None, Some("CLASSIC"));
        assert!(track.singer().is_none());
        assert!(track.renderer().is_none());
        assert_eq!(track.singer_name(), "[No Singer]");
        assert!(bound_singer_of_phonemizer(&track).is_none());
    }

    #[test]
    fn test_after_load_is_idempotent() {
        let fixture = Fixture::new();
        let mut track = Track::unresolved(Some("alice"), Some(KanaPhonemizer::KEY), Some("TURBO"));
        track.after_load(3, fixture.registries());
        track.before_save();
        let first = serde_json::to_string(&track).unwrap();
        let singer = track.singer().cloned().unwrap();
        let phonemizer_ptr = addr(track.phonemizer().unwrap());
        let renderer_ptr = addr(track.renderer().unwrap());

        track.after_load(3, fixture.registries());
        track.before_save();
        assert_eq!(serde_json::to_string(&track).unwrap(), first);
        assert!(Arc::ptr_eq(track.singer().unwrap(), &singer));
        assert_eq!(addr(track.phonemizer().unwrap()), phonemizer_ptr);
        assert_eq!(addr(track.renderer().unwrap()), renderer_ptr);
    }

    #[test]
    fn test_rebind_singer() {
        let fixture = Fixture::new();
        let expressions = voice_color_table(&["a", "b"]);
        let mut track = resolved(&fixture, Some("alice"), None, None);
        track.validate(&ValidateOptions::default(), &expressions);
        assert!(track.voice_color().is_some());

        let bob = fixture.singer("bob");
        let rebind = track.rebind_singer(Some(bob.clone()));
        match rebind {
            SingerRebind::Replaced { previous, .. } => {
                assert!(Arc::ptr_eq(&previous.unwrap(), &fixture.singer("alice")))
            }
            SingerRebind::Unchanged => panic!("singer should've changed"),
        }
        assert!(Arc::ptr_eq(track.singer().unwrap(), &bob));
        assert!(Arc::ptr_eq(bound_singer_of_phonemizer(&track).unwrap(), &bob));
        assert!(track.voice_color().is_none());
        assert!(track.renderer().is_none());

        // the renderer comes back on the next resolution
        track.after_load(0, fixture.registries());
        assert!(track.renderer().is_some());
    }

    #[test]
    fn test_rebind_to_none() {
        let fixture = Fixture::new();
        let expressions = voice_color_table(&["a"]);
        let mut track = resolved(&fixture, Some("alice"), None, None);
        track.validate(&ValidateOptions::default(), &expressions);

        assert!(track.rebind_singer(None).is_replaced());
        assert!(track.singer().is_none());
        assert!(bound_singer_of_phonemizer(&track).is_none());
        assert!(track.voice_color().is_none());
        assert!(track.renderer().is_none());
    }

    #[test]
    fn test_rebind_same_singer_still_clears_voice_color() {
        let fixture = Fixture::new();
        let expressions = voice_color_table(&["a"]);
        let mut track = resolved(&fixture, Some("alice"), None, None);
        track.validate(&ValidateOptions::default(), &expressions);
        assert!(track.voice_color().is_some());

        let rebind = track.rebind_singer(Some(fixture.singer("alice")));
        assert!(!rebind.is_replaced());
        assert!(track.voice_color().is_none());
        // nothing else is disturbed
        assert!(track.renderer().is_some());
    }

    #[test]
    fn test_voice_color_options() {
        let fixture = Fixture::new();
        let expressions = voice_color_table(&["a", "b"]);
        let mut track = resolved(&fixture, Some("alice"), None, None);
        assert!(!track.singer().unwrap().loaded());

        track.validate(&ValidateOptions::default(), &expressions);
        assert!(track.singer().unwrap().loaded());
        let voice_color = track.voice_color().unwrap();
        assert_eq!(voice_color.options, ["blue", "red"]);
        assert_eq!(voice_color.max, 1.0);
        assert_eq!(voice_color.name, "voice color");
    }

    #[test]
    fn test_voice_color_is_not_refreshed() {
        let fixture = Fixture::new();
        let expressions = voice_color_table(&["a", "b"]);
        let mut track = resolved(&fixture, Some("alice"), None, None);
        track.validate(&ValidateOptions::default(), &expressions);
        let before = track.voice_color().cloned().unwrap();

        // the singer's sub-voicebanks change behind the track's back
        *fixture.alice_colors.lock().unwrap() = vec![Subbank::with_color("green")];
        fixture.alice.reload().unwrap();
        let colors: Vec<String> = track.singer().unwrap().subbanks().iter().map(|s| s.color.clone()).collect();
        assert_eq!(colors, ["green"]);

        track.validate(&ValidateOptions::default(), &expressions);
        assert_eq!(track.voice_color(), Some(&before));

        // until something resets the override
        track.rebind_singer(Some(fixture.singer("alice")));
        track.validate(&ValidateOptions::default(), &expressions);
        assert_eq!(track.voice_color().unwrap().options, ["green"]);
    }

    #[test]
    fn test_no_voice_color_without_descriptor() {
        let fixture = Fixture::new();
        let mut expressions = default_expressions();
        expressions.remove(VOICE_COLOR_KEY);
        let mut track = resolved(&fixture, Some("alice"), None, None);
        track.validate(&ValidateOptions::default(), &expressions);
        assert!(track.singer().unwrap().loaded());
        assert!(track.voice_color().is_none());
        assert!(track.try_get_expression(&expressions, VOICE_COLOR_KEY).is_none());
    }

    #[test]
    fn test_validate_without_loading() {
        let fixture = Fixture::new();
        let expressions = voice_color_table(&[]);
        let mut track = resolved(&fixture, Some("alice"), None, None);
        track.validate(&ValidateOptions { load_singers: false }, &expressions);
        assert!(!track.singer().unwrap().loaded());
        assert!(track.voice_color().is_none());
    }

    #[test]
    fn test_missing_singer_has_no_voice_color() {
        let fixture = Fixture::new();
        let expressions = voice_color_table(&["a"]);
        let mut track = resolved(&fixture, Some("foo"), None, None);
        track.validate(&ValidateOptions::default(), &expressions);
        assert!(track.voice_color().is_none());
    }

    #[test]
    fn test_try_get_expression() {
        let fixture = Fixture::new();
        let expressions = voice_color_table(&["a", "b"]);
        let mut track = resolved(&fixture, Some("alice"), None, None);

        let default = track.try_get_expression(&expressions, VOICE_COLOR_KEY).unwrap();
        assert_eq!(default.options, ["a", "b"]);

        track.validate(&ValidateOptions::default(), &expressions);
        let overridden = track.try_get_expression(&expressions, VOICE_COLOR_KEY).unwrap();
        assert_eq!(overridden.options, ["blue", "red"]);

        assert_eq!(track.try_get_expression(&expressions, "vel").unwrap().abbr, "vel");
        assert!(track.try_get_expression(&expressions, "nope").is_none());
    }

    #[test]
    fn test_catalog_refresh() {
        let mut fixture = Fixture::new();
        let expressions = voice_color_table(&["a"]);
        let mut track = resolved(&fixture, Some("alice"), None, None);
        track.validate(&ValidateOptions::default(), &expressions);

        // still installed: only the voice color goes away
        track.on_catalog_refreshed(&fixture.singers);
        assert!(track.singer().unwrap().found());
        assert!(track.voice_color().is_none());
        assert!(track.renderer().is_some());

        fixture.singers.remove("alice");
        track.on_catalog_refreshed(&fixture.singers);
        let singer = track.singer().unwrap();
        assert!(!singer.found());
        assert_eq!(singer.id(), "alice");
        assert_eq!(singer.name(), "Alice");
        assert!(!bound_singer_of_phonemizer(&track).unwrap().found());
        assert!(track.renderer().is_none());

        track.before_save();
        assert_eq!(track.singer_id(), Some("alice"));
    }

    #[test]
    fn test_catalog_refresh_ignores_unloaded() {
        let mut fixture = Fixture::new();
        let mut track = resolved(&fixture, Some("alice"), None, None);
        fixture.singers.remove("alice");
        track.on_catalog_refreshed(&fixture.singers);
        assert!(track.singer().unwrap().found());
    }

    #[test]
    fn test_before_save() {
        let fixture = Fixture::new();
        let mut track = resolved(&fixture, Some("bob"), Some(KanaPhonemizer::KEY), None);
        track.before_save();
        assert_eq!(track.singer_id(), Some("bob"));
        assert_eq!(track.phonemizer_key(), Some(KanaPhonemizer::KEY));
        assert_eq!(track.renderer_name(), Some("NEURAL"));

        track.rebind_singer(None);
        track.before_save();
        assert_eq!(track.singer_id(), None);
        assert_eq!(track.renderer_name(), None);
        assert_eq!(track.phonemizer_key(), Some(KanaPhonemizer::KEY));
    }

    #[test]
    fn test_unresolved_keeps_identifiers() {
        let mut track = Track::unresolved(Some("alice"), Some("Unknown.Type"), Some("CLASSIC"));
        track.before_save();
        assert_eq!(track.singer_id(), Some("alice"));
        assert_eq!(track.phonemizer_key(), Some("Unknown.Type"));
        assert_eq!(track.renderer_name(), Some("CLASSIC"));
    }

    #[test]
    fn test_in_session_track() {
        let fixture = Fixture::new();
        let mut track = Track::new(&fixture.phonemizers);
        assert!(track.is_resolved());
        assert_eq!(track.phonemizer_tag(), Some(DefaultPhonemizer::TAG));

        track.rebind_singer(Some(fixture.singer("bob")));
        track.set_phonemizer(fixture.phonemizers.by_type_key(KanaPhonemizer::KEY).unwrap().create().unwrap());
        assert!(Arc::ptr_eq(bound_singer_of_phonemizer(&track).unwrap(), &fixture.singer("bob")));

        track.select_renderer(&fixture.renderers, "CLASSIC").unwrap();
        assert_eq!(track.renderer().unwrap().name(), "CLASSIC");
        assert!(track.select_renderer(&fixture.renderers, "TURBO").is_err());
        assert_eq!(track.renderer().unwrap().name(), "CLASSIC");

        track.rebind_singer(Some(Arc::new(MissingSinger::new("x", "x"))));
        assert!(track.select_renderer(&fixture.renderers, "CLASSIC").is_err());
        assert_renderer_invariant(&track);
    }

    #[test]
    fn test_serialized_fields() {
        let fixture = Fixture::new();
        let mut track = resolved(&fixture, Some("alice"), None, None);
        track.mute = true;
        track.pan = 0.5;
        track.before_save();
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "singer": "alice",
                "phonemizer": DefaultPhonemizer::KEY,
                "renderer": "CLASSIC",
                "mute": true,
                "solo": false,
                "volume": 0.0,
            })
        );

        let back: Track = serde_json::from_value(json).unwrap();
        assert!(!back.is_resolved());
        assert_eq!(back.singer_id(), Some("alice"));
        assert_eq!(back.pan, 0.0);
    }

    #[test]
    fn test_rebind_hands_back_renderer() {
        let fixture = Fixture::new();
        let mut track = resolved(&fixture, Some("alice"), None, Some("PARAMETRIC"));

        let SingerRebind::Replaced { renderer, .. } = track.rebind_singer(Some(fixture.singer("bob")))
        else {
            panic!("singer should've changed")
        };
        assert_eq!(renderer.name(), Some("PARAMETRIC"));
        assert_eq!(renderer.renderer().unwrap().name(), "PARAMETRIC");
        assert_eq!(track.renderer_name(), None);

        // switching back restores the exact choice, not alice's default
        track.rebind_singer(Some(fixture.singer("alice")));
        track.restore_renderer(renderer);
        track.resolve_renderer(&fixture.renderers);
        assert_eq!(track.renderer().unwrap().name(), "PARAMETRIC");
        track.before_save();
        assert_eq!(track.renderer_name(), Some("PARAMETRIC"));
    }

    #[test]
    fn test_restore_renderer_without_found_singer() {
        let fixture = Fixture::new();
        let mut track = resolved(&fixture, Some("alice"), None, Some("PARAMETRIC"));
        let binding = track.take_renderer();
        assert!(track.renderer().is_none());

        track.rebind_singer(Some(Arc::new(MissingSinger::new("x", "x"))));
        track.restore_renderer(binding);
        assert!(track.renderer().is_none());
        assert_eq!(track.renderer_name(), Some("PARAMETRIC"));
        assert_renderer_invariant(&track);
    }

    #[test]
    fn test_unusable_default_renderer() {
        let fixture = Fixture::new();
        let mut renderers = RendererTable::empty();
        renderers.register("FLAKY", || Err(anyhow::anyhow!("no gpu")));
        renderers.set_default(VoiceType::Concatenative, "FLAKY");

        let mut track = Track::unresolved(Some("alice"), None, Some("TURBO"));
        track.after_load(
            0,
            Registries::new(&fixture.singers, &fixture.phonemizers, &renderers),
        );
        assert!(track.singer().unwrap().found());
        assert!(track.renderer().is_none());
        // the default's name is kept so a later resolution can retry it
        assert_eq!(track.renderer_name(), Some("FLAKY"));

        // no default at all for the voice type
        let mut track = Track::unresolved(Some("bob"), None, None);
        track.after_load(
            0,
            Registries::new(&fixture.singers, &fixture.phonemizers, &renderers),
        );
        assert!(track.renderer().is_none());
        assert_eq!(track.renderer_name(), None);
    }
}
