use anyhow::Context;

use crate::{
    ExpressionDescriptor, ExpressionTable, Registries, RendererFactory, SingerLookup, Track,
    ValidateOptions, default_expressions,
};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default = "default_expressions")]
    pub expressions: ExpressionTable,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            expressions: default_expressions(),
            tracks: Vec::new(),
        }
    }

    /// Parses a saved project. The tracks come out unresolved; call [`Project::after_load`] next.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse project")
    }

    /// Serializes the saved identifiers as they are, which may be stale. See [`Project::save_json`].
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize project")
    }

    /// Syncs the saved identifiers and serializes.
    pub fn save_json(&mut self) -> anyhow::Result<String> {
        self.before_save();
        self.to_json()
    }

    pub fn after_load(&mut self, registries: Registries<'_>) {
        for (ordinal, track) in self.tracks.iter_mut().enumerate() {
            track.after_load(ordinal, registries);
        }
        tracing::debug!("resolved {} tracks of {:?}", self.tracks.len(), self.name);
    }

    /// Gives every track with a found singer a renderer, e.g. after singers were switched.
    pub fn resolve_renderers(&mut self, renderers: &dyn RendererFactory) {
        for track in &mut self.tracks {
            track.resolve_renderer(renderers);
        }
    }

    pub fn validate(&mut self, options: &ValidateOptions) {
        let Self {
            expressions,
            tracks,
            ..
        } = self;
        for track in tracks {
            track.validate(options, expressions);
        }
    }

    pub fn before_save(&mut self) {
        for track in &mut self.tracks {
            track.before_save();
        }
    }

    pub fn on_catalog_refreshed(&mut self, singers: &dyn SingerLookup) {
        for track in &mut self.tracks {
            track.on_catalog_refreshed(singers);
        }
    }

    pub fn recompute_ordinals(&mut self) {
        for (ordinal, track) in self.tracks.iter_mut().enumerate() {
            track.set_ordinal(ordinal);
        }
    }

    /// Returns the index of the new track.
    pub fn add_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        let index = self.tracks.len() - 1;
        self.tracks[index].set_ordinal(index);
        index
    }

    pub fn insert_track(&mut self, index: usize, track: Track) {
        self.tracks.insert(index, track);
        self.recompute_ordinals();
    }

    pub fn remove_track(&mut self, index: usize) -> Track {
        let track = self.tracks.remove(index);
        self.recompute_ordinals();
        track
    }

    /// Moves the track at `from` so that it ends up at index `to`.
    pub fn move_track(&mut self, from: usize, to: usize) {
        assert!(
            from < self.tracks.len() && to < self.tracks.len(),
            "move_track({from}, {to}) out of bounds for {} tracks",
            self.tracks.len()
        );
        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        self.recompute_ordinals();
    }

    pub fn try_get_expression(&self, track: usize, key: &str) -> Option<&ExpressionDescriptor> {
        self.tracks
            .get(track)?
            .try_get_expression(&self.expressions, key)
    }
}
