use chorale_lib::{Project, RendererBinding, SingerRebind, SingerRef, Track};

use crate::StateCommand;

pub struct TrackAddOrRemove {
    index: usize,
    data: Option<Track>,
    is_removal: bool,
}

impl TrackAddOrRemove {
    pub fn addition(index: usize, data: Track) -> Self {
        Self {
            index,
            data: Some(data),
            is_removal: false,
        }
    }
    pub fn removal(index: usize) -> Self {
        Self {
            index,
            data: None,
            is_removal: true,
        }
    }
    pub const fn index(&self) -> usize {
        self.index
    }
    pub const fn is_removal(&self) -> bool {
        self.is_removal
    }

    fn execute_add(&mut self, project: &mut Project) {
        project.insert_track(
            self.index,
            self.data
                .take()
                .expect("execute() called on empty TrackAddOrRemove"),
        );
    }
    fn execute_remove(&mut self, project: &mut Project) {
        assert!(
            self.index < project.tracks.len(),
            "tried to remove nonexistent track {}",
            self.index
        );
        self.data = Some(project.remove_track(self.index));
    }
}

impl StateCommand for TrackAddOrRemove {
    fn execute(&mut self, project: &mut Project) {
        if self.is_removal {
            self.execute_remove(project);
        } else {
            self.execute_add(project);
        }
    }
    fn rollback(&mut self, project: &mut Project) {
        if self.is_removal {
            self.execute_add(project);
        } else {
            self.execute_remove(project);
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TrackMove {
    from: usize,
    to: usize,
}

impl TrackMove {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

impl StateCommand for TrackMove {
    fn execute(&mut self, project: &mut Project) {
        project.move_track(self.from, self.to);
    }
    fn rollback(&mut self, project: &mut Project) {
        project.move_track(self.to, self.from);
    }
}

/// Switches a track's singer. The new singer starts without a renderer; call
/// [`Project::resolve_renderers`] afterwards to get one. Rolling back restores the previous
/// singer together with its renderer choice.
pub struct TrackSetSinger {
    index: usize,
    // both swapped with the track's on every execute/rollback
    singer: Option<SingerRef>,
    renderer: Option<RendererBinding>,
}

impl TrackSetSinger {
    pub fn new(index: usize, singer: Option<SingerRef>) -> Self {
        Self {
            index,
            singer,
            renderer: None,
        }
    }

    fn swap(&mut self, project: &mut Project) {
        let track = &mut project.tracks[self.index];
        match track.rebind_singer(self.singer.take()) {
            SingerRebind::Replaced { previous, renderer } => {
                self.singer = previous;
                if let Some(binding) = self.renderer.replace(renderer) {
                    track.restore_renderer(binding);
                }
            }
            SingerRebind::Unchanged => self.singer = track.singer().cloned(),
        }
    }
}

impl StateCommand for TrackSetSinger {
    fn execute(&mut self, project: &mut Project) {
        self.swap(project);
        tracing::debug!(
            "track {}: singer set to {}",
            self.index,
            project.tracks[self.index].singer_name()
        );
    }
    fn rollback(&mut self, project: &mut Project) {
        self.swap(project);
    }
}

/// Mute, solo, volume and pan of one track.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mixer {
    pub mute: bool,
    pub solo: bool,
    pub volume: f64,
    pub pan: f64,
}

impl Mixer {
    pub fn of(track: &Track) -> Self {
        Self {
            mute: track.mute,
            solo: track.solo,
            volume: track.volume,
            pan: track.pan,
        }
    }

    fn swap_with(&mut self, track: &mut Track) {
        core::mem::swap(&mut self.mute, &mut track.mute);
        core::mem::swap(&mut self.solo, &mut track.solo);
        core::mem::swap(&mut self.volume, &mut track.volume);
        core::mem::swap(&mut self.pan, &mut track.pan);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TrackSetMixer {
    index: usize,
    mixer: Mixer,
}

impl TrackSetMixer {
    pub fn new(index: usize, mixer: Mixer) -> Self {
        Self { index, mixer }
    }
}

impl StateCommand for TrackSetMixer {
    fn execute(&mut self, project: &mut Project) {
        self.mixer.swap_with(&mut project.tracks[self.index]);
    }
    fn rollback(&mut self, project: &mut Project) {
        self.mixer.swap_with(&mut project.tracks[self.index]);
    }
}
