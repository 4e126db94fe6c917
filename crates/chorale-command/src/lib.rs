//! Undoable edits to a chorale project. Separate from `chorale-lib` because loading and saving
//! projects doesn't need them.

use chorale_lib::Project;

pub mod track;
mod tracker;
pub use tracker::StateTracker;

pub trait StateCommand: 'static + Send {
    fn execute(&mut self, project: &mut Project);
    fn rollback(&mut self, project: &mut Project);
}
