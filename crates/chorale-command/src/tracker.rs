use chorale_lib::Project;

use crate::StateCommand;

/// Commands in the order they were executed.
#[derive(Default)]
pub struct StateTracker(Vec<Box<dyn StateCommand>>);

impl StateTracker {
    pub fn new() -> Self {
        Self(Vec::new())
    }
    /// Runs `command` and records it.
    pub fn add(&mut self, project: &mut Project, mut command: impl StateCommand) {
        command.execute(project);
        self.0.push(Box::new(command));
    }
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }
    pub fn take(&mut self) -> StateTracker {
        core::mem::take(self)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Undoes the most recent command. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self, project: &mut Project) -> bool {
        match self.0.pop() {
            Some(mut command) => {
                command.rollback(project);
                true
            }
            None => false,
        }
    }
    /// Undoes everything, newest first.
    pub fn rollback_all(&mut self, project: &mut Project) {
        while self.undo(project) {}
    }
    pub fn finish(self) -> Vec<Box<dyn StateCommand>> {
        self.0
    }
}
