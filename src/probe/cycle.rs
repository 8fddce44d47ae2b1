// src/probe/cycle.rs
//! Stack of named types currently being probed.

#[derive(Debug, Default)]
pub(crate) struct CycleGuard {
    stack: Vec<&'static str>,
}

impl CycleGuard {
    /// `false` when `name` is already in progress further up.
    pub(crate) fn enter(&mut self, name: &'static str) -> bool {
        if self.stack.contains(&name) {
            return false;
        }
        self.stack.push(name);
        true
    }

    pub(crate) fn leave(&mut self, name: &'static str) {
        let popped = self.stack.pop();
        debug_assert_eq!(popped, Some(name), "cycle guard unbalanced");
    }

    pub(crate) fn clear(&mut self) {
        self.stack.clear();
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }
}
