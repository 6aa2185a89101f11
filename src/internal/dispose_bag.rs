//! LIFO container for disposal hooks.

/// Disposal hooks accumulated in construction order and executed in
/// reverse, so dependents are released before their dependencies.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, hook: Box<dyn FnOnce() + Send>) {
        self.hooks.push(hook);
    }

    /// Runs every hook, last-registered first, draining the bag.
    pub(crate) fn run_all_reverse(&mut self) {
        while let Some(hook) = self.hooks.pop() {
            hook();
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}
