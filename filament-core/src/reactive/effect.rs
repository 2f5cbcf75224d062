//! Effect Tracking
//!
//! An [`EffectTracker`] remembers what a side-effecting hook last ran with
//! and decides whether it has to run again.
//!
//! # How Effect Trackers Work
//!
//! 1. A component render declares an effect together with a dependency list.
//!
//! 2. The tracker compares the list with the one from the previous run,
//!    element-wise and by identity ([`PropValue::is`]), never by deep
//!    equality.
//!
//! 3. If anything differs (or the effect never ran), the previous cleanup
//!    runs, then the effect, and the new cleanup is kept.
//!
//! 4. Disposing the tracker runs the last cleanup exactly once.
//!
//! Mount effects are the degenerate case: an empty dependency list that is
//! only ever seen once.

use smallvec::SmallVec;

use crate::component::PropValue;

/// Teardown callback returned by mount effects and effect hooks.
pub type Cleanup = Box<dyn FnOnce()>;

/// Dependency list of an effect hook.
pub type Deps = SmallVec<[PropValue; 4]>;

/// Element-wise identity comparison of two dependency lists.
pub fn deps_changed(previous: &[PropValue], next: &[PropValue]) -> bool {
    previous.len() != next.len() || previous.iter().zip(next).any(|(a, b)| !a.is(b))
}

/// State of one effect hook slot.
#[derive(Default)]
pub struct EffectTracker {
    /// Dependencies of the last run. `None` until the first run.
    deps: Option<Deps>,
    cleanup: Option<Cleanup>,
    run_count: usize,
}

impl EffectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an effect declared with `deps` has to run.
    pub fn should_run(&self, deps: &[PropValue]) -> bool {
        match &self.deps {
            None => true,
            Some(previous) => deps_changed(previous, deps),
        }
    }

    /// Start a run: record `deps` and hand back the previous cleanup, which
    /// the caller must invoke before the effect itself.
    ///
    /// Split from [`finish`](Self::finish) so that no borrow of the tracker
    /// is held while user code runs.
    pub fn begin(&mut self, deps: Deps) -> Option<Cleanup> {
        self.deps = Some(deps);
        self.run_count += 1;
        self.cleanup.take()
    }

    /// Finish a run by storing the cleanup the effect returned.
    pub fn finish(&mut self, cleanup: Option<Cleanup>) {
        self.cleanup = cleanup;
    }

    /// Run `effect` if `deps` changed. Returns whether it ran.
    pub fn run<F>(&mut self, deps: Deps, effect: F) -> bool
    where
        F: FnOnce() -> Option<Cleanup>,
    {
        if !self.should_run(&deps) {
            return false;
        }
        if let Some(previous) = self.begin(deps) {
            previous();
        }
        let cleanup = effect();
        self.finish(cleanup);
        true
    }

    /// Take the pending cleanup and forget the dependencies, so a revived
    /// component runs the effect again.
    pub fn dispose(&mut self) -> Option<Cleanup> {
        self.deps = None;
        self.cleanup.take()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.run_count
    }
}

impl std::fmt::Debug for EffectTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectTracker")
            .field("deps", &self.deps)
            .field("has_cleanup", &self.cleanup.is_some())
            .field("run_count", &self.run_count)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
