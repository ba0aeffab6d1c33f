//! Function-wrapping combinators.
//!
//! The timer-based ones (debounce, rate limiting) need a runtime and live
//! in `esp32m-sync`.

/// Caches the result computed for the most recent argument.
///
/// The wrapped function runs again only when called with an argument that
/// differs from the previous one.
pub struct MemoizeLast<A, R, F> {
    func: F,
    last: Option<(A, R)>,
}

impl<A, R, F> MemoizeLast<A, R, F>
where
    A: PartialEq,
    R: Clone,
    F: FnMut(&A) -> R,
{
    pub fn new(func: F) -> Self {
        Self { func, last: None }
    }

    pub fn call(&mut self, args: A) -> R {
        match &self.last {
            Some((prev, result)) if *prev == args => result.clone(),
            _ => {
                let result = (self.func)(&args);
                self.last = Some((args, result.clone()));
                result
            }
        }
    }

    /// Forget the cached result.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Runs a fallible function at most once and replays its outcome.
pub struct CallOnce<T, E, F> {
    func: F,
    outcome: Option<Result<T, E>>,
    reset_on_error: bool,
}

impl<T, E, F> CallOnce<T, E, F>
where
    T: Clone,
    E: Clone,
    F: FnMut() -> Result<T, E>,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            outcome: None,
            reset_on_error: false,
        }
    }

    /// When set, an error is returned but not cached, so the next call
    /// retries.
    pub fn reset_on_error(mut self, reset: bool) -> Self {
        self.reset_on_error = reset;
        self
    }

    pub fn call(&mut self) -> Result<T, E> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = (self.func)();
        if outcome.is_ok() || !self.reset_on_error {
            self.outcome = Some(outcome.clone());
        }
        outcome
    }

    pub fn is_called(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn reset(&mut self) {
        self.outcome = None;
    }
}
