//! ⏳ Debounce: "wait, are you done typing? ...how about now? ...now?"
//!
//! 🎬 *[a user types "r", "ri", "ric", "rick" in 300ms.]*
//! *[without debounce: four API calls. with debounce: one. the API sends a thank-you card.]*
//!
//! 📦 [`Debounced`] wraps any `FnMut(A) -> R` (a plain function, a state setter, a
//! channel send) and delays it until calls go quiet for `delay`. Leading edge,
//! trailing edge and `max_wait` behave like the classic lodash debounce, which is
//! the mental model every frontend dev already has. Timers are tokio tasks; time
//! is [`tokio::time::Instant`], so paused-clock tests are deterministic. 🦆
//!
//! 🧠 Knowledge graph:
//! - state: last call time, last invoke time, pending args, last result, timer
//! - every call overwrites the pending args, so the trailing call always gets the
//!   latest ones
//! - timers hold a `Weak` to the state; dropping the last handle aborts the timer
//! - the wrapped function runs while the state lock is held: it must not call back
//!   into the same `Debounced`
//!
//! ⚠️ Calls and timers need a tokio runtime. Outside one, `tokio::spawn` panics.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// 🎛️ Edge and max-wait knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOptions {
    /// Invoke at the start of a burst.
    pub leading: bool,
    /// Invoke at the end of a burst, with the latest args.
    pub trailing: bool,
    /// Longest a burst may go without an invocation. Raised to at least `delay`.
    pub max_wait: Option<Duration>,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            leading: false,
            trailing: true,
            max_wait: None,
        }
    }
}

type Shared<A, R> = Arc<Mutex<State<A, R>>>;
type WeakShared<A, R> = Weak<Mutex<State<A, R>>>;

/// ⏳ A debounced function. Cheap to clone; clones share one timer and one state.
pub struct Debounced<A, R> {
    inner: Shared<A, R>,
}

impl<A, R> Clone for Debounced<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, R> std::fmt::Debug for Debounced<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner);
        f.debug_struct("Debounced")
            .field("delay", &state.delay)
            .field("options", &state.options)
            .field("pending", &state.timer.is_some())
            .finish()
    }
}

struct State<A, R> {
    func: Box<dyn FnMut(A) -> R + Send>,
    delay: Duration,
    options: DebounceOptions,
    last_args: Option<A>,
    last_call_time: Option<Instant>,
    last_invoke_time: Option<Instant>,
    result: Option<R>,
    timer: Option<JoinHandle<()>>,
    // -- 🎫 bumped on every (re)schedule and clear, so a stale timer task knows to stand down
    timer_epoch: u64,
}

impl<A, R> Drop for State<A, R> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

fn lock<A, R>(inner: &Mutex<State<A, R>>) -> MutexGuard<'_, State<A, R>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A, R> Debounced<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    /// 🚀 Trailing-edge debounce with default options.
    pub fn new(delay: Duration, func: impl FnMut(A) -> R + Send + 'static) -> Self {
        Self::with_options(delay, DebounceOptions::default(), func)
    }

    pub fn with_options(
        delay: Duration,
        options: DebounceOptions,
        func: impl FnMut(A) -> R + Send + 'static,
    ) -> Self {
        let options = DebounceOptions {
            max_wait: options.max_wait.map(|max_wait| max_wait.max(delay)),
            ..options
        };
        Self {
            inner: Arc::new(Mutex::new(State {
                func: Box::new(func),
                delay,
                options,
                last_args: None,
                last_call_time: None,
                last_invoke_time: None,
                result: None,
                timer: None,
                timer_epoch: 0,
            })),
        }
    }

    /// 📞 Call the debounced function. Returns the most recent result (`None` until
    /// the first invocation), which is fresh only if this call invoked.
    pub fn call(&self, args: A) -> Option<R> {
        let weak = Arc::downgrade(&self.inner);
        let mut state = lock(&self.inner);
        let now = Instant::now();
        let is_invoking = state.should_invoke(now);

        state.last_args = Some(args);
        state.last_call_time = Some(now);

        if is_invoking {
            if state.timer.is_none() {
                return state.leading_edge(&weak, now);
            }
            if state.options.max_wait.is_some() {
                // -- 🔄 max wait reached mid-burst: restart the clock and invoke right now
                state.clear_timer();
                let delay = state.delay;
                state.start_timer(&weak, delay);
                return state.invoke(now);
            }
        }
        if state.timer.is_none() {
            let delay = state.delay;
            state.start_timer(&weak, delay);
        }
        state.result.clone()
    }

    /// 🗑️ Drop the pending timer and args without invoking.
    pub fn cancel(&self) {
        let mut state = lock(&self.inner);
        state.clear_timer();
        state.last_invoke_time = None;
        state.last_args = None;
        state.last_call_time = None;
    }

    /// 🚽 Run the trailing invocation now if one is pending, else return the last result.
    pub fn flush(&self) -> Option<R> {
        let mut state = lock(&self.inner);
        if state.timer.is_none() {
            return state.result.clone();
        }
        state.clear_timer();
        state.trailing_edge(Instant::now())
    }

    /// ⏰ Is a timer currently scheduled?
    pub fn is_pending(&self) -> bool {
        lock(&self.inner).timer.is_some()
    }
}

impl<A, R> State<A, R>
where
    A: Send + 'static,
    R: Clone + Send + 'static,
{
    fn should_invoke(&self, now: Instant) -> bool {
        let Some(last_call) = self.last_call_time else {
            return true;
        };
        let Some(since_call) = now.checked_duration_since(last_call) else {
            // -- 🕰️ clock went backwards. treat it as "been long enough".
            return true;
        };
        since_call >= self.delay
            || self.options.max_wait.is_some_and(|max_wait| {
                self.last_invoke_time
                    .is_none_or(|last| now.saturating_duration_since(last) >= max_wait)
            })
    }

    fn remaining_wait(&self, now: Instant) -> Duration {
        let since_call = self
            .last_call_time
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        let waiting = self.delay.saturating_sub(since_call);
        match self.options.max_wait {
            Some(max_wait) => {
                let left_before_max = self.last_invoke_time.map_or(Duration::ZERO, |last| {
                    max_wait.saturating_sub(now.saturating_duration_since(last))
                });
                waiting.min(left_before_max)
            }
            None => waiting,
        }
    }

    fn leading_edge(&mut self, weak: &WeakShared<A, R>, now: Instant) -> Option<R> {
        self.last_invoke_time = Some(now);
        let delay = self.delay;
        self.start_timer(weak, delay);
        if self.options.leading {
            self.invoke(now)
        } else {
            self.result.clone()
        }
    }

    fn trailing_edge(&mut self, now: Instant) -> Option<R> {
        self.timer = None;
        if self.options.trailing && self.last_args.is_some() {
            return self.invoke(now);
        }
        self.last_args = None;
        self.result.clone()
    }

    fn invoke(&mut self, now: Instant) -> Option<R> {
        self.last_invoke_time = Some(now);
        if let Some(args) = self.last_args.take() {
            trace!("⏳ debounced function invoked");
            self.result = Some((self.func)(args));
        }
        self.result.clone()
    }

    fn timer_expired(&mut self, weak: &WeakShared<A, R>) {
        let now = Instant::now();
        if self.should_invoke(now) {
            self.trailing_edge(now);
        } else {
            let wait = self.remaining_wait(now);
            self.start_timer(weak, wait);
        }
    }

    fn start_timer(&mut self, weak: &WeakShared<A, R>, wait: Duration) {
        self.timer_epoch += 1;
        let epoch = self.timer_epoch;
        let weak = weak.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = lock(&inner);
            if state.timer_epoch != epoch {
                return;
            }
            state.timer_expired(&weak);
        }));
    }

    fn clear_timer(&mut self) {
        self.timer_epoch += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(T) + Send + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        (calls, move |value: T| sink.lock().expect("recorder lock").push(value))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_only_the_last_word_counts() {
        let (calls, record) = recorder::<&str>();
        let debounced = Debounced::new(ms(400), record);

        debounced.call("A");
        sleep(ms(100)).await;
        debounced.call("B");
        sleep(ms(100)).await;
        debounced.call("C");

        // -- 🧪 400ms after C, not after A
        sleep(ms(399)).await;
        assert!(calls.lock().unwrap().is_empty(), "too early, C is still settling");
        assert!(debounced.is_pending());

        sleep(ms(2)).await;
        assert_eq!(*calls.lock().unwrap(), vec!["C"]);
        assert!(!debounced.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_max_wait_forces_a_word_in_edgewise() {
        let start = Instant::now();
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&stamps);
        let debounced = Debounced::with_options(
            ms(100),
            DebounceOptions {
                max_wait: Some(ms(250)),
                ..Default::default()
            },
            move |_: u32| sink.lock().unwrap().push(Instant::now() - start),
        );

        // -- 🔥 a call every 40ms for a full second. without max_wait: zero invocations.
        for i in 0..25 {
            debounced.call(i);
            sleep(ms(40)).await;
        }

        let stamps = stamps.lock().unwrap().clone();
        assert!(!stamps.is_empty(), "max_wait should have forced an invocation");
        assert!(stamps[0] <= ms(250), "first invocation at {:?}", stamps[0]);
        assert!(stamps.len() >= 3, "one per max_wait window, got {}", stamps.len());
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_leading_edge_goes_first_and_then_naps() {
        let (calls, record) = recorder::<u32>();
        let debounced = Debounced::with_options(
            ms(100),
            DebounceOptions {
                leading: true,
                trailing: false,
                max_wait: None,
            },
            record,
        );

        debounced.call(1);
        assert_eq!(*calls.lock().unwrap(), vec![1], "leading edge fires immediately");
        debounced.call(2);
        debounced.call(3);
        sleep(ms(150)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1], "trailing is off, 2 and 3 are dropped");

        debounced.call(4);
        assert_eq!(*calls.lock().unwrap(), vec![1, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_cancel_means_never_mind() {
        let (calls, record) = recorder::<u32>();
        let debounced = Debounced::new(ms(100), record);
        debounced.call(1);
        debounced.cancel();
        assert!(!debounced.is_pending());

        sleep(ms(500)).await;
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_flush_skips_the_wait() {
        let debounced = Debounced::new(ms(100), |n: u32| n * 2);
        assert_eq!(debounced.flush(), None, "nothing pending, nothing ever ran");

        assert_eq!(debounced.call(21), None, "trailing mode returns the previous result");
        assert_eq!(debounced.flush(), Some(42));
        assert!(!debounced.is_pending());
        assert_eq!(debounced.flush(), Some(42), "flush with nothing pending returns the last result");
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_dropping_the_handle_cancels_the_timer() {
        let (calls, record) = recorder::<u32>();
        let debounced = Debounced::new(ms(100), record);
        debounced.call(1);
        drop(debounced);

        sleep(ms(500)).await;
        assert!(calls.lock().unwrap().is_empty(), "torn down, nobody home to invoke");
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_separate_bursts_get_separate_calls() {
        let (calls, record) = recorder::<&str>();
        let debounced = Debounced::new(ms(50), record);
        debounced.call("first");
        sleep(ms(200)).await;
        debounced.call("second");
        sleep(ms(200)).await;
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }
}
