/// Per-attempt hook for retry loops. Boards use it to blink indicators.
pub trait AttemptObserver {
    /// Called before an attempt is made. `attempt` counts from 1.
    fn attempt_started(&mut self, attempt: u8);

    /// Called right before the operation itself, after any settle delay.
    fn attempt_ready(&mut self, _attempt: u8) {}

    fn attempt_finished(&mut self, attempt: u8, ok: bool);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl AttemptObserver for NoopObserver {
    fn attempt_started(&mut self, _attempt: u8) {}

    fn attempt_finished(&mut self, _attempt: u8, _ok: bool) {}
}

impl<T: AttemptObserver + ?Sized> AttemptObserver for &mut T {
    fn attempt_started(&mut self, attempt: u8) {
        (**self).attempt_started(attempt);
    }

    fn attempt_ready(&mut self, attempt: u8) {
        (**self).attempt_ready(attempt);
    }

    fn attempt_finished(&mut self, attempt: u8, ok: bool) {
        (**self).attempt_finished(attempt, ok);
    }
}
