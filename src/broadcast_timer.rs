use super::*;

/// Forces a job rebroadcast when nothing has been broadcast for `period`. Every broadcast resets
/// the deadline; firing re-arms it before returning.
#[derive(Debug)]
pub(crate) struct BroadcastTimer {
    deadline: Mutex<Option<Instant>>,
    changed: tokio::sync::Notify,
    period: Duration,
}

impl BroadcastTimer {
    pub(crate) const PERIOD: Duration = Duration::from_secs(55);

    pub(crate) fn new(period: Duration) -> Self {
        Self {
            deadline: Mutex::new(None),
            changed: tokio::sync::Notify::new(),
            period,
        }
    }

    pub(crate) fn reset(&self) {
        *self.deadline.lock() = Some(Instant::now() + self.period);
        self.changed.notify_one();
    }

    pub(crate) fn stop(&self) {
        *self.deadline.lock() = None;
        self.changed.notify_one();
    }

    pub(crate) fn is_running(&self) -> bool {
        self.deadline.lock().is_some()
    }

    /// Resolves when the deadline passes. Pending forever while stopped.
    pub(crate) async fn wait(&self) {
        loop {
            let deadline = *self.deadline.lock();

            match deadline {
                Some(deadline) if deadline <= Instant::now() => {
                    *self.deadline.lock() = Some(Instant::now() + self.period);
                    return;
                }
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {}
                        _ = self.changed.notified() => {}
                    }
                }
                None => self.changed.notified().await,
            }
        }
    }
}
