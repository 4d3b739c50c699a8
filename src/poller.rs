//! Periodic refresh trigger

use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

/// Default refresh interval
pub(crate) const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Timer thread sending a value on every tick, stopped and joined when dropped
pub(crate) struct Poller {
    /// Stop request channel
    stop_tx: Option<mpsc::Sender<()>>,
    /// Timer thread
    thread: Option<thread::JoinHandle<()>>,
}

impl Poller {
    /// Start ticking, first tick is sent after one interval, which must not be zero
    pub(crate) fn start<T>(
        interval: Duration,
        tick_tx: mpsc::Sender<T>,
        tick: T,
    ) -> anyhow::Result<Self>
    where
        T: Clone + Send + 'static,
    {
        anyhow::ensure!(!interval.is_zero(), "Poll interval must not be zero");
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("poller".to_owned())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                loop {
                    // Interruptible sleep
                    match stop_rx.recv_timeout(next.saturating_duration_since(Instant::now())) {
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                    log::trace!("Tick");
                    if tick_tx.send(tick.clone()).is_err() {
                        break;
                    }
                    next += interval;
                }
                log::debug!("Poller stopped");
            })?;
        log::debug!("Poller started with {interval:?} interval");
        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks() {
        let (tx, rx) = mpsc::channel();
        let poller = Poller::start(Duration::from_millis(10), tx, 42).unwrap();
        for _ in 0..3 {
            assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        }
        drop(poller);
    }

    #[test]
    fn stops_on_drop() {
        let (tx, rx) = mpsc::channel();
        let poller = Poller::start(Duration::from_secs(3600), tx, ()).unwrap();
        let start = Instant::now();
        drop(poller);
        assert!(start.elapsed() < Duration::from_secs(5));
        // Thread is gone, so is its sender
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn zero_interval() {
        let (tx, rx) = mpsc::channel();
        assert!(Poller::start(Duration::ZERO, tx, ()).is_err());
        // Nothing was started, so nothing is queued
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn stops_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel();
        let poller = Poller::start(Duration::from_millis(10), tx, ()).unwrap();
        drop(rx);
        thread::sleep(Duration::from_millis(50));
        drop(poller);
    }
}
