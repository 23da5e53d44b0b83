use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::state::PlayerEvent;

/// A scheduled auto-advance. Dropping it cancels the pending advance.
#[derive(Debug)]
pub struct AutoAdvanceTimer {
    ticket: u64,
    handle: JoinHandle<()>,
}

impl AutoAdvanceTimer {
    /// Send `PlayerEvent::AutoAdvance { ticket }` on `tx` after `delay`.
    ///
    /// Returns `None` outside a tokio runtime.
    #[must_use]
    pub fn schedule(
        ticket: u64,
        delay: Duration,
        tx: UnboundedSender<PlayerEvent>,
    ) -> Option<Self> {
        let runtime = Handle::try_current().ok()?;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the player was dropped.
            let _ = tx.send(PlayerEvent::AutoAdvance { ticket });
        });
        Some(Self { ticket, handle })
    }

    #[must_use]
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AutoAdvanceTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _timer = AutoAdvanceTimer::schedule(7, Duration::from_millis(2_000), tx).unwrap();

        tokio::time::sleep(Duration::from_millis(1_999)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await, Some(PlayerEvent::AutoAdvance { ticket: 7 }));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = AutoAdvanceTimer::schedule(1, Duration::from_millis(500), tx).unwrap();
        drop(timer);

        tokio::time::sleep(Duration::from_secs(5)).await;
        // Aborted task drops its sender, closing the channel.
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn no_runtime_means_no_timer() {
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(AutoAdvanceTimer::schedule(1, Duration::from_millis(10), tx).is_none());
    }
}
