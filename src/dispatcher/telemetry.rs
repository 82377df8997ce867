//! Telemetry dispatch to the notify characteristic

use crate::ble::traits::BleNotifier;
use crate::context::Stats;
use crate::protocol::TelemetryFrame;

/// Forwards frames to the BLE notifier, fire-and-forget
pub struct TelemetryDispatcher<'a, N> {
    notifier: N,
    stats: &'a Stats,
}

impl<'a, N: BleNotifier> TelemetryDispatcher<'a, N> {
    pub fn new(notifier: N, stats: &'a Stats) -> Self {
        Self { notifier, stats }
    }

    /// Publish one frame
    ///
    /// A failed notification loses the frame; nothing is retried and the
    /// sampler is never told.
    pub async fn dispatch(&mut self, frame: TelemetryFrame) {
        match self.notifier.notify(frame.as_bytes()).await {
            Ok(()) => self.stats.record_frame_sent(),
            Err(e) => {
                self.stats.record_notify_failure();
                log::debug!("Telemetry: frame dropped ({})", e);
            }
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::traits::mock::MockNotifier;
    use crate::ble::traits::NotifyError;

    #[test]
    fn test_dispatch_writes_frame_bytes() {
        let stats = Stats::new();
        let mut dispatcher = TelemetryDispatcher::new(MockNotifier::new(), &stats);
        let frame = TelemetryFrame::encode(-500, 6000, 101_325, true);

        futures::executor::block_on(dispatcher.dispatch(frame));

        let sent = dispatcher.notifier().get_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].as_slice(), frame.as_bytes());
        assert_eq!(stats.snapshot().frames_sent, 1);
    }

    #[test]
    fn test_failure_is_not_retried() {
        let stats = Stats::new();
        let notifier = MockNotifier::new();
        notifier.set_next_error(NotifyError::Transport);
        let mut dispatcher = TelemetryDispatcher::new(notifier, &stats);

        futures::executor::block_on(async {
            dispatcher.dispatch(TelemetryFrame::encode(1, 1, 1, false)).await;
            dispatcher.dispatch(TelemetryFrame::encode(2, 2, 2, false)).await;
        });

        // First frame lost, second delivered
        let sent = dispatcher.notifier().get_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0], 2);

        let snap = stats.snapshot();
        assert_eq!(snap.notify_failures, 1);
        assert_eq!(snap.frames_sent, 1);
    }

    #[test]
    fn test_no_central_connected() {
        let stats = Stats::new();
        let mut notifier = MockNotifier::new();
        notifier.set_disconnected(true);
        let mut dispatcher = TelemetryDispatcher::new(notifier, &stats);

        futures::executor::block_on(dispatcher.dispatch(TelemetryFrame::encode(0, 0, 0, true)));

        assert!(dispatcher.notifier().get_sent().is_empty());
        assert_eq!(stats.snapshot().notify_failures, 1);
    }
}
