//! Outbound snapshots for the rendering task.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::diagnostics::Counter;
use crate::message::DisplayMessage;

/// Bounded queue of [`DisplayMessage`] read by the rendering task.
pub struct DisplayQueue<const D: usize> {
    channel: Channel<CriticalSectionRawMutex, DisplayMessage, D>,
    dropped: Counter,
}

impl<const D: usize> DisplayQueue<D> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: Counter::new(),
        }
    }

    pub fn try_take(&self) -> Option<DisplayMessage> {
        self.channel.try_receive().ok()
    }

    /// Waits for the next snapshot.
    pub async fn take(&self) -> DisplayMessage {
        self.channel.receive().await
    }

    pub fn pending(&self) -> usize {
        self.channel.len()
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.get()
    }
}

impl<const D: usize> Default for DisplayQueue<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the dispatcher sends snapshots.
pub trait DisplayPublisher {
    /// Publishes without waiting. A snapshot that does not fit is dropped
    /// and counted; the dispatcher never stalls on the display.
    fn publish(&self, msg: DisplayMessage);

    fn dropped(&self) -> u32;
}

impl<const D: usize> DisplayPublisher for DisplayQueue<D> {
    fn publish(&self, msg: DisplayMessage) {
        if self.channel.try_send(msg).is_err() {
            self.dropped.increment();
            debug!("display: queue full, snapshot dropped");
        }
    }

    fn dropped(&self) -> u32 {
        self.dropped.get()
    }
}

impl<T: DisplayPublisher + ?Sized> DisplayPublisher for &T {
    fn publish(&self, msg: DisplayMessage) {
        (**self).publish(msg)
    }

    fn dropped(&self) -> u32 {
        (**self).dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DisplayIntent;

    #[test]
    fn test_publish_drops_when_full() {
        let queue: DisplayQueue<1> = DisplayQueue::new();
        queue.publish(DisplayMessage::alarm_active());
        queue.publish(DisplayMessage::fault(false));
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.dropped(), 1);
        assert_eq!(
            queue.try_take().map(|m| m.intent),
            Some(DisplayIntent::AlarmActive)
        );
        assert_eq!(queue.try_take(), None);
    }

    #[tokio::test]
    async fn test_take_waits_for_snapshot() {
        let queue: DisplayQueue<2> = DisplayQueue::new();
        queue.publish(DisplayMessage::fault(true));
        let msg = queue.take().await;
        assert_eq!(msg.intent, DisplayIntent::Fault);
        assert!(msg.alarm_armed);
    }
}
