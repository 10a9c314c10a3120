//! The clock's inbound queue.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{with_timeout, Duration};

use crate::diagnostics::Counter;
use crate::message::ClockMessage;

/// The mailbox was full and the message was dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MailboxFull;

/// Bounded FIFO of [`ClockMessage`] with any number of producers and one
/// consumer.
///
/// Producers never block in interrupt or timer context. When the queue is
/// full the message being posted is the one that is lost, so everything
/// already queued keeps its order.
pub struct Mailbox<const N: usize> {
    channel: Channel<CriticalSectionRawMutex, ClockMessage, N>,
    dropped: Counter,
}

impl<const N: usize> Mailbox<N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: Counter::new(),
        }
    }

    /// Zero-wait post, safe from interrupt and timer context.
    pub fn try_post(&self, msg: ClockMessage) -> Result<(), MailboxFull> {
        self.channel.try_send(msg).map_err(|_| {
            self.dropped.increment();
            MailboxFull
        })
    }

    /// Task-context post that waits up to `timeout` for room.
    pub async fn post(&self, msg: ClockMessage, timeout: Duration) -> Result<(), MailboxFull> {
        with_timeout(timeout, self.channel.send(msg))
            .await
            .map_err(|_| {
                self.dropped.increment();
                MailboxFull
            })
    }

    /// Number of queued messages.
    pub fn pending(&self) -> usize {
        self.channel.len()
    }

    pub fn try_take(&self) -> Option<ClockMessage> {
        self.channel.try_receive().ok()
    }

    /// Messages lost since start-up.
    pub fn dropped(&self) -> u32 {
        self.dropped.get()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for Mailbox<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mailbox: Mailbox<4> = Mailbox::new();
        mailbox.try_post(ClockMessage::RefreshDisplay).unwrap();
        mailbox.try_post(ClockMessage::AlarmSilence).unwrap();
        mailbox
            .try_post(ClockMessage::ApplyAlarm { hour: 6, minute: 45 })
            .unwrap();
        assert_eq!(mailbox.pending(), 3);
        assert_eq!(mailbox.try_take(), Some(ClockMessage::RefreshDisplay));
        assert_eq!(mailbox.try_take(), Some(ClockMessage::AlarmSilence));
        assert_eq!(
            mailbox.try_take(),
            Some(ClockMessage::ApplyAlarm { hour: 6, minute: 45 })
        );
        assert_eq!(mailbox.try_take(), None);
    }

    #[test]
    fn test_overflow_drops_newest() {
        let mailbox: Mailbox<2> = Mailbox::new();
        assert_eq!(mailbox.capacity(), 2);
        mailbox.try_post(ClockMessage::RefreshDisplay).unwrap();
        mailbox.try_post(ClockMessage::AlarmButtonDisplay).unwrap();
        assert_eq!(mailbox.try_post(ClockMessage::AlarmSilence), Err(MailboxFull));
        assert_eq!(mailbox.try_post(ClockMessage::AlarmFired), Err(MailboxFull));
        assert_eq!(mailbox.pending(), 2);
        assert_eq!(mailbox.dropped(), 2);

        assert_eq!(mailbox.try_take(), Some(ClockMessage::RefreshDisplay));
        assert_eq!(mailbox.try_take(), Some(ClockMessage::AlarmButtonDisplay));
        assert_eq!(mailbox.try_take(), None);
    }

    #[tokio::test]
    async fn test_post_waits_then_times_out() {
        let mailbox: Mailbox<1> = Mailbox::new();
        mailbox
            .post(ClockMessage::RefreshDisplay, Duration::from_millis(10))
            .await
            .unwrap();
        let result = mailbox
            .post(ClockMessage::AlarmSilence, Duration::from_millis(10))
            .await;
        assert_eq!(result, Err(MailboxFull));
        assert_eq!(mailbox.dropped(), 1);
        assert_eq!(mailbox.try_take(), Some(ClockMessage::RefreshDisplay));
    }
}
