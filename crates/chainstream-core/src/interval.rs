//! Timer-driven chain source.

use crate::chain::{ChainProducer, Deferred, chain};
use crate::message::Message;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

/// Default content template; `{n}` is replaced with the message number.
pub const DEFAULT_TEMPLATE: &str = "Hello from server action interval stream - message number {n}";

/// Default tick period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

/// Shortest accepted tick period; tokio timers reject a zero period.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Emits one numbered message per tick of a fixed-period timer.
#[derive(Debug, Clone)]
pub struct IntervalSource {
    period: Duration,
    template: String,
    first_number: u64,
}

impl Default for IntervalSource {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}

impl IntervalSource {
    /// Periods below [`MIN_PERIOD`] are raised to it.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            template: DEFAULT_TEMPLATE.to_string(),
            first_number: 1,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_first_number(mut self, first_number: u64) -> Self {
        self.first_number = first_number;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Message for counter value `number`.
    pub fn message(&self, number: u64) -> Message {
        Message::new(number, self.template.replace("{n}", &number.to_string()))
    }

    /// Start producing and return the head handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Deferred {
        self.spawn().0
    }

    /// Like [`start`](Self::start), also returning the producer task. The
    /// task resolves to the number of emitted messages once the consumer
    /// detaches.
    pub fn spawn(self) -> (Deferred, JoinHandle<u64>) {
        let (mut producer, head) = chain();
        let mut number = self.first_number;

        // The first message is available before the first tick.
        let _ = producer.emit(self.message(number));
        number += 1;

        let handle = tokio::spawn(async move { self.run(producer, number).await });
        (head, handle)
    }

    async fn run(self, mut producer: ChainProducer, mut number: u64) -> u64 {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let detached = tokio::select! {
                _ = producer.detached() => true,
                _ = ticker.tick() => false,
            };
            if detached || producer.emit(self.message(number)).is_err() {
                break;
            }
            number += 1;
        }

        debug!(
            emitted = producer.emitted(),
            "Interval consumer detached, stopping timer"
        );
        producer.emitted()
    }
}

/// Interval chain with the default template, ticking every `period`.
pub fn interval_chain(period: Duration) -> Deferred {
    IntervalSource::new(period).start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ChainCursor;
    use futures::StreamExt;

    #[test]
    fn test_message_rendering() {
        let source = IntervalSource::default();
        assert_eq!(source.period(), Duration::from_secs(5));
        assert_eq!(
            source.message(7).content,
            "Hello from server action interval stream - message number 7"
        );

        let custom = IntervalSource::new(Duration::from_millis(10)).with_template("tick {n}/{n}");
        assert_eq!(custom.message(2), Message::new(2, "tick 2/2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_still_ticks() {
        let source = IntervalSource::new(Duration::ZERO);
        assert_eq!(source.period(), MIN_PERIOD);

        let (head, task) = source.spawn();
        let mut cursor = ChainCursor::new(head);
        for expected in 1..=3 {
            assert_eq!(cursor.next().await.unwrap().unwrap().id, expected);
        }
        drop(cursor);

        assert_eq!(task.await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_message_is_immediate() {
        let head = interval_chain(Duration::from_secs(60));
        let started = Instant::now();

        let first = head.await.unwrap();
        assert_eq!(first.id(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_yield_increasing_ids() {
        let cursor = ChainCursor::new(interval_chain(Duration::from_secs(5)));
        let ids: Vec<u64> = cursor.take(6).map(|item| item.unwrap().id).collect().await;
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_message_content() {
        let started = Instant::now();
        let mut cursor = ChainCursor::new(interval_chain(DEFAULT_PERIOD));

        let mut third = None;
        for _ in 0..3 {
            third = cursor.next().await;
        }

        assert_eq!(
            third.unwrap().unwrap().content,
            "Hello from server action interval stream - message number 3"
        );
        assert_eq!(started.elapsed(), DEFAULT_PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_head_stops_timer() {
        let (head, task) = IntervalSource::new(Duration::from_secs(1)).spawn();
        drop(head);

        assert_eq!(task.await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_cursor_stops_timer() {
        let (head, task) = IntervalSource::new(Duration::from_secs(1)).spawn();
        let mut cursor = ChainCursor::new(head);

        for expected in 1..=3 {
            assert_eq!(cursor.next().await.unwrap().unwrap().id, expected);
        }
        drop(cursor);

        assert_eq!(task.await.unwrap(), 3);
    }
}
