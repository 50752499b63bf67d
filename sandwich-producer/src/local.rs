use crate::{CloseShardReason, ProducerError, Producer, PublishMessage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Retention knobs modelled on the reference JetStream transport's stream
/// configuration: a short max-age, oldest-message-discard on overflow, and a
/// per-subject message cap.
#[derive(Debug, Clone)]
pub struct LocalProducerConfig {
    pub max_age: Duration,
    pub max_msgs_per_subject: usize,
}

impl Default for LocalProducerConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(5 * 60),
            max_msgs_per_subject: 1_000_000,
        }
    }
}

struct Entry {
    message: PublishMessage,
    received_at: Instant,
}

/// In-process reference transport. Each `channel` owns an independent
/// `flume` queue per subject; publishing past `max_msgs_per_subject` drops
/// the oldest buffered message for that subject rather than blocking the
/// publisher, matching `DiscardOld` on the reference transport.
pub struct LocalProducer {
    config: LocalProducerConfig,
    subjects: Mutex<HashMap<String, (flume::Sender<Entry>, flume::Receiver<Entry>)>>,
    closed: AtomicBool,
}

impl LocalProducer {
    pub fn new(config: LocalProducerConfig) -> Self {
        Self {
            config,
            subjects: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(true),
        }
    }

    /// Drains and returns every message currently buffered for `subject`,
    /// discarding any that have aged past `max_age`. This is the consumer
    /// side of the reference transport — there is no separate subscriber
    /// API since nothing outside this process reads from it.
    pub fn drain(&self, channel: &str, subject: &str) -> Vec<Vec<u8>> {
        let key = format!("{channel}.{subject}");
        let subjects = self.subjects.lock();
        let Some((_, rx)) = subjects.get(&key) else {
            return Vec::new();
        };
        let max_age = self.config.max_age;
        rx.try_iter()
            .filter(|entry| entry.received_at.elapsed() < max_age)
            .map(|entry| entry.message.payload)
            .collect()
    }
}

impl Producer for LocalProducer {
    fn connect(&self) -> Result<(), ProducerError> {
        self.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn publish(&self, channel: &str, message: PublishMessage) -> Result<(), ProducerError> {
        if self.is_closed() {
            return Err(ProducerError::Closed);
        }

        let key = format!("{channel}.{}", message.subject);
        let mut subjects = self.subjects.lock();
        let (tx, rx) = subjects
            .entry(key)
            .or_insert_with(|| flume::bounded(self.config.max_msgs_per_subject));

        if tx.len() >= self.config.max_msgs_per_subject {
            // DiscardOld: make room by dropping the oldest buffered entry.
            let _ = rx.try_recv();
        }

        tx.try_send(Entry {
            message,
            received_at: Instant::now(),
        })
        .map_err(|_| ProducerError::Closed)
    }

    fn close_shard(&self, _shard_id: u32, _reason: CloseShardReason) {
        // No per-shard routing concept: publishing is keyed by channel and
        // subject, not shard, so there's nothing to tear down here.
    }

    fn stop_session(&self, _session_id: &str) {}

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(subject: &str, payload: &[u8]) -> PublishMessage {
        PublishMessage {
            subject: subject.to_owned(),
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn publish_before_connect_fails() {
        let producer = LocalProducer::new(LocalProducerConfig::default());
        let result = producer.publish("events", message("guild_create", b"{}"));
        assert!(result.is_err());
    }

    #[test]
    fn publish_after_connect_is_drainable() {
        let producer = LocalProducer::new(LocalProducerConfig::default());
        producer.connect().unwrap();
        producer
            .publish("events", message("guild_create", b"hello"))
            .unwrap();

        let drained = producer.drain("events", "guild_create");
        assert_eq!(drained, vec![b"hello".to_vec()]);
    }

    #[test]
    fn close_rejects_further_publishes() {
        let producer = LocalProducer::new(LocalProducerConfig::default());
        producer.connect().unwrap();
        producer.close();
        assert!(producer.is_closed());
        assert!(producer
            .publish("events", message("guild_create", b"{}"))
            .is_err());
    }

    #[test]
    fn overflow_discards_oldest_message() {
        let config = LocalProducerConfig {
            max_age: Duration::from_secs(60),
            max_msgs_per_subject: 2,
        };
        let producer = LocalProducer::new(config);
        producer.connect().unwrap();
        producer.publish("events", message("s", b"1")).unwrap();
        producer.publish("events", message("s", b"2")).unwrap();
        producer.publish("events", message("s", b"3")).unwrap();

        let drained = producer.drain("events", "s");
        assert_eq!(drained, vec![b"2".to_vec(), b"3".to_vec()]);
    }
}
