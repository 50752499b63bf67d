//! Heartbeat bookkeeping for a single shard.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct HeartbeatHandler {
    interval_ms: AtomicU64,
    last_heartbeat_sent: RwLock<Instant>,
    last_rtt_ms: AtomicU64, // u64::MAX = none yet
    ack_received: AtomicBool,
}

impl HeartbeatHandler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: AtomicU64::new(interval.as_millis() as u64),
            last_heartbeat_sent: RwLock::new(Instant::now()),
            last_rtt_ms: AtomicU64::new(u64::MAX),
            ack_received: AtomicBool::new(true),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Acquire))
    }

    pub fn mark_sent(&self) {
        self.ack_received.store(false, Ordering::SeqCst);
        *self.last_heartbeat_sent.write() = Instant::now();
    }

    pub fn mark_acked(&self) {
        let now = Instant::now();
        let sent_at = *self.last_heartbeat_sent.read();
        let rtt = now.saturating_duration_since(sent_at);
        self.ack_received.store(true, Ordering::SeqCst);
        self.last_rtt_ms.store(rtt.as_millis() as u64, Ordering::Release);
    }

    /// True once a heartbeat has been sent without its matching ACK — used
    /// by the read loop to decide whether a missed tick should force a
    /// resumable reconnect.
    pub fn is_awaiting_ack(&self) -> bool {
        !self.ack_received.load(Ordering::SeqCst)
    }

    pub fn latency(&self) -> Option<Duration> {
        let ms = self.last_rtt_ms.load(Ordering::Acquire);
        (ms != u64::MAX).then(|| Duration::from_millis(ms))
    }
}

impl Default for HeartbeatHandler {
    fn default() -> Self {
        Self::new(Duration::from_millis(45000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handler_has_no_latency_and_is_acked() {
        let handler = HeartbeatHandler::default();
        assert!(handler.latency().is_none());
        assert!(!handler.is_awaiting_ack());
    }

    #[test]
    fn mark_sent_then_ack_records_round_trip_latency() {
        let handler = HeartbeatHandler::new(Duration::from_millis(100));
        handler.mark_sent();
        assert!(handler.is_awaiting_ack());
        std::thread::sleep(Duration::from_millis(5));
        handler.mark_acked();
        assert!(!handler.is_awaiting_ack());
        assert!(handler.latency().is_some());
    }
}
