//! In-process broker.
//!
//! Backs loopback mode and deterministic tests: topics are per-partition
//! `Vec` logs behind a mutex, consumer groups share next-read offsets, and
//! poll blocks on a condvar so the timeout bound behaves like a real broker
//! client. No network.

use std::{
    collections::HashMap,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

use crate::{
    bus::{BusConsumer, BusProducer},
    config::{OffsetReset, RelayConfig},
    error::RelayError,
    message::Message,
};

/// One stored record.
#[derive(Debug, Clone)]
struct Record {
    key: Option<String>,
    value: String,
}

/// Broker state shared by every handle.
#[derive(Debug, Default)]
struct BrokerState {
    /// Topic name to per-partition append-only logs.
    topics: HashMap<String, Vec<Vec<Record>>>,
    /// (group, topic) to next-read offset per partition.
    offsets: HashMap<(String, String), Vec<usize>>,
    /// Rotation counter for keyless publishes.
    round_robin: usize,
}

#[derive(Debug, Default)]
struct BrokerShared {
    state: Mutex<BrokerState>,
    wakeup: Condvar,
}

impl BrokerShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerState> {
        // Propagating poisoning here would only hide the panic that caused
        // it; the broker state is append-only and remains usable.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// In-process message bus.
///
/// Clone-cheap front for creating connected handle pairs. All handles from
/// one bus see the same topics and group offsets.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    shared: Arc<BrokerShared>,
    partitions: usize,
}

impl MemoryBus {
    /// Bus with a single partition per topic.
    pub fn new() -> Self {
        Self::with_partitions(1)
    }

    /// Bus with `partitions` ordered sub-logs per topic. Order is guaranteed
    /// only within a partition, as with a real broker.
    pub fn with_partitions(partitions: usize) -> Self {
        Self { shared: Arc::new(BrokerShared::default()), partitions: partitions.max(1) }
    }

    /// Create a connected producer/consumer handle pair for `config`.
    ///
    /// The in-process broker cannot fail to connect; startup failure paths
    /// are exercised through the Kafka backend and test stubs.
    pub fn connect(&self, config: &RelayConfig) -> (MemoryProducer, MemoryConsumer) {
        let producer =
            MemoryProducer { shared: Arc::clone(&self.shared), partitions: self.partitions, closed: false };
        let consumer = MemoryConsumer {
            shared: Arc::clone(&self.shared),
            partitions: self.partitions,
            group_id: config.group_id.clone(),
            offset_reset: config.offset_reset,
            subscription: None,
            closed: false,
        };
        (producer, consumer)
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer handle for the in-process broker.
#[derive(Debug)]
pub struct MemoryProducer {
    shared: Arc<BrokerShared>,
    partitions: usize,
    closed: bool,
}

impl BusProducer for MemoryProducer {
    fn publish(&self, topic: &str, key: Option<&str>, value: &str) -> Result<(), RelayError> {
        if self.closed {
            return Err(RelayError::Publish("producer handle is closed".to_string()));
        }

        let mut state = self.shared.lock();
        let partition = match key {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() as usize) % self.partitions
            },
            None => {
                let slot = state.round_robin % self.partitions;
                state.round_robin = state.round_robin.wrapping_add(1);
                slot
            },
        };

        let partitions = self.partitions;
        let logs = state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); partitions]);
        logs[partition].push(Record { key: key.map(str::to_string), value: value.to_string() });
        drop(state);

        self.shared.wakeup.notify_all();
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Consumer handle for the in-process broker.
#[derive(Debug)]
pub struct MemoryConsumer {
    shared: Arc<BrokerShared>,
    partitions: usize,
    group_id: String,
    offset_reset: OffsetReset,
    subscription: Option<String>,
    closed: bool,
}

impl MemoryConsumer {
    /// Drain everything available past the group's offsets. Caller holds
    /// the lock.
    fn drain(&self, state: &mut BrokerState, topic: &str) -> Vec<Message> {
        let Some(logs) = state.topics.get(topic) else {
            return Vec::new();
        };

        let offsets = state
            .offsets
            .entry((self.group_id.clone(), topic.to_string()))
            .or_insert_with(|| vec![0; self.partitions]);

        let mut batch = Vec::new();
        for (partition, log) in logs.iter().enumerate() {
            let next = &mut offsets[partition];
            while *next < log.len() {
                let record = &log[*next];
                batch.push(Message {
                    topic: topic.to_string(),
                    key: record.key.clone(),
                    value: record.value.clone(),
                    partition: partition as i32,
                    offset: *next as i64,
                });
                *next += 1;
            }
        }
        batch
    }
}

impl BusConsumer for MemoryConsumer {
    fn subscribe(&mut self, topic: &str) -> Result<(), RelayError> {
        if self.closed {
            return Err(RelayError::Connection("consumer handle is closed".to_string()));
        }

        let mut state = self.shared.lock();
        let key = (self.group_id.clone(), topic.to_string());
        if !state.offsets.contains_key(&key) {
            // No committed offset for this group yet: apply the reset policy.
            let start = match self.offset_reset {
                OffsetReset::Earliest => vec![0; self.partitions],
                OffsetReset::Latest => state
                    .topics
                    .get(topic)
                    .map_or_else(|| vec![0; self.partitions], |logs| {
                        logs.iter().map(Vec::len).collect()
                    }),
            };
            state.offsets.insert(key, start);
        }
        drop(state);

        self.subscription = Some(topic.to_string());
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Result<Vec<Message>, RelayError> {
        if self.closed {
            return Ok(Vec::new());
        }
        let Some(topic) = self.subscription.clone() else {
            return Ok(Vec::new());
        };

        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            let batch = self.drain(&mut state, &topic);
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            state = match self.shared.wakeup.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.subscription = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(group: &str) -> RelayConfig {
        RelayConfig::new("demo", group)
    }

    fn values_of(batch: Vec<Message>) -> Vec<String> {
        batch.into_iter().map(|m| m.value).collect()
    }

    #[test]
    fn publishes_come_back_in_order_within_a_partition() {
        let bus = MemoryBus::new();
        let (producer, mut consumer) = bus.connect(&config("g1"));
        consumer.subscribe("demo").unwrap();

        for value in ["one", "two", "three"] {
            producer.publish("demo", None, value).unwrap();
        }

        let batch = consumer.poll(Duration::from_millis(50)).unwrap();
        let values: Vec<&str> = batch.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, ["one", "two", "three"]);
        assert_eq!(batch[0].offset, 0);
        assert_eq!(batch[2].offset, 2);
    }

    #[test]
    fn empty_poll_respects_the_timeout_bound() {
        let bus = MemoryBus::new();
        let (_producer, mut consumer) = bus.connect(&config("g1"));
        consumer.subscribe("demo").unwrap();

        let started = Instant::now();
        let batch = consumer.poll(Duration::from_millis(30)).unwrap();
        assert!(batch.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn group_members_share_offsets() {
        let bus = MemoryBus::new();
        let (producer, mut first) = bus.connect(&config("shared"));
        let (_, mut second) = bus.connect(&config("shared"));
        first.subscribe("demo").unwrap();
        second.subscribe("demo").unwrap();

        producer.publish("demo", None, "only once").unwrap();

        let seen_by_first = first.poll(Duration::from_millis(50)).unwrap();
        let seen_by_second = second.poll(Duration::from_millis(20)).unwrap();
        assert_eq!(seen_by_first.len() + seen_by_second.len(), 1);
    }

    #[test]
    fn latest_reset_skips_history_earliest_replays_it() {
        let bus = MemoryBus::new();
        let (producer, _) = bus.connect(&config("writer"));
        producer.publish("demo", None, "history").unwrap();

        let mut latest_config = config("late-group");
        latest_config.offset_reset = OffsetReset::Latest;
        let (_, mut late) = bus.connect(&latest_config);
        late.subscribe("demo").unwrap();
        assert!(late.poll(Duration::from_millis(20)).unwrap().is_empty());

        let (_, mut early) = bus.connect(&config("early-group"));
        early.subscribe("demo").unwrap();
        let replayed = values_of(early.poll(Duration::from_millis(50)).unwrap());
        assert_eq!(replayed, ["history"]);

        producer.publish("demo", None, "fresh").unwrap();
        let fresh = values_of(late.poll(Duration::from_millis(100)).unwrap());
        assert_eq!(fresh, ["fresh"]);
    }

    #[test]
    fn keyed_publishes_stick_to_one_partition() {
        let bus = MemoryBus::with_partitions(4);
        let (producer, mut consumer) = bus.connect(&config("g1"));
        consumer.subscribe("demo").unwrap();

        for value in ["a", "b", "c"] {
            producer.publish("demo", Some("same-key"), value).unwrap();
        }

        let batch = consumer.poll(Duration::from_millis(50)).unwrap();
        let partitions: Vec<i32> = batch.iter().map(|m| m.partition).collect();
        assert_eq!(partitions.len(), 3);
        assert!(partitions.windows(2).all(|w| w[0] == w[1]));
        let values: Vec<&str> = batch.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, ["a", "b", "c"]);
    }

    #[test]
    fn closed_handles_are_inert() {
        let bus = MemoryBus::new();
        let (mut producer, mut consumer) = bus.connect(&config("g1"));
        consumer.subscribe("demo").unwrap();

        producer.close();
        producer.close();
        assert!(producer.publish("demo", None, "x").is_err());

        consumer.close();
        consumer.close();
        assert!(consumer.poll(Duration::from_millis(10)).unwrap().is_empty());
    }

    #[test]
    fn blocked_poll_wakes_on_publish() {
        let bus = MemoryBus::new();
        let (producer, mut consumer) = bus.connect(&config("g1"));
        consumer.subscribe("demo").unwrap();

        let waiter = std::thread::spawn(move || consumer.poll(Duration::from_secs(5)).unwrap());
        std::thread::sleep(Duration::from_millis(20));
        producer.publish("demo", None, "wake up").unwrap();

        let batch = waiter.join().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].value, "wake up");
    }
}
