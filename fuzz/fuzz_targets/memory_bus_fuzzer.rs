//! Fuzz target for the in-process broker
//!
//! Arbitrary publish/poll interleavings against a multi-partition bus.
//!
//! # Invariants
//!
//! - Offsets are strictly increasing per partition
//! - Messages sharing a key land on one partition, in publish order
//! - Nothing is delivered twice and nothing published is lost once the
//!   final drain completes

#![no_main]

use std::{collections::HashMap, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use partyline_relay::{BusConsumer, BusProducer, MemoryBus, RelayConfig};

#[derive(Debug, Arbitrary)]
struct Plan {
    partitions: u8,
    ops: Vec<Op>,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Publish { key: Option<u8>, value: u16 },
    Poll,
}

fuzz_target!(|plan: Plan| {
    let partitions = usize::from(plan.partitions % 4) + 1;
    let bus = MemoryBus::with_partitions(partitions);
    let config = RelayConfig::new("fuzz", "fuzz-group");
    let (producer, mut consumer) = bus.connect(&config);
    if consumer.subscribe("fuzz").is_err() {
        return;
    }

    let mut published = Vec::new();
    let mut delivered = Vec::new();

    for op in plan.ops {
        match op {
            Op::Publish { key, value } => {
                let key = key.map(|k| format!("k{k}"));
                let value = format!("v{value}");
                producer.publish("fuzz", key.as_deref(), &value).unwrap();
                published.push((key, value));
            },
            Op::Poll => {
                delivered.extend(consumer.poll(Duration::ZERO).unwrap());
            },
        }
    }
    delivered.extend(consumer.poll(Duration::ZERO).unwrap());

    assert_eq!(delivered.len(), published.len(), "lost or duplicated messages");

    let mut next_offset: HashMap<i32, i64> = HashMap::new();
    let mut key_partition: HashMap<String, i32> = HashMap::new();
    for message in &delivered {
        let next = next_offset.entry(message.partition).or_insert(0);
        assert_eq!(message.offset, *next, "offset gap within a partition");
        *next += 1;

        if let Some(key) = &message.key {
            let partition = key_partition.entry(key.clone()).or_insert(message.partition);
            assert_eq!(*partition, message.partition, "key moved between partitions");
        }
    }

    // Per-key delivery order must match per-key publish order.
    let mut published_by_key: HashMap<&str, Vec<&str>> = HashMap::new();
    for (key, value) in &published {
        if let Some(key) = key {
            published_by_key.entry(key).or_default().push(value);
        }
    }
    let mut delivered_by_key: HashMap<&str, Vec<&str>> = HashMap::new();
    for message in &delivered {
        if let Some(key) = &message.key {
            delivered_by_key.entry(key).or_default().push(&message.value);
        }
    }
    assert_eq!(delivered_by_key, published_by_key);
});
