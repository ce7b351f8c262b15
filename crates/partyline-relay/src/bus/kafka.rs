//! Kafka transport for the bus.
//!
//! Thin wrappers over rdkafka's synchronous `BaseProducer`/`BaseConsumer`
//! pair. Protocol logic stays in the session machine; this module only maps
//! records and classifies failures.

use std::time::{Duration, Instant};

use rdkafka::{
    ClientConfig,
    consumer::{BaseConsumer, Consumer},
    error::{KafkaError, RDKafkaErrorCode},
    message::Message as KafkaMessage,
    producer::{BaseProducer, BaseRecord, Producer},
};

use crate::{
    bus::{BusConsumer, BusProducer},
    config::RelayConfig,
    error::RelayError,
    message::Message,
};

/// Bound on the final delivery flush when closing the producer.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Establish producer and consumer handles against the configured broker.
///
/// Fails fast and loudly with [`RelayError::Connection`]; nothing is
/// retried here.
pub fn connect(config: &RelayConfig) -> Result<(KafkaProducer, KafkaConsumer), RelayError> {
    let consumer: BaseConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("group.id", &config.group_id)
        .set("auto.offset.reset", config.offset_reset.as_str())
        .set("enable.auto.commit", "true")
        .create()
        .map_err(|e| RelayError::Connection(e.to_string()))?;

    let producer: BaseProducer = ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .create()
        .map_err(|e| RelayError::Connection(e.to_string()))?;

    Ok((KafkaProducer { inner: producer, closed: false }, KafkaConsumer {
        inner: consumer,
        closed: false,
    }))
}

/// Whether a consumer-side error indicates a dead connection rather than a
/// transient per-message failure.
fn is_connection_fatal(error: &KafkaError) -> bool {
    matches!(
        error.rdkafka_error_code(),
        Some(
            RDKafkaErrorCode::AllBrokersDown
                | RDKafkaErrorCode::Authentication
                | RDKafkaErrorCode::Fatal
        )
    )
}

/// Producer handle backed by rdkafka.
pub struct KafkaProducer {
    inner: BaseProducer,
    closed: bool,
}

impl BusProducer for KafkaProducer {
    fn publish(&self, topic: &str, key: Option<&str>, value: &str) -> Result<(), RelayError> {
        if self.closed {
            return Err(RelayError::Publish("producer handle is closed".to_string()));
        }

        let mut record: BaseRecord<'_, str, str> = BaseRecord::to(topic).payload(value);
        if let Some(key) = key {
            record = record.key(key);
        }
        self.inner.send(record).map_err(|(e, _)| RelayError::Publish(e.to_string()))?;

        // Serve delivery callbacks without blocking the caller.
        self.inner.poll(Duration::ZERO);
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(error) = self.inner.flush(CLOSE_FLUSH_TIMEOUT) {
            tracing::warn!(%error, "producer flush failed during close");
        }
    }
}

/// Consumer handle backed by rdkafka.
pub struct KafkaConsumer {
    inner: BaseConsumer,
    closed: bool,
}

impl BusConsumer for KafkaConsumer {
    fn subscribe(&mut self, topic: &str) -> Result<(), RelayError> {
        if self.closed {
            return Err(RelayError::Connection("consumer handle is closed".to_string()));
        }
        self.inner.subscribe(&[topic]).map_err(|e| RelayError::Connection(e.to_string()))
    }

    fn poll(&mut self, timeout: Duration) -> Result<Vec<Message>, RelayError> {
        if self.closed {
            return Ok(Vec::new());
        }

        let deadline = Instant::now() + timeout;
        let mut batch = Vec::new();
        loop {
            let Some(wait) = poll_wait(batch.is_empty(), Instant::now(), deadline) else {
                break;
            };

            match self.inner.poll(wait) {
                None => break,
                Some(Ok(record)) => {
                    let payload = record.payload().unwrap_or_default();
                    match utf8_payload(payload, record.partition(), record.offset()) {
                        Ok(value) => batch.push(Message {
                            topic: record.topic().to_string(),
                            key: record
                                .key()
                                .and_then(|k| std::str::from_utf8(k).ok())
                                .map(str::to_string),
                            value: value.to_string(),
                            partition: record.partition(),
                            offset: record.offset(),
                        }),
                        Err(error) => {
                            if batch.is_empty() {
                                return Err(error);
                            }
                            // The bad record was already consumed; deliver
                            // what was drained before it.
                            tracing::warn!(%error, "malformed record after partial batch");
                            break;
                        },
                    }
                },
                Some(Err(error)) => {
                    if batch.is_empty() {
                        return Err(RelayError::Poll {
                            message: error.to_string(),
                            fatal: is_connection_fatal(&error),
                        });
                    }
                    // Deliver what we already drained; the error will
                    // resurface on the next poll if it persists.
                    tracing::warn!(%error, "poll error after partial batch");
                    break;
                },
            }
        }
        Ok(batch)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.inner.unsubscribe();
    }
}

/// Wait budget for the next underlying poll call.
///
/// An empty batch waits out the remaining deadline. Once something was
/// drained only already-buffered records are taken, so the batch is handed
/// back at the cadence the broker delivered it instead of sitting on it
/// until the deadline. `None` means the deadline elapsed.
fn poll_wait(batch_empty: bool, now: Instant, deadline: Instant) -> Option<Duration> {
    if !batch_empty {
        return Some(Duration::ZERO);
    }
    if now >= deadline {
        return None;
    }
    Some(deadline - now)
}

/// Decode a record payload, classifying non-UTF-8 as a transient poll
/// failure.
fn utf8_payload(payload: &[u8], partition: i32, offset: i64) -> Result<&str, RelayError> {
    std::str::from_utf8(payload).map_err(|error| RelayError::Poll {
        message: format!("non-UTF-8 payload at partition {partition} offset {offset}: {error}"),
        fatal: false,
    })
}
