//! Inbound message record.

/// A message drained from the bus.
///
/// Immutable snapshot of one record as the broker returned it. `partition`
/// and `offset` are broker-assigned, read-only metadata used only for
/// diagnostics, never for application logic; delivery order is guaranteed
/// only within a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Topic the message was consumed from.
    pub topic: String,
    /// Optional record key.
    pub key: Option<String>,
    /// UTF-8 text line carried as the raw payload.
    pub value: String,
    /// Partition the broker assigned the record to.
    pub partition: i32,
    /// Position of the record within its partition.
    pub offset: i64,
}

impl Message {
    /// Create a keyless message for the given topic and position.
    pub fn new(
        topic: impl Into<String>,
        value: impl Into<String>,
        partition: i32,
        offset: i64,
    ) -> Self {
        Self { topic: topic.into(), key: None, value: value.into(), partition, offset }
    }
}
