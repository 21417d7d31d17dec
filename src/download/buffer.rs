//! Adaptive read buffer sizing
//!
//! Large transfers get a bigger buffer to cut down on read calls; everything
//! else keeps the small default so the common path stays cheap.

use serde::{Deserialize, Serialize};

use super::ResourceKind;

pub const KIB: usize = 1024;
pub const MIB: usize = 1024 * KIB;

/// One row of the policy table: sizes strictly above `above` use `buffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct BufferThreshold {
    pub above: u64,
    pub buffer: usize,
}

/// Threshold → buffer size table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BufferPolicy {
    /// Used when no threshold matches
    pub default_buffer: usize,
    /// Largest matching `above` wins, declaration order does not matter
    #[serde(default)]
    pub thresholds: Vec<BufferThreshold>,
}

impl BufferPolicy {
    pub const fn new(default_buffer: usize, thresholds: Vec<BufferThreshold>) -> Self {
        Self {
            default_buffer,
            thresholds,
        }
    }

    /// Built-in table for a resource kind
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::File => Self::new(
                64 * KIB,
                vec![BufferThreshold {
                    above: 100 * MIB as u64,
                    buffer: MIB,
                }],
            ),
            ResourceKind::Backup => Self::new(
                64 * KIB,
                vec![BufferThreshold {
                    above: 1024 * MIB as u64,
                    buffer: 2 * MIB,
                }],
            ),
        }
    }

    /// Buffer size for a transfer of `size` bytes
    pub fn buffer_size_for(&self, size: u64) -> usize {
        let buffer = self
            .thresholds
            .iter()
            .filter(|t| size > t.above)
            .max_by_key(|t| t.above)
            .map_or(self.default_buffer, |t| t.buffer);

        // A zero-sized buffer would never make progress
        buffer.max(1)
    }
}
