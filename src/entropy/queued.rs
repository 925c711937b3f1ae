//! Pads supplied by the caller.
//!
//! A [`PadQueue`] hands out whole pads in the order they were queued, one per
//! rotation. Hosts that provision pads from their own generator can feed it
//! directly, and tests use it to know exactly which pad a rotation writes.

use super::{EntropyError, PadSource};
use std::collections::VecDeque;
use zeroize::Zeroizing;

/// Source replaying queued pads, each wiped once handed out or dropped.
#[derive(Default)]
pub struct PadQueue {
    pads: VecDeque<Zeroizing<Vec<u8>>>,
}

impl PadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `pad` for a later rotation.
    pub fn push(&mut self, pad: &[u8]) {
        self.pads.push_back(Zeroizing::new(pad.to_vec()));
    }

    /// Number of pads not handed out yet.
    pub fn len(&self) -> usize {
        self.pads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }
}

impl PadSource for PadQueue {
    fn name(&self) -> &'static str {
        "PadQueue"
    }

    /// Copies the next queued pad into `dest`. The pad must have exactly
    /// `dest.len()` bytes; a pad of another length is consumed and rejected.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        let pad = self.pads.pop_front().ok_or(EntropyError::Exhausted)?;
        if pad.len() != dest.len() {
            log::error!("Queued pad has {} bytes, {} needed", pad.len(), dest.len());
            return Err(EntropyError::CollectionFailed);
        }
        dest.copy_from_slice(&pad);
        Ok(())
    }
}
