//! Pad material generation.
//!
//! Every rotation needs `PAD_LEN` unpredictable bytes. The bytes come from a
//! [`PadSource`]: in production the operating system CSPRNG ([`OsEntropy`]),
//! in tests anything deterministic that implements the trait.
//!
//! # Security
//! - **No reuse**: each call draws fresh bytes from the source; nothing is
//!   cached between calls.
//! - **Zeroization**: generated pads live in `Zeroizing` buffers and are wiped
//!   when dropped.

pub mod queued;

use core::fmt;
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

/// Error types for pad generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyError {
    /// Source could not be initialized.
    InitFailed,
    /// The source failed while producing bytes.
    CollectionFailed,
    /// Source has nothing left to hand out.
    Exhausted,
}

impl fmt::Display for EntropyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntropyError::InitFailed => write!(f, "Entropy source initialization failed"),
            EntropyError::CollectionFailed => write!(f, "Entropy collection failed"),
            EntropyError::Exhausted => write!(f, "Entropy source exhausted"),
        }
    }
}

impl std::error::Error for EntropyError {}

/// A source of pad bytes.
pub trait PadSource {
    /// Returns a unique identifier for the source.
    fn name(&self) -> &'static str;

    /// Fills `dest` completely with fresh bytes.
    ///
    /// # Returns
    /// * `Ok(())` on success.
    /// * `Err(EntropyError)` if the source fails; `dest` contents are then unspecified.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError>;
}

impl<S: PadSource + ?Sized> PadSource for &mut S {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        (**self).fill(dest)
    }
}

impl<S: PadSource + ?Sized> PadSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        (**self).fill(dest)
    }
}

/// Operating system CSPRNG (`getrandom` under the hood).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl PadSource for OsEntropy {
    fn name(&self) -> &'static str {
        "OsRng"
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|_| EntropyError::CollectionFailed)
    }
}

/// Produces a fresh `len`-byte pad from `source`.
///
/// The buffer starts zeroed, so a failing source never hands out stale memory.
pub fn generate<S: PadSource + ?Sized>(
    source: &mut S,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, EntropyError> {
    log::debug!("Generating {} bytes unique pad from {}", len, source.name());
    let mut pad = Zeroizing::new(vec![0u8; len]);
    source.fill(&mut pad)?;
    Ok(pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::queued::PadQueue;

    #[test]
    fn test_os_entropy_varies_between_calls() {
        let mut rng = OsEntropy;
        let a = generate(&mut rng, 1024).unwrap();
        let b = generate(&mut rng, 1024).unwrap();

        assert_eq!(a.len(), 1024);
        assert_ne!(*a, *b);
        assert_ne!(*a, vec![0u8; 1024]);
    }

    #[test]
    fn test_generate_uses_injected_source() {
        let mut source = PadQueue::new();
        source.push(&[0xAB; 8]);

        let pad = generate(&mut source, 8).unwrap();
        assert_eq!(*pad, vec![0xAB; 8]);
    }

    #[test]
    fn test_generate_propagates_source_failure() {
        let mut source = PadQueue::new();
        source.push(&[1, 2, 3]);

        assert_eq!(generate(&mut source, 4).unwrap_err(), EntropyError::CollectionFailed);
        assert_eq!(generate(&mut source, 4).unwrap_err(), EntropyError::Exhausted);
    }
}
