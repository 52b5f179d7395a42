//! Session identifier generation.
//!
//! Docsession doesn't retry on collisions at the generator level: ids are
//! long enough that colliding with a live session is negligible, and the
//! factory's unique insert catches the rest.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Produces new session identifiers.
///
/// Any `Fn() -> String` closure is an `IdGenerator`, so a custom strategy
/// can be supplied without a new type:
///
/// ```rust
/// use docsession_lifecycle::IdGenerator;
///
/// let counter = std::sync::atomic::AtomicU64::new(0);
/// let generator = move || {
///     let n = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///     format!("test-{n}")
/// };
/// assert_eq!(generator.generate(), "test-0");
/// ```
pub trait IdGenerator: Send + Sync + 'static {
    /// Returns a fresh identifier.
    fn generate(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn generate(&self) -> String {
        self()
    }
}

// ---------------------------------------------------------------------------
// RandomIdGenerator
// ---------------------------------------------------------------------------

/// Number of random bytes behind each id (160 bits).
const ID_ENTROPY_BYTES: usize = 20;

/// The default generator: 160 random bits, hashed twice with SHA-256,
/// hex-encoded into a 64-character string.
///
/// Hashing hides the raw output of the random source from clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let entropy = random_bytes::<ID_ENTROPY_BYTES>();
        hex::encode(Sha256::digest(Sha256::digest(entropy)))
    }
}

// ---------------------------------------------------------------------------
// PrefixedIdGenerator
// ---------------------------------------------------------------------------

/// Wraps [`RandomIdGenerator`] output in a fixed namespace prefix, for
/// telling session keys apart when browsing the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedIdGenerator {
    prefix: String,
}

impl PrefixedIdGenerator {
    /// Creates a generator prepending `prefix` to every id.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixedIdGenerator {
    fn default() -> Self {
        Self::new("session:")
    }
}

impl IdGenerator for PrefixedIdGenerator {
    fn generate(&self) -> String {
        format!("{}{}", self.prefix, RandomIdGenerator.generate())
    }
}

/// `N` bytes from the thread-local CSPRNG.
pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rng().fill(&mut bytes[..]);
    bytes
}
