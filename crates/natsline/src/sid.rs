//! Client-side subscription id generation.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use natsline_wire::SubscriptionId;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
const SID_LEN: usize = 32;

/// Random bytes mixed into every id.
const ENTROPY_LEN: usize = 16;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generates a fresh subscription id.
///
/// The id is a SHA-256 digest over the wall clock, the process id, a
/// per-process sequence number and 16 bytes from the thread-local RNG,
/// truncated to 32 hex characters. Collisions are improbable but not ruled
/// out.
#[must_use]
pub fn generate() -> SubscriptionId {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut entropy = [0_u8; ENTROPY_LEN];
    rand::thread_rng().fill_bytes(&mut entropy);

    let mut hasher = Sha256::new();
    hasher.update(format!("{nanos}:{}:{sequence}:", process::id()).as_bytes());
    hasher.update(entropy);
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    SubscriptionId::new(hex.chars().take(SID_LEN).collect::<String>())
}
