//! Identity Kernel Common
//!
//! Shared pieces used by every crate in the workspace:
//! - TSID identifiers (time-sorted, Crockford Base32)
//! - Pluggable id generation for aggregates
//! - Tracing subscriber initialisation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Identifiers
// ============================================================================

/// Crockford Base32 alphabet (no I, L, O, U).
const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// TSID epoch: 2020-01-01T00:00:00Z in milliseconds.
const TSID_EPOCH_MILLIS: u64 = 1_577_836_800_000;

/// Bits reserved for the random/counter component.
const RANDOM_BITS: u32 = 22;

static LAST_TSID: AtomicU64 = AtomicU64::new(0);

/// Source of new aggregate identifiers.
///
/// Commands take an `Arc<dyn IdGenerator>` so tests can pin identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-sorted identifier generator.
///
/// A TSID packs 42 bits of milliseconds since 2020 with 22 random bits and
/// renders them as 13 Crockford Base32 characters. Ids generated by one
/// process are strictly increasing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TsidGenerator;

impl TsidGenerator {
    pub fn generate() -> String {
        encode_tsid(Self::next_raw())
    }

    fn next_raw() -> u64 {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(TSID_EPOCH_MILLIS)
            .saturating_sub(TSID_EPOCH_MILLIS);
        let random: u64 = rand::thread_rng().gen_range(0..(1u64 << RANDOM_BITS));
        let candidate = (millis << RANDOM_BITS) | random;

        let mut last = LAST_TSID.load(Ordering::Relaxed);
        loop {
            let next = if candidate > last { candidate } else { last + 1 };
            match LAST_TSID.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

impl IdGenerator for TsidGenerator {
    fn next_id(&self) -> String {
        Self::generate()
    }
}

fn encode_tsid(value: u64) -> String {
    let mut out = [0u8; 13];
    // 13 chars * 5 bits = 65 bits; the leading char carries the top 4 bits.
    out[0] = CROCKFORD[((value >> 60) & 0x0F) as usize];
    for (i, slot) in out.iter_mut().enumerate().skip(1) {
        let shift = 60 - (i as u32) * 5;
        *slot = CROCKFORD[((value >> shift) & 0x1F) as usize];
    }
    out.iter().map(|b| *b as char).collect()
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG` (defaults to `info`) and switches to JSON lines when
/// `IAM_LOG_FORMAT=json`. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("IAM_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
