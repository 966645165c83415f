//! Provisional identifiers for records created while offline.

use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reserved prefix of every provisional id.
pub const PROVISIONAL_PREFIX: &str = "offline_";

const SUFFIX_LEN: usize = 9;

/// Returns true if `id` was issued locally and not yet replaced.
#[must_use]
pub fn is_provisional(id: &str) -> bool {
    id.starts_with(PROVISIONAL_PREFIX)
}

/// Issues ids of the form `offline_<millis>_<9 base-36 chars>`.
///
/// The millisecond component is strictly increasing within one generator
/// (it borrows from the future when called faster than the clock ticks), so
/// ids from one session never repeat; the random suffix separates sessions
/// and devices.
#[derive(Debug, Default)]
pub struct ProvisionalIdGenerator {
    last_millis: AtomicU64,
}

impl ProvisionalIdGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next provisional id.
    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut last = self.last_millis.load(Ordering::SeqCst);
        let stamp = loop {
            let candidate = now.max(last + 1);
            match self.last_millis.compare_exchange(
                last,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break candidate,
                Err(actual) => last = actual,
            }
        };

        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
            .collect();

        format!("{PROVISIONAL_PREFIX}{stamp}_{suffix}")
    }
}
