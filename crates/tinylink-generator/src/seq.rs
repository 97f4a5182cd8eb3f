use crate::Generator;
use std::sync::atomic::{AtomicU64, Ordering};
use tinylink_core::shortcode::MAX_LENGTH;
use tinylink_core::ShortCode;

/// A deterministic generator producing `prefix` followed by a zero-padded
/// counter, e.g. "ts000000", "ts000001".
///
/// Codes are only unique within a single instance and the counter is not
/// persisted, so this is meant for tests and throwaway in-memory runs.
/// The prefix should be alphanumeric and short enough that the result fits
/// in ten characters.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            prefix: self.prefix.clone(),
        }
    }
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    /// Creates a generator whose first code uses `offset` as the counter.
    ///
    /// The counter is padded to six digits and grows past that, so the
    /// prefix length plus the digits of the largest count must stay within
    /// ten characters.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
        }
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        let code = format!("{}{:06}", self.prefix, count);
        debug_assert!(
            code.len() <= MAX_LENGTH,
            "sequential code {code} exceeds {MAX_LENGTH} characters"
        );
        ShortCode::new_unchecked(code)
    }
}
