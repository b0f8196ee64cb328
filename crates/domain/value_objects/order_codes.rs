use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Issues order codes from the millisecond clock, bumped so that codes handed out
/// by one process are strictly increasing even within the same millisecond.
///
/// Codes stay below 2^53 so they survive the gateway's JSON number handling.
/// Uniqueness across processes is still enforced by the `order_code` unique
/// constraint; callers retry with a fresh code on conflict.
#[derive(Debug, Default)]
pub struct OrderCodeGenerator {
    last_issued: AtomicI64,
}

impl OrderCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_code(&self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        let mut last = self.last_issued.load(Ordering::Relaxed);

        loop {
            let candidate = now_ms.max(last + 1);
            match self.last_issued.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(observed) => last = observed,
            }
        }
    }
}
