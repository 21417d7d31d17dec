//! Single-use token ledger

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Records consumed token ids until the tokens themselves expire
///
/// Expiry is checked in whole seconds and stays inclusive: a token with
/// `exp = T` verifies up to `T + leeway` seconds. An entry is only dropped
/// once its token can no longer pass verification.
#[derive(Debug, Default)]
pub struct ConsumptionLedger {
    consumed: Mutex<HashMap<String, DateTime<Utc>>>,
    leeway_secs: i64,
}

impl ConsumptionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger for a validator that accepts tokens `leeway_secs` past `exp`
    pub fn with_leeway(leeway_secs: u64) -> Self {
        Self {
            consumed: Mutex::default(),
            leeway_secs: i64::try_from(leeway_secs).unwrap_or(i64::MAX),
        }
    }

    /// Check-and-mark: true only the first time `unique_id` is seen
    pub fn consume(&self, unique_id: &str, expires_at: DateTime<Utc>) -> bool {
        self.consume_at(unique_id, expires_at, Utc::now())
    }

    fn consume_at(&self, unique_id: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let mut consumed = self
            .consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let now_secs = now.timestamp();
        let leeway = self.leeway_secs;
        consumed.retain(|_, expiry| expiry.timestamp().saturating_add(leeway) >= now_secs);
        if consumed.contains_key(unique_id) {
            return false;
        }
        consumed.insert(unique_id.to_string(), expires_at);
        true
    }

    pub fn len(&self) -> usize {
        self.consumed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[test]
    fn test_consume_once() {
        let ledger = ConsumptionLedger::new();
        let exp = Utc::now() + Duration::minutes(15);
        assert!(ledger.consume("abc", exp));
        assert!(!ledger.consume("abc", exp));
        assert!(ledger.consume("def", exp));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_expired_entries_are_pruned() {
        let ledger = ConsumptionLedger::new();
        let now = Utc::now();
        assert!(ledger.consume_at("old", now + Duration::seconds(5), now));
        assert!(ledger.consume_at("new", now + Duration::minutes(5), now));

        let later = now + Duration::seconds(10);
        assert!(ledger.consume_at("other", later + Duration::minutes(5), later));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_entry_survives_until_expiry_second_ends() {
        let ledger = ConsumptionLedger::new();
        let exp = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();

        assert!(ledger.consume_at("edge", exp, exp - Duration::seconds(1)));
        // Still verifiable at exactly `exp` and for the rest of that second
        assert!(!ledger.consume_at("edge", exp, exp));
        assert!(!ledger.consume_at("edge", exp, exp + Duration::milliseconds(500)));
        assert!(!ledger.consume_at("edge", exp, exp + Duration::milliseconds(999)));
        assert_eq!(ledger.len(), 1);

        // A second past `exp` the token fails verification, so the entry goes
        assert!(ledger.consume_at("later", exp + Duration::minutes(5), exp + Duration::seconds(1)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_leeway_extends_retention() {
        let ledger = ConsumptionLedger::with_leeway(60);
        let exp = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();

        assert!(ledger.consume_at("grace", exp, exp));
        assert!(!ledger.consume_at("grace", exp, exp + Duration::seconds(60)));
        assert!(ledger.consume_at("other", exp + Duration::hours(1), exp + Duration::seconds(61)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_concurrent_consumers_see_exactly_one_success() {
        let ledger = Arc::new(ConsumptionLedger::new());
        let exp = Utc::now() + Duration::minutes(15);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.consume("shared", exp))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
