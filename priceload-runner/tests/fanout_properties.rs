//! Property tests for fan-out expansion and failure accounting.

use priceload_core::partition::years;
use priceload_core::store::MemoryStore;
use priceload_core::{
    ApiToken, KeyBuilder, LoadType, PriceProvider, RawPayload, RemoteError, RetryPolicy,
    TimeWindow,
};
use priceload_runner::{expand, FailureStage, FanOutScheduler, NoProgress};
use proptest::prelude::*;
use std::collections::HashSet;

// ── Strategies ─────────────────────────────────────────────────────

/// May contain repeats and blanks; both must still be counted.
fn arb_tickers() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Z]{1,3}|[ ]{0,2}", 0..8)
}

fn arb_year_range() -> impl Strategy<Value = (i32, i32)> {
    (1990i32..2030, 0i32..6).prop_map(|(start, len)| (start, start + len))
}

/// Fails for tickers whose first letter is in the set.
struct FailByInitial(HashSet<char>);

impl PriceProvider for FailByInitial {
    fn name(&self) -> &str {
        "fail-by-initial"
    }

    fn fetch_prices(
        &self,
        ticker: &str,
        _window: &TimeWindow,
        _token: &ApiToken,
    ) -> Result<RawPayload, RemoteError> {
        match ticker.chars().next() {
            Some(c) if self.0.contains(&c) => Err(RemoteError::Network("scripted".into())),
            _ => Ok(RawPayload::from_value(serde_json::json!([]))),
        }
    }
}

// ── Properties ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn expansion_is_the_full_cartesian_product(
        tickers in arb_tickers(),
        (start, end) in arb_year_range(),
    ) {
        let windows = years(start, end).unwrap();
        let items = expand(&tickers, &windows);

        prop_assert_eq!(items.len(), tickers.len() * windows.len());

        // Ticker-major, windows ascending within each ticker.
        for (ticker, chunk) in tickers.iter().zip(items.chunks(windows.len())) {
            prop_assert!(chunk.iter().all(|item| &item.ticker == ticker));
            for pair in chunk.windows(2) {
                prop_assert!(pair[0].window.start() < pair[1].window.start());
            }
        }
    }

    #[test]
    fn every_item_lands_in_exactly_one_bucket(
        tickers in arb_tickers(),
        (start, end) in arb_year_range(),
        failing in prop::collection::hash_set(prop::char::range('A', 'Z'), 0..6),
        workers in 1usize..4,
    ) {
        let windows = years(start, end).unwrap();
        let provider = FailByInitial(failing.clone());
        let store = MemoryStore::new();
        let result = FanOutScheduler::new(
            &provider,
            &store,
            KeyBuilder::default(),
            RetryPolicy::new(1, std::time::Duration::ZERO),
            RetryPolicy::new(1, std::time::Duration::ZERO),
        )
        .with_workers(workers)
        .with_progress(&NoProgress)
        .run(&tickers, &windows, LoadType::Retro, &ApiToken::new("t"));

        prop_assert_eq!(result.total(), tickers.len() * windows.len());
        // Repeated tickers write the same key twice.
        let written: HashSet<&str> = result.succeeded.iter().map(|k| k.as_str()).collect();
        prop_assert_eq!(store.len(), written.len());

        for failed in &result.failed {
            match failed.item.ticker.chars().next() {
                Some(c) if c != ' ' => {
                    prop_assert_eq!(failed.stage, FailureStage::Fetch);
                    prop_assert!(failing.contains(&c));
                }
                _ => {
                    prop_assert_eq!(failed.stage, FailureStage::Validate);
                }
            }
        }
    }
}
