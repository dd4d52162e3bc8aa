//! Property tests for storage key derivation.
//!
//! 1. Determinism: identical inputs always produce the identical key
//! 2. No collisions: distinct (ticker, label) pairs under one load type
//!    never share a key
//! 3. Layout: every key sits under its load type's prefix and ends in `{ticker}.json`

use chrono::NaiveDate;
use priceload_core::partition::{KeyBuilder, LoadType, PartitionLabel};
use proptest::prelude::*;

// ── Strategies ───────────────────────────────────────────────────────

fn arb_ticker() -> impl Strategy<Value = String> {
    "[A-Z]{1,5}([.-][A-Z]{1,2})?"
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..20_000).prop_map(|d| NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + chrono::Duration::days(d))
}

fn arb_year() -> impl Strategy<Value = i32> {
    1000i32..=9999
}

fn arb_label(load_type: LoadType) -> BoxedStrategy<PartitionLabel> {
    match load_type {
        LoadType::Daily => arb_date().prop_map(PartitionLabel::Date).boxed(),
        LoadType::Retro => arb_year().prop_map(PartitionLabel::Year).boxed(),
    }
}

fn arb_load_type() -> impl Strategy<Value = LoadType> {
    prop_oneof![Just(LoadType::Daily), Just(LoadType::Retro)]
}

fn arb_input() -> impl Strategy<Value = (LoadType, String, PartitionLabel)> {
    arb_load_type().prop_flat_map(|lt| (Just(lt), arb_ticker(), arb_label(lt)))
}

proptest! {
    #[test]
    fn build_key_is_deterministic((load_type, ticker, label) in arb_input()) {
        let keys = KeyBuilder::new("tiingo/json");
        let first = keys.build_key(load_type, &ticker, label).unwrap();
        let second = KeyBuilder::new("tiingo/json").build_key(load_type, &ticker, label).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn distinct_pairs_never_collide(
        load_type in arb_load_type(),
        a in arb_ticker(),
        b in arb_ticker(),
        seed_a in 0i64..20_000,
        seed_b in 0i64..20_000,
    ) {
        let label = |seed: i64| match load_type {
            LoadType::Daily => PartitionLabel::Date(
                NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + chrono::Duration::days(seed),
            ),
            LoadType::Retro => PartitionLabel::Year(1000 + (seed % 9000) as i32),
        };
        let (la, lb) = (label(seed_a), label(seed_b));
        prop_assume!((a.as_str(), la) != (b.as_str(), lb));

        let keys = KeyBuilder::default();
        let ka = keys.build_key(load_type, &a, la).unwrap();
        let kb = keys.build_key(load_type, &b, lb).unwrap();
        prop_assert_ne!(ka, kb);
    }

    #[test]
    fn keys_follow_layout((load_type, ticker, label) in arb_input()) {
        let keys = KeyBuilder::default();
        let key = keys.build_key(load_type, &ticker, label).unwrap();
        let prefix = format!("tiingo/json/load_type={}/", load_type.as_str());
        let partition = format!("{}={label}/", load_type.partition_field());
        let suffix = format!("/{ticker}.json");
        prop_assert!(key.as_str().starts_with(&prefix));
        prop_assert!(key.as_str().contains(&partition));
        prop_assert!(key.as_str().ends_with(&suffix));
    }
}

#[test]
fn neighbouring_tickers_and_days_are_distinct() {
    let keys = KeyBuilder::default();
    let d = |day| PartitionLabel::Date(NaiveDate::from_ymd_opt(2024, 1, day).unwrap());
    let k1 = keys.build_key(LoadType::Daily, "AAPL", d(5)).unwrap();
    let k2 = keys.build_key(LoadType::Daily, "TSLA", d(5)).unwrap();
    let k3 = keys.build_key(LoadType::Daily, "AAPL", d(6)).unwrap();
    assert_ne!(k1, k2);
    assert_ne!(k2, k3);
    assert_ne!(k1, k3);
}
