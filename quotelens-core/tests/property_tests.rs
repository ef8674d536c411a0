//! Property tests for schema normalization.
//!
//! Uses proptest to verify:
//! 1. Uniqueness: flattened identifiers never collide, whatever the labels
//! 2. Idempotence: normalizing an already normalized table changes nothing
//! 3. Quartiles are ordered: min <= q1 <= median <= q3 <= max

use polars::prelude::*;
use proptest::prelude::*;
use quotelens_core::normalize::{normalize, numeric_columns};
use quotelens_core::stats::{describe_values, FiveNumberSummary};
use quotelens_core::table::{ColumnLabel, RawColumn, RawTable};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Small vocabulary so duplicates after flattening are common.
fn arb_part() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Close".to_string()),
        Just("Open".to_string()),
        Just("Volume".to_string()),
        Just("Date".to_string()),
        Just("AAPL".to_string()),
        Just("Close_1".to_string()),
        "[a-z]{1,3}",
    ]
}

/// Trailing tuple parts may be empty, as with `("Date", "")`.
fn arb_label() -> impl Strategy<Value = ColumnLabel> {
    let trailing = prop_oneof![Just(String::new()), arb_part()];
    prop_oneof![
        arb_part().prop_map(ColumnLabel::Flat),
        (arb_part(), prop::collection::vec(trailing, 1..=2)).prop_map(|(head, rest)| {
            ColumnLabel::Tuple(std::iter::once(head).chain(rest).collect())
        }),
    ]
}

fn arb_table() -> impl Strategy<Value = RawTable> {
    (prop::collection::vec(arb_label(), 1..8), 0usize..6).prop_map(|(labels, rows)| {
        let columns = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let values: Vec<f64> = (0..rows).map(|r| (r + i) as f64 * 1.5).collect();
                RawColumn::new(label, Series::new(format!("c{i}").as_str().into(), values))
            })
            .collect();
        RawTable::new(columns).unwrap()
    })
}

// ── 1. Uniqueness ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn flattened_identifiers_are_unique(table in arb_table()) {
        let normalized = normalize(&table).unwrap();
        let names = normalized.column_names();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), names.len());
        prop_assert_eq!(normalized.height(), table.height());
        prop_assert!(names.contains(&normalized.axis.name));
    }
}

// ── 2. Idempotence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn normalization_is_idempotent(table in arb_table()) {
        let once = normalize(&table).unwrap();
        let twice = normalize(&RawTable::from_frame(&once.frame)).unwrap();
        prop_assert_eq!(twice.column_names(), once.column_names());
        prop_assert_eq!(&twice.axis, &once.axis);
        prop_assert!(twice.frame.equals_missing(&once.frame));
        prop_assert_eq!(numeric_columns(&twice.frame), numeric_columns(&once.frame));
    }
}

// ── 3. Quartile ordering ─────────────────────────────────────────────

proptest! {
    #[test]
    fn five_number_summary_is_ordered(values in prop::collection::vec(-1e6..1e6_f64, 1..50)) {
        let summary = FiveNumberSummary::from(&describe_values("x", &values));
        let [min, q1, median, q3, max] = summary.values();
        prop_assert!(min <= q1);
        prop_assert!(q1 <= median);
        prop_assert!(median <= q3);
        prop_assert!(q3 <= max);
    }
}
