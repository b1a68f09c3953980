//! Chart-series shaping.
//!
//! Pure transformation from aggregate buckets to a flat, plottable bar
//! sequence plus a "nice" y-axis scale. No rendering happens here; the UI
//! layer maps [`BarRole`] to colors and [`Spacing`] to pixel gaps.

use crate::{Bucket, Currency, Money};

/// What a bar represents, which drives its color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarRole {
    Income,
    Expense,
    /// Zero-height transparent bar that keeps an empty bucket's label slot on
    /// the axis.
    Placeholder,
}

/// Gap after a bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spacing {
    /// Tight gap between the income/expense bars of one bucket.
    Inner,
    /// Wide gap before the next bucket's bars.
    Group,
}

/// One plottable bar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bar {
    /// Bar height in minor units.
    pub value: i64,
    /// Bucket label, carried by the first bar of each bucket only.
    pub label: Option<String>,
    pub role: BarRole,
    pub trailing: Spacing,
}

/// Flattens buckets into bars.
///
/// Per bucket: both sums positive → an income bar then an expense bar sharing
/// the bucket label, tightly spaced; exactly one positive → a single bar;
/// both zero → a placeholder so the axis labels stay evenly laid out.
#[must_use]
pub fn normalize_bar_series(buckets: &[Bucket]) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(buckets.len() * 2);

    for bucket in buckets {
        let has_income = bucket.income > 0;
        let has_expense = bucket.expense > 0;

        if has_income && has_expense {
            bars.push(Bar {
                value: bucket.income,
                label: Some(bucket.label.clone()),
                role: BarRole::Income,
                trailing: Spacing::Inner,
            });
            bars.push(Bar {
                value: bucket.expense,
                label: None,
                role: BarRole::Expense,
                trailing: Spacing::Group,
            });
        } else if has_income || has_expense {
            let (value, role) = if has_income {
                (bucket.income, BarRole::Income)
            } else {
                (bucket.expense, BarRole::Expense)
            };
            bars.push(Bar {
                value,
                label: Some(bucket.label.clone()),
                role,
                trailing: Spacing::Group,
            });
        } else {
            bars.push(Bar {
                value: 0,
                label: Some(bucket.label.clone()),
                role: BarRole::Placeholder,
                trailing: Spacing::Group,
            });
        }
    }

    bars
}

/// A "nice" y-axis: round step value, `max_value == step_value * sections`,
/// and a compact label per tick (including the zero tick).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YAxis {
    pub max_value: i64,
    pub step_value: i64,
    pub labels: Vec<String>,
}

/// Rounds `raw` up to the nearest nice number: the smallest of
/// `{1, 2, 5, 10}` times the raw value's power of ten that covers it.
fn nice_step(raw: f64) -> f64 {
    let raw = if raw > 0.0 { raw } else { 1.0 };
    let pow10 = 10f64.powf(raw.log10().floor());
    let base = raw / pow10;
    let nice = if base > 5.0 {
        10.0
    } else if base > 2.0 {
        5.0
    } else if base > 1.0 {
        2.0
    } else {
        1.0
    };
    nice * pow10
}

/// Computes the axis scale for a set of bar heights (minor units).
///
/// Guarantees `max_value >= max(values)` and `max_value == step_value *
/// sections`, so the tallest bar never clips and every tick lands on a round
/// number.
#[must_use]
pub fn build_nice_y_axis(values: &[i64], sections: u32, currency: Currency) -> YAxis {
    let sections = sections.max(1);
    let tallest = values.iter().copied().max().unwrap_or(0).max(0);

    let raw = tallest as f64 / f64::from(sections);
    let step_value = (nice_step(raw).max(1.0)).round() as i64;
    let max_value = step_value * i64::from(sections);

    let labels = (0..=sections)
        .map(|tick| Money::new(i64::from(tick) * step_value).to_compact_string(currency))
        .collect();

    YAxis {
        max_value,
        step_value,
        labels,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn bucket(label: &str, income: i64, expense: i64) -> Bucket {
        Bucket {
            label: label.to_string(),
            period_start: Utc.timestamp_opt(0, 0).unwrap(),
            period_end: Utc.timestamp_opt(86_400, 0).unwrap(),
            income,
            expense,
        }
    }

    #[test]
    fn mixed_bucket_emits_tight_pair() {
        let bars = normalize_bar_series(&[bucket("Mon", 200, 80)]);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].role, BarRole::Income);
        assert_eq!(bars[0].label.as_deref(), Some("Mon"));
        assert_eq!(bars[0].trailing, Spacing::Inner);
        assert_eq!(bars[1].role, BarRole::Expense);
        assert_eq!(bars[1].label, None);
        assert_eq!(bars[1].trailing, Spacing::Group);
    }

    #[test]
    fn single_sided_bucket_emits_one_bar() {
        let bars = normalize_bar_series(&[bucket("Tue", 0, 80)]);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].value, 80);
        assert_eq!(bars[0].role, BarRole::Expense);
        assert_eq!(bars[0].trailing, Spacing::Group);
    }

    #[test]
    fn empty_bucket_keeps_label_slot() {
        let bars = normalize_bar_series(&[bucket("Wed", 0, 0)]);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].value, 0);
        assert_eq!(bars[0].role, BarRole::Placeholder);
        assert_eq!(bars[0].label.as_deref(), Some("Wed"));
    }

    #[test]
    fn axis_covers_tallest_bar() {
        for values in [
            vec![200, 80],
            vec![1],
            vec![999],
            vec![1_000],
            vec![123_456, 7],
            vec![0, 0],
        ] {
            let axis = build_nice_y_axis(&values, 3, Currency::Cop);
            let tallest = values.iter().copied().max().unwrap_or(0);
            assert!(axis.max_value >= tallest, "axis too short for {values:?}");
            assert_eq!(axis.max_value, axis.step_value * 3);
            assert_eq!(axis.labels.len(), 4);
        }
    }

    #[test]
    fn axis_steps_are_nice() {
        let axis = build_nice_y_axis(&[200, 80], 3, Currency::Cop);
        // raw = 200/3 ≈ 66.7 → snapped to 100.
        assert_eq!(axis.step_value, 100);
        assert_eq!(axis.max_value, 300);
        assert_eq!(axis.labels, ["0", "100", "200", "300"]);
    }

    #[test]
    fn axis_labels_are_compact() {
        let axis = build_nice_y_axis(&[2_000_000], 3, Currency::Cop);
        // raw ≈ 666K → step 1M.
        assert_eq!(axis.step_value, 1_000_000);
        assert_eq!(axis.labels, ["0", "1M", "2M", "3M"]);
    }
}
