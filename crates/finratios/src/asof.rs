//! As-of (fill-forward) joins over date-keyed data.
//!
//! For a target date the as-of value is the entry with the greatest date
//! that is not after the target. An exact match is therefore always chosen
//! when present, and targets that precede every source date have no value.

use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Latest entry of `source` dated on or before `target`.
///
/// Returns the matched source date together with its payload.
#[must_use]
pub fn as_of<V>(source: &BTreeMap<NaiveDate, V>, target: NaiveDate) -> Option<(NaiveDate, &V)> {
    source
        .range(..=target)
        .next_back()
        .map(|(date, value)| (*date, value))
}

/// Join every target date to its as-of entry in `source`.
///
/// The result is keyed by target date and holds a copy of the matched
/// payload. Targets with no entry on or before them are left out.
///
/// ```
/// use chrono::NaiveDate;
/// use finratios::asof::as_of_join;
/// use std::collections::BTreeMap;
///
/// let d = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
/// let quarters = BTreeMap::from([(d("2024-03-31"), "Q1"), (d("2024-06-30"), "Q2")]);
///
/// let joined = as_of_join([d("2024-03-15"), d("2024-04-02"), d("2024-07-01")], &quarters);
/// assert_eq!(joined.len(), 2);
/// assert_eq!(joined[&d("2024-04-02")], "Q1");
/// assert_eq!(joined[&d("2024-07-01")], "Q2");
/// ```
pub fn as_of_join<V, I>(targets: I, source: &BTreeMap<NaiveDate, V>) -> BTreeMap<NaiveDate, V>
where
    V: Clone,
    I: IntoIterator<Item = NaiveDate>,
{
    targets
        .into_iter()
        .filter_map(|target| as_of(source, target).map(|(_, value)| (target, value.clone())))
        .collect()
}
