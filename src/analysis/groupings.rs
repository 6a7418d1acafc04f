//! Sparse-to-dense alignment.
//!
//! Aggregate queries return one `(group, series, value)` triple per pair
//! that had data. The jobs need rectangular matrices instead: one row per
//! group key, one column per series key, and an explicit missing cell for
//! every pair the query did not return.

use std::collections::BTreeMap;

use super::domain::{position_of, KeyDomain};
use crate::model::Observation;

/// A dense matrix of values over a full `group × series` domain.
///
/// Invariants: `series` is ascending and duplicate-free; every row has
/// exactly `series.len()` cells; rows iterate in ascending group order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries<G: Ord, S> {
    series: Vec<S>,
    rows: BTreeMap<G, Vec<Option<f64>>>,
}

impl<G: Ord + Clone, S: Ord + Clone> AlignedSeries<G, S> {
    /// Column keys, ascending.
    pub fn series(&self) -> &[S] {
        &self.series
    }

    /// Row keys, ascending.
    pub fn groups(&self) -> impl Iterator<Item = &G> {
        self.rows.keys()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&G, &[Option<f64>])> {
        self.rows.iter().map(|(g, row)| (g, row.as_slice()))
    }

    pub fn row(&self, group: &G) -> Option<&[Option<f64>]> {
        self.rows.get(group).map(Vec::as_slice)
    }

    /// Cell lookup. The outer `Option` is `None` only when `group` or
    /// `series` is outside the domain; inside the domain the inner value
    /// is the cell, missing or not.
    pub fn get(&self, group: &G, series: &S) -> Option<Option<f64>> {
        let col = position_of(&self.series, series)?;
        self.rows.get(group).map(|row| row[col])
    }

    /// One series across every group, in group order.
    pub fn column(&self, series: &S) -> Option<Vec<Option<f64>>> {
        let col = position_of(&self.series, series)?;
        Some(self.rows.values().map(|row| row[col]).collect())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.series.is_empty()
    }

    /// Number of cells holding a value.
    pub fn present_count(&self) -> usize {
        self.rows.values().flatten().filter(|v| v.is_some()).count()
    }

    /// Flattens back into one observation per cell, missing cells
    /// included, so re-aligning reproduces the same domain.
    pub fn observations(&self) -> Vec<Observation<G, S>> {
        self.rows
            .iter()
            .flat_map(|(group, row)| {
                self.series
                    .iter()
                    .zip(row)
                    .map(|(series, value)| Observation::new(group.clone(), series.clone(), *value))
            })
            .collect()
    }

    pub(crate) fn from_parts(series: Vec<S>, rows: BTreeMap<G, Vec<Option<f64>>>) -> Self {
        debug_assert!(rows.values().all(|row| row.len() == series.len()));
        Self { series, rows }
    }
}

/// Aligns `records` over their own group and series domains.
pub fn align<G, S>(records: &[Observation<G, S>]) -> AlignedSeries<G, S>
where
    G: Ord + Clone,
    S: Ord + Clone,
{
    align_over(records, &KeyDomain::new())
}

/// Aligns `records` over the union of their own group keys and `groups`.
///
/// Use this when several series must share a row domain even though
/// each query only returned the groups it had data for.
pub fn align_over<G, S>(records: &[Observation<G, S>], groups: &KeyDomain<G>) -> AlignedSeries<G, S>
where
    G: Ord + Clone,
    S: Ord + Clone,
{
    let series: Vec<S> = records
        .iter()
        .map(|r| r.series.clone())
        .collect::<KeyDomain<S>>()
        .to_vec();

    let mut group_domain = groups.clone();
    group_domain.extend(records.iter().map(|r| r.group.clone()));

    let width = series.len();
    let mut rows: BTreeMap<G, Vec<Option<f64>>> = group_domain
        .iter()
        .map(|g| (g.clone(), vec![None; width]))
        .collect();

    // Duplicate pairs: last write wins.
    for record in records {
        if let (Some(col), Some(row)) = (position_of(&series, &record.series), rows.get_mut(&record.group)) {
            row[col] = record.value;
        }
    }

    AlignedSeries::from_parts(series, rows)
}

/// Aligns every record set over one shared group domain: the union of
/// group keys across all sets. Each set keeps its own series columns.
pub fn align_all<G, S>(sets: &[Vec<Observation<G, S>>]) -> Vec<AlignedSeries<G, S>>
where
    G: Ord + Clone,
    S: Ord + Clone,
{
    let shared: KeyDomain<G> = sets
        .iter()
        .flat_map(|set| set.iter().map(|r| r.group.clone()))
        .collect();

    sets.iter().map(|set| align_over(set, &shared)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(group: i64, series: &str, value: Option<f64>) -> Observation<i64, String> {
        Observation::new(group, series.to_string(), value)
    }

    #[test]
    fn test_fills_gap_with_missing_marker() {
        let records = vec![
            obs(2000, "X", Some(10.0)),
            obs(2001, "X", Some(12.0)),
            obs(2000, "Y", Some(8.0)),
        ];
        let aligned = align(&records);

        assert_eq!(aligned.series(), &["X".to_string(), "Y".to_string()]);
        assert_eq!(aligned.groups().copied().collect::<Vec<_>>(), vec![2000, 2001]);
        assert_eq!(aligned.row(&2000), Some(&[Some(10.0), Some(8.0)][..]));
        assert_eq!(aligned.row(&2001), Some(&[Some(12.0), None][..]));
    }

    #[test]
    fn test_empty_input_has_no_rows_or_columns() {
        let aligned = align::<i64, String>(&[]);
        assert_eq!(aligned.row_count(), 0);
        assert_eq!(aligned.column_count(), 0);
        assert!(aligned.is_empty());
        assert!(aligned.observations().is_empty());
    }

    #[test]
    fn test_group_with_only_missing_values_is_kept_as_row() {
        let records = vec![obs(1990, "A", Some(1.0)), obs(1991, "A", None)];
        let aligned = align(&records);
        assert_eq!(aligned.row(&1991), Some(&[None][..]));
    }

    #[test]
    fn test_series_with_only_missing_values_is_kept_as_column() {
        let records = vec![obs(1990, "A", Some(1.0)), obs(1990, "B", None)];
        let aligned = align(&records);
        assert_eq!(aligned.column(&"B".to_string()), Some(vec![None]));
        assert_eq!(aligned.column_count(), 2);
    }

    #[test]
    fn test_every_cell_in_cross_product_is_addressable() {
        let records = vec![
            obs(1850, "Perth", Some(17.0)),
            obs(1900, "Sydney", Some(18.0)),
            obs(1950, "Brisbane", None),
        ];
        let aligned = align(&records);
        assert_eq!(aligned.row_count(), 3);
        assert_eq!(aligned.column_count(), 3);
        for group in [1850, 1900, 1950] {
            for city in ["Brisbane", "Perth", "Sydney"] {
                assert!(aligned.get(&group, &city.to_string()).is_some(), "{group} {city}");
            }
        }
        assert_eq!(aligned.present_count(), 2);
        assert_eq!(aligned.get(&1850, &"Sydney".to_string()), Some(None));
        assert_eq!(aligned.get(&1849, &"Sydney".to_string()), None);
    }

    #[test]
    fn test_unordered_input_yields_ascending_rows_and_columns() {
        let records = vec![obs(2005, "b", Some(2.0)), obs(1995, "a", Some(1.0))];
        let aligned = align(&records);
        assert_eq!(aligned.groups().copied().collect::<Vec<_>>(), vec![1995, 2005]);
        assert_eq!(aligned.series(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_duplicate_pair_last_write_wins() {
        let records = vec![obs(2000, "X", Some(1.0)), obs(2000, "X", Some(2.0))];
        assert_eq!(align(&records).get(&2000, &"X".to_string()), Some(Some(2.0)));
    }

    #[test]
    fn test_realigning_aligned_series_is_identity() {
        let records = vec![
            obs(2000, "X", Some(10.0)),
            obs(2001, "X", Some(12.0)),
            obs(2000, "Y", Some(8.0)),
            obs(2003, "Z", None),
        ];
        let aligned = align(&records);
        assert_eq!(align(&aligned.observations()), aligned);
    }

    #[test]
    fn test_align_over_adds_external_groups() {
        let groups: KeyDomain<i64> = [1999, 2002].into_iter().collect();
        let aligned = align_over(&[obs(2000, "X", Some(1.0))], &groups);
        assert_eq!(aligned.groups().copied().collect::<Vec<_>>(), vec![1999, 2000, 2002]);
        assert_eq!(aligned.row(&1999), Some(&[None][..]));
    }

    #[test]
    fn test_align_all_shares_group_domain_across_sets() {
        let states = vec![obs(1900, "Victoria", Some(14.0)), obs(1901, "Victoria", Some(14.5))];
        let national = vec![obs(1899, "Australia", Some(21.0)), obs(1900, "Australia", Some(21.2))];
        let aligned = align_all(&[states, national]);

        assert_eq!(aligned.len(), 2);
        assert!(aligned[0].groups().eq(aligned[1].groups()));
        assert_eq!(aligned[0].row_count(), 3);
        assert_eq!(aligned[0].row(&1899), Some(&[None][..]));
        assert_eq!(aligned[1].row(&1901), Some(&[None][..]));
    }

    #[test]
    fn test_string_group_keys_are_supported() {
        let records = vec![
            Observation::new("2001".to_string(), 2u8, Some(1.0)),
            Observation::new("2000".to_string(), 1u8, Some(2.0)),
        ];
        let aligned = align(&records);
        assert_eq!(aligned.groups().cloned().collect::<Vec<_>>(), vec!["2000", "2001"]);
        assert_eq!(aligned.series(), &[1u8, 2]);
    }
}
