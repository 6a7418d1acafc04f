//! Differences against a reference series.
//!
//! The comparison job subtracts the national yearly average from every
//! state's yearly average. Both sides must already be aligned over the
//! same years (see [`super::align_all`]).

use std::collections::BTreeMap;

use super::groupings::AlignedSeries;
use super::AnalysisError;

/// Result of [`difference`]: same shape and column keys as the minuend.
pub type DifferenceSeries<G, S> = AlignedSeries<G, S>;

/// `a - b`, missing if either side is missing.
pub fn subtract(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

/// Subtracts the single-column `reference` from every column of `series`,
/// group by group.
///
/// Fails if `reference` does not have exactly one column or if the two
/// group domains differ.
pub fn difference<G, S, R>(
    series: &AlignedSeries<G, S>,
    reference: &AlignedSeries<G, R>,
) -> Result<DifferenceSeries<G, S>, AnalysisError>
where
    G: Ord + Clone,
    S: Ord + Clone,
    R: Ord + Clone,
{
    if reference.column_count() != 1 {
        return Err(AnalysisError::ReferenceWidth(reference.column_count()));
    }
    if !series.groups().eq(reference.groups()) {
        return Err(AnalysisError::DomainMismatch {
            left: series.row_count(),
            right: reference.row_count(),
        });
    }

    let rows: BTreeMap<G, Vec<Option<f64>>> = series
        .rows()
        .zip(reference.rows())
        .map(|((group, row), (_, reference_row))| {
            let base = reference_row[0];
            (group.clone(), row.iter().map(|v| subtract(*v, base)).collect())
        })
        .collect();

    Ok(AlignedSeries::from_parts(series.series().to_vec(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{align, align_all};
    use crate::model::Observation;

    fn obs(group: i64, series: &str, value: Option<f64>) -> Observation<i64, String> {
        Observation::new(group, series.to_string(), value)
    }

    #[test]
    fn test_subtract_propagates_missing() {
        assert_eq!(subtract(Some(3.0), Some(1.0)), Some(2.0));
        assert_eq!(subtract(None, Some(1.0)), None);
        assert_eq!(subtract(Some(3.0), None), None);
        assert_eq!(subtract(None, None), None);
    }

    #[test]
    fn test_state_minus_national_with_gap() {
        let aligned = align_all(&[
            vec![obs(2000, "Queensland", Some(10.0)), obs(2001, "Queensland", None)],
            vec![obs(2000, "Australia", Some(9.0)), obs(2001, "Australia", Some(11.0))],
        ]);
        let diff = difference(&aligned[0], &aligned[1]).unwrap();

        assert_eq!(diff.series(), &["Queensland".to_string()]);
        assert_eq!(diff.row(&2000), Some(&[Some(1.0)][..]));
        assert_eq!(diff.row(&2001), Some(&[None][..]));
    }

    #[test]
    fn test_reference_is_broadcast_across_every_column() {
        let aligned = align_all(&[
            vec![
                obs(1900, "New South Wales", Some(17.5)),
                obs(1900, "Tasmania", Some(10.25)),
                obs(1901, "Tasmania", Some(10.0)),
            ],
            vec![obs(1900, "Australia", Some(21.5)), obs(1901, "Australia", None)],
        ]);
        let diff = difference(&aligned[0], &aligned[1]).unwrap();

        assert_eq!(diff.row(&1900), Some(&[Some(-4.0), Some(-11.25)][..]));
        assert_eq!(diff.row(&1901), Some(&[None, None][..]));
    }

    #[test]
    fn test_missing_iff_either_operand_missing() {
        let aligned = align_all(&[
            vec![obs(1, "a", Some(1.5)), obs(2, "a", None), obs(3, "a", Some(0.5)), obs(4, "a", None)],
            vec![obs(1, "n", Some(0.5)), obs(2, "n", Some(0.5)), obs(3, "n", None), obs(4, "n", None)],
        ]);
        let diff = difference(&aligned[0], &aligned[1]).unwrap();
        let expected = [Some(1.0), None, None, None];
        for (group, want) in (1..=4).zip(expected) {
            assert_eq!(diff.get(&group, &"a".to_string()), Some(want), "group {group}");
        }
    }

    #[test]
    fn test_mismatched_domains_fail_fast() {
        let states = align(&[obs(2000, "Victoria", Some(1.0))]);
        let national = align(&[obs(2000, "Australia", Some(1.0)), obs(2001, "Australia", Some(1.0))]);
        assert_eq!(
            difference(&states, &national),
            Err(AnalysisError::DomainMismatch { left: 1, right: 2 })
        );
    }

    #[test]
    fn test_reference_must_have_one_column() {
        let states = align(&[obs(2000, "Victoria", Some(1.0))]);
        let wide = align(&[obs(2000, "A", Some(1.0)), obs(2000, "B", Some(2.0))]);
        assert_eq!(difference(&states, &wide), Err(AnalysisError::ReferenceWidth(2)));
    }

    #[test]
    fn test_empty_series_against_empty_reference_is_rejected_for_width() {
        let empty = align::<i64, String>(&[]);
        assert_eq!(difference(&empty, &empty), Err(AnalysisError::ReferenceWidth(0)));
    }
}
