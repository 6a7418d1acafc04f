/// Data reshaping for the world temperature jobs.
///
/// Aggregation happens in SQL; this module only turns the sparse query
/// results into dense, aligned matrices and differences them.
///
/// Submodules:
/// - `domain` — ordered key sets shared between aligned series.
/// - `groupings` — sparse `(group, series, value)` records to dense rows.
/// - `difference` — per-series differences against a reference series.

pub mod difference;
pub mod domain;
pub mod groupings;

pub use difference::{difference, subtract, DifferenceSeries};
pub use domain::KeyDomain;
pub use groupings::{align, align_all, align_over, AlignedSeries};

/// Precondition violations in the reshaping core. These indicate a
/// caller bug, so they are reported instead of coerced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The two series being combined do not cover the same group keys.
    #[error("group-key domains differ: {left} groups vs {right} groups")]
    DomainMismatch { left: usize, right: usize },

    /// A reference series must hold exactly one column.
    #[error("reference series must have exactly one column, found {0}")]
    ReferenceWidth(usize),
}
