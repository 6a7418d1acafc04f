//! SVG charts of yearly series.
//!
//! Both charts put the year on the x axis and give every series its own
//! palette colour and legend entry. Missing values are never drawn: the
//! scatter skips them and the line chart breaks the line around them.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::analysis::AlignedSeries;
use crate::logging::{self, Stage};
use crate::model::{Result, TempError};

const CHART_SIZE: (u32, u32) = (1280, 720);
const POINT_RADIUS: u32 = 3;

/// Scatter of per-series differences against a reference, with a line at zero.
pub fn render_difference_scatter(diff: &AlignedSeries<i64, String>, path: &Path, title: &str) -> Result<()> {
    let Some(bounds) = Bounds::of(diff, true) else {
        logging::warn(Stage::Plot, Some(title), "No values to plot; skipping");
        return Ok(());
    };

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_scatter(root, diff, title, bounds).map_err(|e| TempError::Plot(e.to_string()))?;

    logging::info(Stage::Plot, Some(title), &format!("Wrote {}", path.display()));
    Ok(())
}

/// One line per series; missing years split the line into segments.
pub fn render_line_chart(series: &AlignedSeries<i64, String>, path: &Path, title: &str) -> Result<()> {
    let Some(bounds) = Bounds::of(series, false) else {
        logging::warn(Stage::Plot, Some(title), "No values to plot; skipping");
        return Ok(());
    };

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_lines(root, series, title, bounds).map_err(|e| TempError::Plot(e.to_string()))?;

    logging::info(Stage::Plot, Some(title), &format!("Wrote {}", path.display()));
    Ok(())
}

/// Splits a column into runs of consecutive present values.
pub fn segments<'a, I>(points: I) -> Vec<Vec<(f64, f64)>>
where
    I: IntoIterator<Item = (&'a i64, Option<f64>)>,
{
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (year, value) in points {
        match value {
            Some(v) => current.push((*year as f64, v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    x: (f64, f64),
    y: (f64, f64),
}

impl Bounds {
    /// Axis ranges covering every present value, padded so single points
    /// and flat series still get a visible range. `None` when nothing is present.
    fn of(aligned: &AlignedSeries<i64, String>, include_zero: bool) -> Option<Self> {
        let mut x: Option<(f64, f64)> = None;
        let mut y: Option<(f64, f64)> = None;
        for (year, values) in aligned.rows() {
            for v in values.iter().flatten() {
                let year = *year as f64;
                x = Some(x.map_or((year, year), |(lo, hi)| (lo.min(year), hi.max(year))));
                y = Some(y.map_or((*v, *v), |(lo, hi)| (lo.min(*v), hi.max(*v))));
            }
        }
        let (x, mut y) = (x?, y?);
        if include_zero {
            y = (y.0.min(0.0), y.1.max(0.0));
        }
        Some(Self {
            x: pad(x, 1.0),
            y: pad(y, 1.0),
        })
    }
}

fn pad((lo, hi): (f64, f64), minimum: f64) -> (f64, f64) {
    let margin = ((hi - lo) * 0.05).max(minimum);
    (lo - margin, hi + margin)
}

fn draw_scatter<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    diff: &AlignedSeries<i64, String>,
    title: &str,
    bounds: Bounds,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(25)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(bounds.x.0..bounds.x.1, bounds.y.0..bounds.y.1)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Difference (°C)")
        .x_label_formatter(&|v| format!("{:.0}", v))
        .draw()?;

    chart.draw_series(LineSeries::new(
        vec![(bounds.x.0, 0.0), (bounds.x.1, 0.0)],
        BLACK.stroke_width(1),
    ))?;

    for (idx, name) in diff.series().iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points: Vec<(f64, f64)> = diff
            .groups()
            .zip(diff.column(name).unwrap_or_default())
            .filter_map(|(year, v)| v.map(|v| (*year as f64, v)))
            .collect();

        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, POINT_RADIUS, color.filled())))?
            .label(name.as_str())
            .legend(move |(x, y)| Circle::new((x + 10, y), POINT_RADIUS, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK.mix(0.3))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()
}

fn draw_lines<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    series: &AlignedSeries<i64, String>,
    title: &str,
    bounds: Bounds,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(25)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(bounds.x.0..bounds.x.1, bounds.y.0..bounds.y.1)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Average Temperature (°C)")
        .x_label_formatter(&|v| format!("{:.0}", v))
        .draw()?;

    for (idx, name) in series.series().iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let column = series.column(name).unwrap_or_default();
        let runs = segments(series.groups().zip(column));

        let mut labelled = false;
        for run in runs {
            // A lone point has no line to draw.
            let drawn = if run.len() == 1 {
                chart.draw_series(std::iter::once(Circle::new(run[0], 2, color.filled())))?
            } else {
                chart.draw_series(LineSeries::new(run, color.stroke_width(2)))?
            };
            if !labelled {
                drawn
                    .label(name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
                labelled = true;
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK.mix(0.3))
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::align;
    use crate::model::Observation;
    use std::fs;

    fn obs(year: i64, series: &str, value: Option<f64>) -> Observation<i64, String> {
        Observation::new(year, series.to_string(), value)
    }

    #[test]
    fn test_segments_split_on_missing() {
        let years = [1990, 1991, 1992, 1993, 1994];
        let values = [Some(1.0), None, Some(2.0), Some(3.0), None];
        let runs = segments(years.iter().zip(values));
        assert_eq!(runs, vec![vec![(1990.0, 1.0)], vec![(1992.0, 2.0), (1993.0, 3.0)]]);

        let none: [Option<f64>; 2] = [None, None];
        assert!(segments(years.iter().zip(none)).is_empty());
    }

    #[test]
    fn test_bounds_pad_and_include_zero() {
        let aligned = align(&[obs(2000, "Perth", Some(5.0)), obs(2000, "Hobart", None)]);
        let plain = Bounds::of(&aligned, false).unwrap();
        assert_eq!(plain.x, (1999.0, 2001.0));
        assert_eq!(plain.y, (4.0, 6.0));

        let with_zero = Bounds::of(&aligned, true).unwrap();
        assert!(with_zero.y.0 < 0.0);

        let empty = align(&[obs(2000, "Hobart", None)]);
        assert!(Bounds::of(&empty, true).is_none());
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.svg");
        let empty = align::<i64, String>(&[]);
        render_line_chart(&empty, &path, "Nothing").unwrap();
        render_difference_scatter(&empty, &path, "Nothing").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_line_chart_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cities.svg");
        let aligned = align(&[
            obs(2000, "Beijing", Some(12.0)),
            obs(2001, "Beijing", None),
            obs(2002, "Beijing", Some(12.4)),
            obs(2003, "Beijing", Some(12.9)),
            obs(2000, "Wuhan", Some(17.1)),
        ]);
        render_line_chart(&aligned, &path, "Temperature by City").unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }
}
