// src/render.rs

use anyhow::{bail, Result};
use plotters::{coord::ranged1d::SegmentValue, prelude::*};
use std::path::Path;
use tracing::{info, warn};

use crate::{config::FigureConfig, summary::SummaryRow};

/// Pastel and muted shades of one blue for the total and overlaid selective bars.
pub const TOTAL_COLOR: RGBColor = RGBColor(0xa1, 0xc9, 0xf4);
pub const SELECTIVE_COLOR: RGBColor = RGBColor(0x48, 0x78, 0xd0);

const FONT: &str = "sans-serif";

/// `202324` → `2023/24`. Anything not shaped like a six-digit academic year is
/// returned as-is.
pub fn academic_year_label(time_period: i64) -> String {
    let s = time_period.to_string();
    if s.len() == 6 && time_period > 0 {
        format!("{}/{}", &s[..4], &s[4..])
    } else {
        s
    }
}

/// Segment index for summary row `row` of `n`: the first row is drawn at the top.
fn segment_for(row: usize, n: usize) -> i32 {
    (n - 1 - row) as i32
}

/// Upper end of the x axis with a little headroom.
fn x_extent(rows: &[SummaryRow]) -> i64 {
    let max = rows
        .iter()
        .map(|r| r.total.max(r.selective))
        .max()
        .unwrap_or(0);
    (max + max / 20).max(1)
}

/// Draw Total and Selective as overlaid horizontal bars, one row per authority, and
/// save the figure as PNG.
#[tracing::instrument(level = "info", skip(rows, figure), fields(path = %path.display(), authorities = rows.len()))]
pub fn render_chart(
    rows: &[SummaryRow],
    time_period: Option<i64>,
    figure: &FigureConfig,
    path: &Path,
) -> Result<()> {
    if rows.is_empty() {
        bail!("no local authorities to plot");
    }
    let n = rows.len();
    let (width, height) = figure.pixel_size();
    let tick_px = figure.font_px(figure.tick_font_pt);
    let label_px = figure.font_px(figure.label_font_pt);
    let legend_px = figure.font_px(figure.legend_font_pt);

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let names: Vec<&str> = rows.iter().map(|r| r.la_name.as_str()).collect();
    let y_label_width = names
        .iter()
        .map(|s| s.chars().count())
        .max()
        .unwrap_or(0) as f64
        * tick_px
        * 0.55
        + label_px * 2.0;

    let mut chart = ChartBuilder::on(&root)
        .margin((label_px * 0.5) as i32)
        .x_label_area_size((label_px * 3.0) as i32)
        .y_label_area_size(y_label_width as i32)
        .build_cartesian_2d(0i64..x_extent(rows), (0..n as i32).into_segmented())?;

    let x_desc = match time_period {
        Some(tp) => format!("Pupil Numbers ({})", academic_year_label(tp)),
        None => "Pupil Numbers".to_string(),
    };
    let y_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(seg) => usize::try_from(n as i32 - 1 - *seg)
            .ok()
            .and_then(|row| names.get(row))
            .map(|s| s.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc(x_desc)
        .y_desc("Local Authority")
        .y_labels(n)
        .y_label_formatter(&y_label)
        .x_label_style((FONT, tick_px).into_font())
        .y_label_style((FONT, tick_px).into_font())
        .axis_desc_style((FONT, label_px).into_font())
        .axis_style(WHITE)
        .light_line_style(WHITE)
        .bold_line_style(BLACK.mix(0.08))
        .draw()?;

    let bar = |value: i64, row: usize, color: RGBColor| {
        let seg = segment_for(row, n);
        let mut rect = Rectangle::new(
            [
                (0, SegmentValue::Exact(seg)),
                (value, SegmentValue::Exact(seg + 1)),
            ],
            color.filled(),
        );
        rect.set_margin(1, 1, 0, 0);
        rect
    };
    let edge = |value: i64, row: usize| {
        let seg = segment_for(row, n);
        let mut rect = Rectangle::new(
            [
                (0, SegmentValue::Exact(seg)),
                (value, SegmentValue::Exact(seg + 1)),
            ],
            WHITE.stroke_width(1),
        );
        rect.set_margin(1, 1, 0, 0);
        rect
    };

    let legend_box = legend_px as i32;
    chart
        .draw_series(rows.iter().enumerate().map(|(i, r)| bar(r.total, i, TOTAL_COLOR)))?
        .label("Total pupils")
        .legend(move |(x, y)| {
            Rectangle::new(
                [(x, y - legend_box / 2), (x + legend_box, y + legend_box / 2)],
                TOTAL_COLOR.filled(),
            )
        });
    chart
        .draw_series(
            rows.iter()
                .enumerate()
                .map(|(i, r)| bar(r.selective, i, SELECTIVE_COLOR)),
        )?
        .label("Pupils in grammars")
        .legend(move |(x, y)| {
            Rectangle::new(
                [(x, y - legend_box / 2), (x + legend_box, y + legend_box / 2)],
                SELECTIVE_COLOR.filled(),
            )
        });
    chart.draw_series(rows.iter().enumerate().map(|(i, r)| edge(r.total, i)))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .label_font((FONT, legend_px).into_font())
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .draw()?;

    root.present()?;
    info!(width, height, dpi = figure.dpi, "chart written");
    Ok(())
}

/// Open a written chart in the system image viewer. Failure only warns; the PNG is
/// already on disk.
pub fn open_in_viewer(path: &Path) -> bool {
    match opener::open(path) {
        Ok(()) => {
            info!(path = %path.display(), "opened chart in viewer");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not open chart in viewer");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_labels() {
        assert_eq!(academic_year_label(202324), "2023/24");
        assert_eq!(academic_year_label(2024), "2024");
        assert_eq!(academic_year_label(-202324), "-202324");
    }

    #[test]
    fn first_row_is_top_segment() {
        assert_eq!(segment_for(0, 3), 2);
        assert_eq!(segment_for(2, 3), 0);
    }

    #[test]
    fn x_extent_covers_largest_total() {
        let rows = vec![SummaryRow::new("Kent", 1500, 5000), SummaryRow::new("Slough", 0, 900)];
        assert_eq!(x_extent(&rows), 5250);
        assert_eq!(x_extent(&[SummaryRow::new("Rutland", 0, 0)]), 1);
    }

    #[test]
    fn empty_summary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_chart(&[], Some(202324), &FigureConfig::default(), &dir.path().join("x.png"));
        assert!(err.is_err());
        assert!(!dir.path().join("x.png").exists());
    }
}
