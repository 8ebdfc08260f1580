use clap::{Parser, ValueEnum};
use csv::ReaderBuilder;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mark {
    Min,
    Max,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Render a heatmap of one metric from a sweep CSV"
)]
struct Cli {
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "artifacts/sweep.png")]
    output: PathBuf,
    #[arg(long, default_value = "total_impulse_n_s")]
    metric: String,
    /// Which extreme to mark with a crosshair
    #[arg(long, value_enum, default_value_t = Mark::Max)]
    mark: Mark,
    #[arg(long, default_value_t = 1200)]
    width: u32,
    #[arg(long, default_value_t = 900)]
    height: u32,
    #[arg(long, default_value_t = 12)]
    contour_levels: usize,
}

#[derive(Debug, Clone)]
struct Cell {
    x: f64,
    y: f64,
    metric_value: f64,
}

struct SweepTable {
    x_name: String,
    y_name: String,
    metric_column: String,
    cells: Vec<Cell>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let table = read_cells(&cli.input, &cli.metric)?;

    let mut x_vals: Vec<f64> = table.cells.iter().map(|c| c.x).collect();
    let mut y_vals: Vec<f64> = table.cells.iter().map(|c| c.y).collect();
    x_vals.sort_by(f64::total_cmp);
    x_vals.dedup();
    y_vals.sort_by(f64::total_cmp);
    y_vals.dedup();
    if x_vals.is_empty() || y_vals.is_empty() {
        return Err(anyhow::anyhow!("No sweep cells in the provided CSV"));
    }

    let grid = build_grid(&table.cells, &x_vals, &y_vals);
    let mut min_value = f64::INFINITY;
    let mut max_value = f64::NEG_INFINITY;
    let mut mark_pos: Option<(usize, usize)> = None;
    let mut mark_value = match cli.mark {
        Mark::Min => f64::INFINITY,
        Mark::Max => f64::NEG_INFINITY,
    };
    for (y_idx, row) in grid.iter().enumerate() {
        for (x_idx, &v) in row.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            min_value = min_value.min(v);
            max_value = max_value.max(v);
            let better = match cli.mark {
                Mark::Min => v < mark_value,
                Mark::Max => v > mark_value,
            };
            if better {
                mark_value = v;
                mark_pos = Some((x_idx, y_idx));
            }
        }
    }
    let (mark_x_idx, mark_y_idx) =
        mark_pos.ok_or_else(|| anyhow::anyhow!("Every sweep cell failed; nothing to plot"))?;
    if max_value <= min_value {
        max_value = min_value + min_value.abs().max(1.0) * 1e-3;
    }

    if let Some(parent) = cli.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let root = BitMapBackend::new(&cli.output, (cli.width, cli.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let font_family = select_font_family();
    let caption_font = FontDesc::new(font_family, 24.0, FontStyle::Bold);
    let label_font = FontDesc::new(font_family, 18.0, FontStyle::Normal);

    let legend_width = 140i32;
    let (plot_area, legend_area) =
        root.split_horizontally((cli.width as i32 - legend_width).max(200));

    let x_range = axis_range(&x_vals);
    let y_range = axis_range(&y_vals);
    let levels: Vec<f64> = (0..cli.contour_levels.max(2))
        .map(|i| {
            let t = i as f64 / (cli.contour_levels.max(2) - 1) as f64;
            min_value + t * (max_value - min_value)
        })
        .collect();

    {
        let mut chart = ChartBuilder::on(&plot_area)
            .margin(20)
            .caption(format!("{} sweep", table.metric_column), caption_font)
            .x_label_area_size(60)
            .y_label_area_size(100)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

        chart
            .configure_mesh()
            .x_desc(table.x_name.as_str())
            .y_desc(table.y_name.as_str())
            .label_style(label_font.clone())
            .x_labels(6)
            .y_labels(6)
            .x_label_formatter(&|v| fmt_axis(*v))
            .y_label_formatter(&|v| fmt_axis(*v))
            .draw()?;

        let failed = RGBColor(170, 170, 170);
        for (y_idx, row) in grid.iter().enumerate() {
            let (y0, y1) = cell_bounds(&y_vals, y_idx);
            for (x_idx, &value) in row.iter().enumerate() {
                let (x0, x1) = cell_bounds(&x_vals, x_idx);
                let color = if value.is_finite() {
                    jet_color((value - min_value) / (max_value - min_value))
                } else {
                    failed
                };
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x0, y0), (x1, y1)],
                    color.filled(),
                )))?;
            }
        }

        draw_contours(&mut chart, &grid, &x_vals, &y_vals, &levels)?;

        let x = x_vals[mark_x_idx];
        let y = y_vals[mark_y_idx];
        let marker_color = RGBColor(210, 100, 20);
        let cross_half_width = (x_range.1 - x_range.0) * 0.02;
        let cross_half_height = (y_range.1 - y_range.0) * 0.02;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x - cross_half_width, y), (x + cross_half_width, y)],
            ShapeStyle::from(&marker_color).stroke_width(3),
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, y - cross_half_height), (x, y + cross_half_height)],
            ShapeStyle::from(&marker_color).stroke_width(3),
        )))?;
        let text = format!("{} = {}", table.metric_column, fmt_axis(mark_value));
        chart.draw_series(std::iter::once(Text::new(
            text,
            (x + cross_half_width, y + cross_half_height),
            label_font.clone().color(&BLACK),
        )))?;
    }

    {
        let mut chart = ChartBuilder::on(&legend_area)
            .margin_left(20)
            .margin_right(20)
            .margin_top(30)
            .margin_bottom(30)
            .x_label_area_size(0)
            .y_label_area_size(80)
            .build_cartesian_2d(0.0..1.0, min_value..max_value)?;

        for i in 0..300 {
            let t0 = i as f64 / 300.0;
            let t1 = (i + 1) as f64 / 300.0;
            let v0 = min_value + (max_value - min_value) * t0;
            let v1 = min_value + (max_value - min_value) * t1;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(0.0, v0), (1.0, v1)],
                jet_color(t0).filled(),
            )))?;
        }

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(0)
            .y_labels(6)
            .y_desc(table.metric_column.as_str())
            .y_label_style(label_font.clone())
            .axis_desc_style(label_font.clone())
            .y_label_formatter(&|v| fmt_axis(*v))
            .draw()?;
    }

    root.present()?;
    info!(output = %cli.output.display(), metric = %table.metric_column, "wrote heatmap");
    Ok(())
}

fn select_font_family() -> FontFamily<'static> {
    if cfg!(target_os = "macos") {
        FontFamily::Name("Helvetica")
    } else if cfg!(target_os = "windows") {
        FontFamily::Name("Arial")
    } else {
        FontFamily::Name("DejaVu Sans")
    }
}

/// Read the two axis columns, `status`, and the requested metric. Non-completed cells keep NaN.
fn read_cells(path: &Path, metric_name: &str) -> anyhow::Result<SweepTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    if headers.len() < 4 {
        return Err(anyhow::anyhow!("CSV has too few columns for a sweep matrix"));
    }
    let status_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("status"))
        .ok_or_else(|| anyhow::anyhow!("CSV missing 'status' column"))?;
    let metric_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(metric_name))
        .ok_or_else(|| anyhow::anyhow!("CSV missing metric column matching '{}'", metric_name))?;

    let mut cells = Vec::new();
    for rec in rdr.records() {
        let r = rec?;
        let x: f64 = r.get(0).unwrap_or("").parse().unwrap_or(f64::NAN);
        let y: f64 = r.get(1).unwrap_or("").parse().unwrap_or(f64::NAN);
        let completed = r.get(status_idx).unwrap_or("") == "completed";
        let metric_value = if completed {
            r.get(metric_idx).unwrap_or("").parse().unwrap_or(f64::NAN)
        } else {
            f64::NAN
        };
        if x.is_finite() && y.is_finite() {
            cells.push(Cell { x, y, metric_value });
        }
    }
    Ok(SweepTable {
        x_name: headers[0].to_string(),
        y_name: headers[1].to_string(),
        metric_column: headers[metric_idx].to_string(),
        cells,
    })
}

fn fmt_axis(v: f64) -> String {
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-2..1e5).contains(&magnitude) {
        format!("{v:.2e}")
    } else {
        format!("{v:.3}")
    }
}

fn jet_color(t_in: f64) -> RGBColor {
    let t = t_in.clamp(0.0, 1.0);
    fn comp(v: f64) -> f64 {
        (1.0 - (v - 1.0).abs()).clamp(0.0, 1.0)
    }
    let r = comp(1.5 - 4.0 * (t - 0.75).abs());
    let g = comp(1.5 - 4.0 * (t - 0.5).abs());
    let b = comp(1.5 - 4.0 * (t - 0.25).abs());
    RGBColor((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

fn build_grid(cells: &[Cell], x_vals: &[f64], y_vals: &[f64]) -> Vec<Vec<f64>> {
    let mut grid = vec![vec![f64::NAN; x_vals.len()]; y_vals.len()];
    for cell in cells {
        let Ok(x_idx) = x_vals.binary_search_by(|v| v.total_cmp(&cell.x)) else {
            continue;
        };
        let Ok(y_idx) = y_vals.binary_search_by(|v| v.total_cmp(&cell.y)) else {
            continue;
        };
        grid[y_idx][x_idx] = cell.metric_value;
    }
    grid
}

fn axis_range(values: &[f64]) -> (f64, f64) {
    let (lo, _) = cell_bounds(values, 0);
    let (_, hi) = cell_bounds(values, values.len() - 1);
    (lo, hi)
}

fn draw_contours<DB: DrawingBackend>(
    chart: &mut ChartContext<DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    grid: &[Vec<f64>],
    x_coords: &[f64],
    y_coords: &[f64],
    levels: &[f64],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    if x_coords.len() < 2 || y_coords.len() < 2 {
        return Ok(());
    }
    let line = BLACK.mix(0.6);
    for &level in levels {
        for i in 0..y_coords.len() - 1 {
            for j in 0..x_coords.len() - 1 {
                let values = [grid[i][j], grid[i][j + 1], grid[i + 1][j + 1], grid[i + 1][j]];
                if !values.iter().all(|v| v.is_finite()) {
                    continue;
                }
                let coords = [
                    (x_coords[j], y_coords[i]),
                    (x_coords[j + 1], y_coords[i]),
                    (x_coords[j + 1], y_coords[i + 1]),
                    (x_coords[j], y_coords[i + 1]),
                ];
                for (p1, p2) in marching_square_segments(values, coords, level) {
                    chart.draw_series(std::iter::once(PathElement::new(
                        vec![p1, p2],
                        ShapeStyle::from(&line).stroke_width(1),
                    )))?;
                }
            }
        }
    }
    Ok(())
}

/// Contour segments through one grid square, corners ordered counter-clockwise from (i, j).
fn marching_square_segments(
    values: [f64; 4],
    coords: [(f64, f64); 4],
    level: f64,
) -> Vec<((f64, f64), (f64, f64))> {
    let idx = values
        .iter()
        .enumerate()
        .fold(0u8, |acc, (bit, &v)| if v >= level { acc | (1 << bit) } else { acc });
    if idx == 0 || idx == 15 {
        return Vec::new();
    }

    // Edge e joins corner e to corner (e + 1) % 4.
    let edge_point = |edge: usize| -> (f64, f64) {
        let (a, b) = (edge, (edge + 1) % 4);
        let (va, vb) = (values[a], values[b]);
        let (xa, ya) = coords[a];
        let (xb, yb) = coords[b];
        if (vb - va).abs() < f64::EPSILON {
            return ((xa + xb) * 0.5, (ya + yb) * 0.5);
        }
        let t = (level - va) / (vb - va);
        (xa + t * (xb - xa), ya + t * (yb - ya))
    };

    let pairs: &[(usize, usize)] = match idx {
        1 | 14 => &[(3, 0)],
        2 | 13 => &[(0, 1)],
        3 | 12 => &[(3, 1)],
        4 | 11 => &[(1, 2)],
        5 => &[(3, 2), (0, 1)],
        6 | 9 => &[(0, 2)],
        7 | 8 => &[(3, 2)],
        10 => &[(3, 0), (1, 2)],
        _ => &[],
    };
    pairs
        .iter()
        .map(|&(e1, e2)| (edge_point(e1), edge_point(e2)))
        .collect()
}

fn cell_bounds(coords: &[f64], idx: usize) -> (f64, f64) {
    let center = coords[idx];
    let prev = idx.checked_sub(1).and_then(|i| coords.get(i)).copied();
    let next = coords.get(idx + 1).copied();
    let lone_half = if center != 0.0 { 0.05 * center.abs() } else { 0.5 };

    let left = match (prev, next) {
        (Some(prev), _) => 0.5 * (prev + center),
        (None, Some(next)) => center - 0.5 * (next - center),
        (None, None) => center - lone_half,
    };
    let right = match (prev, next) {
        (_, Some(next)) => 0.5 * (center + next),
        (Some(prev), None) => center + 0.5 * (center - prev),
        (None, None) => center + lone_half,
    };
    (left, right)
}
