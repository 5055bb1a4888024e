// src/render/svg.rs
//! Inline SVG charts. Every function returns a self-contained `<svg>` element.
use std::fmt::Write;

use super::escape_html;
use crate::{
    format,
    geo::GeoCollection,
    views::{ranking::Bar, DualAxisChart, GroupedBarChart, LineChart, MapChart},
};

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 360.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_RIGHT: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;
const MARGIN_LEFT: f64 = 70.0;

const AXIS: &str = "#9ca3af";
const MUTED: &str = "#6b7280";
const NO_DATA_FILL: &str = "#e5e7eb";

/// Categorical colours for series, cycled.
const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

/// ColorBrewer Blues, light to dark.
const BLUES: [[u8; 3]; 9] = [
    [247, 251, 255],
    [222, 235, 247],
    [198, 219, 239],
    [158, 202, 225],
    [107, 174, 214],
    [66, 146, 198],
    [33, 113, 181],
    [8, 81, 156],
    [8, 48, 107],
];

pub fn series_color(i: usize) -> &'static str {
    PALETTE[i % PALETTE.len()]
}

/// Colour at `t` in `[0, 1]` along the Blues scale.
pub fn blues(t: f64) -> String {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (BLUES.len() - 1) as f64;
    let lo = (pos.floor() as usize).min(BLUES.len() - 1);
    let hi = (lo + 1).min(BLUES.len() - 1);
    let frac = pos - lo as f64;
    let channel = |i: usize| {
        let a = BLUES[lo][i] as f64;
        let b = BLUES[hi][i] as f64;
        (a + (b - a) * frac).round() as u8
    };
    format!("#{:02x}{:02x}{:02x}", channel(0), channel(1), channel(2))
}

/// Map `v` from `[d0, d1]` onto `[r0, r1]`; a degenerate domain maps to the middle.
fn scale(v: f64, (d0, d1): (f64, f64), (r0, r1): (f64, f64)) -> f64 {
    if (d1 - d0).abs() < f64::EPSILON {
        return (r0 + r1) / 2.0;
    }
    r0 + (v - d0) / (d1 - d0) * (r1 - r0)
}

/// Value domain for bars, always including zero.
fn bar_domain(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((0.0, 0.0), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn svg_open(out: &mut String, width: f64, height: f64) {
    let _ = write!(
        out,
        r##"<svg class="chart" viewBox="0 0 {w} {h}" width="100%" preserveAspectRatio="xMidYMid meet" xmlns="http://www.w3.org/2000/svg">"##,
        w = width,
        h = height
    );
}

fn y_ticks(out: &mut String, domain: (f64, f64), x: f64, anchor: &str, color: &str) {
    for i in 0..=4 {
        let v = domain.0 + (domain.1 - domain.0) * i as f64 / 4.0;
        let y = scale(v, domain, (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP));
        let _ = write!(
            out,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="{}" font-size="10" fill="{}">{}</text>"##,
            x,
            y + 3.0,
            anchor,
            color,
            compact(v)
        );
    }
}

fn axes(out: &mut String) {
    let base = HEIGHT - MARGIN_BOTTOM;
    let _ = write!(
        out,
        r##"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="{c}"/><line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="{c}"/>"##,
        l = MARGIN_LEFT,
        r = WIDTH - MARGIN_RIGHT,
        t = MARGIN_TOP,
        b = base,
        c = AXIS
    );
}

/// Rotated category label under the x axis.
fn x_label(out: &mut String, x: f64, text: &str) {
    let y = HEIGHT - MARGIN_BOTTOM + 12.0;
    let _ = write!(
        out,
        r##"<text x="{x:.1}" y="{y:.1}" text-anchor="end" font-size="10" fill="{c}" transform="rotate(-40, {x:.1}, {y:.1})">{t}</text>"##,
        x = x,
        y = y,
        c = MUTED,
        t = escape_html(text)
    );
}

/// `(label, colour)` swatches along the top edge.
fn legend<'a>(out: &mut String, entries: impl IntoIterator<Item = (&'a str, &'a str)>) {
    for (i, (label, color)) in entries.into_iter().enumerate() {
        let x = MARGIN_LEFT + i as f64 * 200.0;
        let _ = write!(
            out,
            r##"<rect x="{:.1}" y="8" width="10" height="10" fill="{}"/><text x="{:.1}" y="17" font-size="11" fill="#374151">{}</text>"##,
            x,
            color,
            x + 14.0,
            escape_html(label)
        );
    }
}

fn series_legend(out: &mut String, labels: &[String]) {
    legend(
        out,
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), series_color(i))),
    );
}

/// Short axis label: `1,2M`, `35,0k`, `12,5`.
fn compact(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0).replace('.', ",")
    } else if abs >= 10_000.0 {
        format!("{:.1}k", v / 1_000.0).replace('.', ",")
    } else {
        format!("{:.1}", v).replace('.', ",")
    }
}

/// Equirectangular projection of the shapes in `geo`, shaded by `chart`.
pub fn choropleth(chart: &MapChart, geo: &GeoCollection) -> String {
    let mut out = String::new();
    let width = WIDTH;
    let height = 520.0;
    svg_open(&mut out, width, height + 40.0);

    let Some(bounds) = geo.bounds() else {
        out.push_str("</svg>");
        return out;
    };
    let span_lon = (bounds.max_lon - bounds.min_lon).max(f64::EPSILON);
    let span_lat = (bounds.max_lat - bounds.min_lat).max(f64::EPSILON);
    let k = (width / span_lon).min(height / span_lat);
    let dx = (width - span_lon * k) / 2.0;
    let dy = (height - span_lat * k) / 2.0;
    let project =
        |p: &[f64; 2]| (dx + (p[0] - bounds.min_lon) * k, dy + (bounds.max_lat - p[1]) * k);

    for shape in geo.shapes() {
        let area = chart.areas.iter().find(|a| a.code == shape.code);
        let (fill, tooltip) = match area {
            Some(a) => (
                blues(scale(a.value, (chart.min, chart.max), (0.0, 1.0))),
                format!("{}: {}", a.region, format::two_decimals(Some(a.value))),
            ),
            None => (NO_DATA_FILL.to_string(), format!("{}: {}", shape.code, format::NOT_AVAILABLE)),
        };
        let mut d = String::new();
        for ring in shape.geometry.rings() {
            for (i, p) in ring.iter().enumerate() {
                let (x, y) = project(p);
                let _ = write!(d, "{}{:.1},{:.1}", if i == 0 { "M" } else { "L" }, x, y);
            }
            d.push('Z');
        }
        let _ = write!(
            out,
            r##"<path d="{}" fill="{}" fill-opacity="{}" stroke="#ffffff" stroke-width="0.8" data-code="{}"><title>{}</title></path>"##,
            d,
            fill,
            chart.opacity,
            escape_html(&shape.code),
            escape_html(&tooltip)
        );
    }

    // legend: gradient bar with min and max
    let _ = write!(
        out,
        r##"<defs><linearGradient id="blues-legend">{stops}</linearGradient></defs><rect x="{x}" y="{y}" width="240" height="10" fill="url(#blues-legend)"/><text x="{x}" y="{ty}" font-size="10" fill="{c}">{min}</text><text x="{xr}" y="{ty}" font-size="10" text-anchor="end" fill="{c}">{max}</text><text x="{xm}" y="{tt}" font-size="11" text-anchor="middle" fill="#374151">{title}</text>"##,
        stops = (0..=4)
            .map(|i| format!(
                r##"<stop offset="{}%" stop-color="{}"/>"##,
                i * 25,
                blues(i as f64 / 4.0)
            ))
            .collect::<String>(),
        x = width - 260.0,
        xr = width - 20.0,
        xm = width - 140.0,
        y = height + 10.0,
        ty = height + 32.0,
        tt = height + 6.0,
        c = MUTED,
        min = format::two_decimals(Some(chart.min)),
        max = format::two_decimals(Some(chart.max)),
        title = escape_html(&chart.legend_title),
    );
    out.push_str("</svg>");
    out
}

/// Horizontal bars, one per region, in the given order.
pub fn horizontal_bars(bars: &[Bar], color: &str) -> String {
    let mut out = String::new();
    let row = 26.0;
    let label_w = 130.0;
    let width = 420.0;
    let height = row * bars.len().max(1) as f64 + 10.0;
    svg_open(&mut out, width, height);

    let domain = bar_domain(bars.iter().map(|b| b.value));
    let range = (label_w, width - 70.0);
    let zero = scale(0.0, domain, range);
    for (i, bar) in bars.iter().enumerate() {
        let y = 5.0 + i as f64 * row;
        let x = scale(bar.value, domain, range);
        let _ = write!(
            out,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11" fill="#374151">{}</text><rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {}</title></rect><text x="{:.1}" y="{:.1}" font-size="10" fill="{}">{}</text>"##,
            label_w - 6.0,
            y + row * 0.6,
            escape_html(&bar.region),
            zero.min(x),
            y + 3.0,
            (x - zero).abs(),
            row - 8.0,
            color,
            escape_html(&bar.region),
            format::two_decimals(Some(bar.value)),
            zero.max(x) + 4.0,
            y + row * 0.6,
            MUTED,
            format::two_decimals(Some(bar.value)),
        );
    }
    out.push_str("</svg>");
    out
}

/// One line per series over the years, with markers. Missing values break the line.
pub fn line_chart(chart: &LineChart) -> String {
    let mut out = String::new();
    svg_open(&mut out, WIDTH, HEIGHT);

    let years = extent(chart.points.iter().map(|p| p.year as f64)).unwrap_or((0.0, 1.0));
    let values = extent(chart.points.iter().filter_map(|p| p.value)).unwrap_or((0.0, 1.0));
    let x_range = (MARGIN_LEFT + 10.0, WIDTH - MARGIN_RIGHT - 10.0);
    let y_range = (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP);

    axes(&mut out);
    y_ticks(&mut out, values, MARGIN_LEFT - 6.0, "end", MUTED);
    let mut seen_years: Vec<i64> = chart.points.iter().map(|p| p.year).collect();
    seen_years.sort_unstable();
    seen_years.dedup();
    for year in seen_years {
        x_label(&mut out, scale(year as f64, years, x_range), &year.to_string());
    }

    for (i, series) in chart.series.iter().enumerate() {
        let color = series_color(i);
        let mut d = String::new();
        let mut pen_down = false;
        let mut markers = String::new();
        for p in chart.series_points(series) {
            let Some(v) = p.value else {
                pen_down = false;
                continue;
            };
            let x = scale(p.year as f64, years, x_range);
            let y = scale(v, values, y_range);
            let _ = write!(d, "{}{:.1},{:.1}", if pen_down { "L" } else { "M" }, x, y);
            pen_down = true;
            let _ = write!(
                markers,
                r##"<circle cx="{:.1}" cy="{:.1}" r="3.5" fill="{}"><title>{} {}: {}</title></circle>"##,
                x,
                y,
                color,
                escape_html(series),
                p.year,
                format::two_decimals(Some(v))
            );
        }
        let _ = write!(
            out,
            r##"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>{}"##,
            d, color, markers
        );
    }
    series_legend(&mut out, &chart.series);
    out.push_str("</svg>");
    out
}

/// Vertical bars grouped by region, one colour per metric.
pub fn grouped_bars(chart: &GroupedBarChart) -> String {
    let mut out = String::new();
    svg_open(&mut out, WIDTH, HEIGHT);

    let domain = bar_domain(chart.bars.iter().filter_map(|b| b.value));
    let y_range = (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP);
    let zero = scale(0.0, domain, y_range);
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let group_w = plot_w / chart.regions.len().max(1) as f64;
    let bar_w = group_w * 0.8 / chart.metrics.len().max(1) as f64;

    axes(&mut out);
    y_ticks(&mut out, domain, MARGIN_LEFT - 6.0, "end", MUTED);
    for (r, region) in chart.regions.iter().enumerate() {
        x_label(&mut out, MARGIN_LEFT + group_w * (r as f64 + 0.5), region);
    }
    for bar in &chart.bars {
        let (Some(r), Some(m), Some(v)) = (
            chart.regions.iter().position(|x| *x == bar.region),
            chart.metrics.iter().position(|x| *x == bar.metric),
            bar.value,
        ) else {
            continue;
        };
        let x = MARGIN_LEFT + group_w * r as f64 + group_w * 0.1 + bar_w * m as f64;
        let y = scale(v, domain, y_range);
        let _ = write!(
            out,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{} - {}: {}</title></rect>"##,
            x,
            zero.min(y),
            bar_w,
            (zero - y).abs(),
            series_color(m),
            escape_html(&bar.region),
            escape_html(&bar.metric),
            format::two_decimals(Some(v))
        );
    }
    series_legend(&mut out, &chart.metrics);
    out.push_str("</svg>");
    out
}

/// Bars for the first metric on the left axis, a line with markers for the
/// second metric on an independent right axis.
pub fn dual_axis(chart: &DualAxisChart) -> String {
    let mut out = String::new();
    svg_open(&mut out, WIDTH, HEIGHT);

    let left = bar_domain(chart.points.iter().map(|p| p.first));
    let right = extent(chart.points.iter().map(|p| p.second)).unwrap_or((0.0, 1.0));
    let y_range = (HEIGHT - MARGIN_BOTTOM, MARGIN_TOP);
    let zero = scale(0.0, left, y_range);
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let slot = plot_w / chart.points.len().max(1) as f64;
    let bar_color = series_color(0);
    let line_color = series_color(3);

    axes(&mut out);
    let _ = write!(
        out,
        r##"<line x1="{r}" y1="{t}" x2="{r}" y2="{b}" stroke="{c}"/>"##,
        r = WIDTH - MARGIN_RIGHT,
        t = MARGIN_TOP,
        b = HEIGHT - MARGIN_BOTTOM,
        c = AXIS
    );
    y_ticks(&mut out, left, MARGIN_LEFT - 6.0, "end", bar_color);
    y_ticks(&mut out, right, WIDTH - MARGIN_RIGHT + 6.0, "start", line_color);

    let mut d = String::new();
    let mut markers = String::new();
    for (i, p) in chart.points.iter().enumerate() {
        let cx = MARGIN_LEFT + slot * (i as f64 + 0.5);
        let y = scale(p.first, left, y_range);
        let _ = write!(
            out,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" opacity="0.8"><title>{} - {}: {}</title></rect>"##,
            cx - slot * 0.35,
            zero.min(y),
            slot * 0.7,
            (zero - y).abs(),
            bar_color,
            escape_html(&p.region),
            escape_html(&chart.first_label),
            format::two_decimals(Some(p.first))
        );
        x_label(&mut out, cx, &p.region);

        let ly = scale(p.second, right, y_range);
        let _ = write!(d, "{}{:.1},{:.1}", if i == 0 { "M" } else { "L" }, cx, ly);
        let _ = write!(
            markers,
            r##"<circle cx="{:.1}" cy="{:.1}" r="3.5" fill="{}"><title>{} - {}: {}</title></circle>"##,
            cx,
            ly,
            line_color,
            escape_html(&p.region),
            escape_html(&chart.second_label),
            format::two_decimals(Some(p.second))
        );
    }
    let _ = write!(
        out,
        r##"<path d="{}" fill="none" stroke="{}" stroke-width="2"/>{}"##,
        d, line_color, markers
    );
    legend(
        &mut out,
        [
            (chart.first_label.as_str(), bar_color),
            (chart.second_label.as_str(), line_color),
        ],
    );
    out.push_str("</svg>");
    out
}
