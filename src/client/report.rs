use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};

use crate::core::similarity::ScoredCandidate;

/// Printed when nothing clears the threshold
pub const NO_MATCHES: &str = "There are no similar images above the specified threshold.";

const BAR_WIDTH: usize = 30;
const CHART_THUMBNAIL: u32 = 100;
const GRID_THUMBNAIL: u32 = 320;
const GRID_COLUMNS: usize = 4;

// Chart geometry, in SVG user units
const LABEL_WIDTH: f32 = 220.0;
const PLOT_WIDTH: f32 = 640.0;
const ROW_HEIGHT: f32 = 110.0;
const AXIS_MIN: f32 = 0.1;
const AXIS_MAX: f32 = 1.0;

/// Render the ranking as a terminal table.
pub fn render_table(scored: &[ScoredCandidate]) -> String {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Image").fg(Color::White),
        Cell::new("Score").fg(Color::White),
        Cell::new("").fg(Color::White),
    ]);

    for (rank, candidate) in scored.iter().enumerate() {
        let filled = (candidate.score.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&candidate.id),
            Cell::new(format!("{:.2}", candidate.score)),
            Cell::new("█".repeat(filled)).fg(Color::Green),
        ]);
    }

    table.to_string()
}

/// Render a self-contained HTML page with the reference image, a grid of
/// matches and a bar chart of their scores.
///
/// Candidate images are looked up in `dir` by their id.
pub fn render_html(reference: &Path, dir: &Path, scored: &[ScoredCandidate]) -> Result<String> {
    let mut html = String::new();
    html.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Image Similarity</title>\n<style>\n\
         body{font-family:sans-serif;margin:2rem;color:#222}\n\
         .grid{display:grid;grid-template-columns:repeat(4,1fr);gap:1rem}\n\
         figure{margin:0}figure img{width:100%}\n\
         figcaption{font-size:.85rem;text-align:center}\n\
         </style>\n</head>\n<body>\n<h1>Image Similarity</h1>\n",
    );

    let reference_uri = thumbnail_data_uri(reference, GRID_THUMBNAIL)?;
    write!(
        html,
        "<h2>Reference Image</h2>\n<img src=\"{}\" alt=\"{}\">\n",
        reference_uri,
        escape_html(&reference.display().to_string())
    )?;

    if scored.is_empty() {
        writeln!(html, "<p><strong>{}</strong></p>", NO_MATCHES)?;
        html.push_str("</body>\n</html>\n");
        return Ok(html);
    }

    html.push_str("<h2>Similar Images</h2>\n<div class=\"grid\">\n");
    for row in scored.chunks(GRID_COLUMNS) {
        for candidate in row {
            let uri = thumbnail_data_uri(&dir.join(&candidate.id), GRID_THUMBNAIL)?;
            let name = escape_html(&candidate.id);
            writeln!(
                html,
                "<figure><img src=\"{}\" alt=\"{}\"><figcaption>{} (Similarity Score: {:.2})</figcaption></figure>",
                uri, name, name, candidate.score
            )?;
        }
    }
    html.push_str("</div>\n");

    html.push_str("<h2>Similarity Score Chart</h2>\n");
    html.push_str(&render_chart(dir, scored)?);
    html.push_str("</body>\n</html>\n");

    Ok(html)
}

fn render_chart(dir: &Path, scored: &[ScoredCandidate]) -> Result<String> {
    let width = LABEL_WIDTH + PLOT_WIDTH + CHART_THUMBNAIL as f32;
    let height = ROW_HEIGHT * scored.len() as f32 + 40.0;
    let x_of = |score: f32| {
        let t = (score.clamp(AXIS_MIN, AXIS_MAX) - AXIS_MIN) / (AXIS_MAX - AXIS_MIN);
        LABEL_WIDTH + t * PLOT_WIDTH
    };

    let mut svg = String::new();
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = width,
        h = height
    )?;

    for (row, candidate) in scored.iter().enumerate() {
        let top = row as f32 * ROW_HEIGHT;
        let middle = top + ROW_HEIGHT / 2.0;
        let end = x_of(candidate.score);
        let (r, g, b) = viridis(1.0 - candidate.score.clamp(0.0, 1.0));
        let name = escape_html(&candidate.id);
        let uri = thumbnail_data_uri(&dir.join(&candidate.id), CHART_THUMBNAIL)?;

        writeln!(
            svg,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"end\" dominant-baseline=\"middle\" font-size=\"12\">{}</text>",
            LABEL_WIDTH - 8.0,
            middle,
            name
        )?;
        writeln!(
            svg,
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"rgb({},{},{})\"/>",
            LABEL_WIDTH,
            top + 10.0,
            (end - LABEL_WIDTH).max(0.0),
            ROW_HEIGHT - 20.0,
            r,
            g,
            b
        )?;
        writeln!(
            svg,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"end\" dominant-baseline=\"middle\" fill=\"white\" font-size=\"12\">{:.2}</text>",
            (end - 6.0).max(LABEL_WIDTH + 30.0),
            middle,
            candidate.score
        )?;
        writeln!(
            svg,
            "<image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"xMinYMid meet\"/>",
            uri,
            end + 6.0,
            top + 5.0,
            CHART_THUMBNAIL,
            CHART_THUMBNAIL
        )?;
    }

    // x axis
    let axis_y = ROW_HEIGHT * scored.len() as f32 + 10.0;
    writeln!(
        svg,
        "<line x1=\"{}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"#888\"/>",
        LABEL_WIDTH,
        LABEL_WIDTH + PLOT_WIDTH,
        y = axis_y
    )?;
    for tick in 1..=10 {
        let value = tick as f32 / 10.0;
        writeln!(
            svg,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"10\">{:.1}</text>",
            x_of(value),
            axis_y + 16.0,
            value
        )?;
    }
    svg.push_str("</svg>\n");

    Ok(svg)
}

/// Encode a downscaled copy of the image at `path` as a PNG data URI.
pub fn thumbnail_data_uri(path: &Path, max_side: u32) -> Result<String> {
    let img = image::open(path).with_context(|| format!("cannot open image {}", path.display()))?;
    let thumb = image::DynamicImage::ImageRgb8(img.thumbnail(max_side, max_side).to_rgb8());

    let mut bytes = Vec::new();
    thumb
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .context("cannot encode thumbnail")?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&bytes)))
}

/// Sample the (approximate) viridis colour map at `t` in `[0, 1]`.
fn viridis(t: f32) -> (u8, u8, u8) {
    const STOPS: [(f32, f32, f32); 5] = [
        (68.0, 1.0, 84.0),
        (59.0, 82.0, 139.0),
        (33.0, 145.0, 140.0),
        (94.0, 201.0, 98.0),
        (253.0, 231.0, 37.0),
    ];

    let scaled = t.clamp(0.0, 1.0) * (STOPS.len() - 1) as f32;
    let idx = (scaled.floor() as usize).min(STOPS.len() - 2);
    let frac = scaled - idx as f32;
    let (a, b) = (STOPS[idx], STOPS[idx + 1]);
    let lerp = |x: f32, y: f32| (x + (y - x) * frac).round() as u8;

    (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
