//! HTML page and SVG charts.

use itertools::Itertools;

use super::{ChartData, DashboardView, Diagnostics};

const CHART_WIDTH: i64 = 720;
const BAR_HEIGHT: i64 = 22;
const LABEL_WIDTH: i64 = 220;
const LINE_HEIGHT: i64 = 260;
const MARGIN: i64 = 40;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;color:#222}\
    h1{font-size:1.6rem}h2{font-size:1.2rem;margin-top:2rem}\
    form{display:inline-block;margin-right:1rem}\
    .bar{fill:#4c78a8}.line{fill:none;stroke:#f58518;stroke-width:2}\
    .point{fill:#f58518}.muted{color:#777}\
    table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.3rem .6rem}";

/// Escape text for HTML element content and attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Horizontal bar chart, one bar per label in the given order
#[must_use]
pub fn bar_chart(data: &[(String, i64)]) -> String {
    if data.is_empty() {
        return "<p class=\"muted\">No data for this year.</p>".to_string();
    }
    let max = data.iter().map(|(_, n)| *n).max().unwrap_or(1).max(1);
    let plot_width = CHART_WIDTH - LABEL_WIDTH - MARGIN;
    let height = BAR_HEIGHT * i64::try_from(data.len()).unwrap_or(i64::MAX / BAR_HEIGHT);

    let bars = data
        .iter()
        .enumerate()
        .map(|(i, (label, count))| {
            let y = BAR_HEIGHT * i64::try_from(i).unwrap_or_default();
            let width = count * plot_width / max;
            let label = escape_html(label);
            format!(
                "<text x=\"{}\" y=\"{}\" text-anchor=\"end\">{label}</text>\
                 <rect class=\"bar\" x=\"{LABEL_WIDTH}\" y=\"{}\" width=\"{width}\" height=\"{}\">\
                 <title>{label}: {count}</title></rect>\
                 <text x=\"{}\" y=\"{}\">{count}</text>",
                LABEL_WIDTH - 6,
                y + BAR_HEIGHT - 7,
                y + 2,
                BAR_HEIGHT - 4,
                LABEL_WIDTH + width + 4,
                y + BAR_HEIGHT - 7,
            )
        })
        .join("");
    format!(
        "<svg width=\"{CHART_WIDTH}\" height=\"{height}\" font-size=\"12\" role=\"img\">{bars}</svg>"
    )
}

/// Line chart of counts per year, years on the x axis
#[must_use]
pub fn line_chart(data: &[(i32, i64)]) -> String {
    if data.is_empty() {
        return "<p class=\"muted\">No yearly data.</p>".to_string();
    }
    let max = data.iter().map(|(_, n)| *n).max().unwrap_or(1).max(1);
    let steps = i64::try_from(data.len().saturating_sub(1)).unwrap_or_default().max(1);
    let plot_width = CHART_WIDTH - 2 * MARGIN;
    let plot_height = LINE_HEIGHT - 2 * MARGIN;

    let points = data
        .iter()
        .enumerate()
        .map(|(i, (year, count))| {
            let x = MARGIN + i64::try_from(i).unwrap_or_default() * plot_width / steps;
            let y = MARGIN + plot_height - count * plot_height / max;
            (x, y, *year, *count)
        })
        .collect::<Vec<_>>();

    let path = points.iter().map(|(x, y, _, _)| format!("{x},{y}")).join(" ");
    let marks = points
        .iter()
        .map(|(x, y, year, count)| {
            format!(
                "<circle class=\"point\" cx=\"{x}\" cy=\"{y}\" r=\"4\"><title>{year}: {count}</title></circle>\
                 <text x=\"{x}\" y=\"{}\" text-anchor=\"middle\">{count}</text>\
                 <text x=\"{x}\" y=\"{}\" text-anchor=\"middle\">{year}</text>",
                y - 8,
                LINE_HEIGHT - MARGIN / 2,
            )
        })
        .join("");
    format!(
        "<svg width=\"{CHART_WIDTH}\" height=\"{LINE_HEIGHT}\" font-size=\"12\" role=\"img\">\
         <polyline class=\"line\" points=\"{path}\"/>{marks}</svg>"
    )
}

fn year_selector(charts: &ChartData) -> String {
    let options = charts
        .years
        .iter()
        .map(|y| {
            let selected = if *y == charts.year { " selected" } else { "" };
            format!("<option value=\"{y}\"{selected}>{y}</option>")
        })
        .join("");
    format!(
        "<form method=\"get\" action=\"/\"><label>Year \
         <select name=\"year\" onchange=\"this.form.submit()\">{options}</select></label>\
         <noscript><button type=\"submit\">Show</button></noscript></form>"
    )
}

fn refresh_button(year: Option<i32>) -> String {
    let hidden = year
        .map(|y| format!("<input type=\"hidden\" name=\"year\" value=\"{y}\">"))
        .unwrap_or_default();
    format!(
        "<form method=\"post\" action=\"/refresh\">{hidden}\
         <button type=\"submit\">Refresh data</button></form>"
    )
}

fn diagnostics_table(report: &Diagnostics) -> String {
    let rows = report
        .relations
        .iter()
        .map(|status| {
            let rows = match &status.rows {
                Ok(n) => n.to_string(),
                Err(e) => format!("error: {}", escape_html(e)),
            };
            format!(
                "<tr><td>{}</td><td>{:?}</td><td>{rows}</td></tr>",
                escape_html(&status.relation.name),
                status.relation.kind
            )
        })
        .join("");
    let with_year = match &report.rows_with_year {
        Ok(n) => n.to_string(),
        Err(e) => format!("unavailable ({})", escape_html(e)),
    };
    format!(
        "<table><tr><th>Relation</th><th>Kind</th><th>Rows</th></tr>{rows}</table>\
         <p>Rows with a year in the analytics view: {with_year}</p>"
    )
}

fn body(view: &DashboardView) -> String {
    match view {
        DashboardView::Blocked { warehouse_path } => format!(
            "<p>Warehouse not found: <code>{}</code></p>\
             <p>Run the loader and the mart builder first \
             (<code>stages load</code> then <code>stages marts</code>, or <code>stages run</code>).</p>{}",
            escape_html(&warehouse_path.display().to_string()),
            refresh_button(None)
        ),
        DashboardView::Diagnostics { error, report } => {
            let error = error
                .as_ref()
                .map(|e| format!("<p>Query failed: <code>{}</code></p>", escape_html(e)))
                .unwrap_or_else(|| "<p>No year data in the marts.</p>".to_string());
            let report = report
                .as_ref()
                .map(|r| {
                    format!(
                        "<details open><summary>Warehouse relations</summary>{}</details>",
                        diagnostics_table(r)
                    )
                })
                .unwrap_or_default();
            format!(
                "<h2>Diagnostics</h2>{error}{report}\
                 <p>Rebuild the marts (<code>stages marts</code>) and refresh.</p>{}",
                refresh_button(None)
            )
        }
        DashboardView::Charts(charts) => format!(
            "{}{}<h2>Top companies in {year}</h2>{}<h2>Countries in {year}</h2>{}\
             <h2>Internships per year</h2>{}",
            year_selector(charts),
            refresh_button(Some(charts.year)),
            bar_chart(&charts.top_companies),
            bar_chart(&charts.geo),
            line_chart(&charts.trends),
            year = charts.year,
        ),
    }
}

/// Full HTML document for a view
#[must_use]
pub fn render_page(view: &DashboardView) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"fr\"><head><meta charset=\"utf-8\">\
         <title>Stages dashboard</title><style>{STYLE}</style></head>\
         <body><h1>Internships dashboard</h1>{}</body></html>",
        body(view)
    )
}
