//! Standalone HTML reports with an inline SVG burndown chart.

use super::generator::open_issue_label;
use super::{AddonReport, BurndownReport};
use crate::addons::{it_works_url, report_bug_url, Addon, AddonSettings, BugRef, Compatibility};
use crate::analysis::summary_text;
use crate::models::TimeSeries;
use crate::pipeline::{Burndown, BurndownOutcome};
use anyhow::Result;
use std::fmt::Write;

// https://www.mozilla.org/en-US/styleguide/identity/firefox/color/
const FIREFOX_LIGHT_ORANGE: &str = "#FF9500";
const FIREFOX_LIGHT_BLUE: &str = "#0095DD";
const FIREFOX_DARK_BLUE_GREY1: &str = "#424F5A";
const FIREFOX_LIGHT_BLUE_GREY2: &str = "#D4DDE4";

const CHART_WIDTH: f64 = 900.0;
const CHART_HEIGHT: f64 = 360.0;
const MARGIN_LEFT: f64 = 50.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 40.0;

/// Generate a complete HTML burndown page.
pub fn generate_burndown_html(report: &BurndownReport) -> Result<String> {
    let mut output = String::new();
    let mut generator = HtmlGenerator::new(&mut output, &report.title);

    generator.write_header()?;
    generator.write_body_start()?;
    match report.outcome {
        BurndownOutcome::NoResults => generator.write_no_results()?,
        BurndownOutcome::Chart(ref burndown) => {
            generator.write_chart(burndown)?;
            generator.write_forecast(burndown)?;
            generator.write_open_issues(burndown)?;
        }
    }
    generator.write_footer()?;

    Ok(output)
}

/// Generate a complete HTML add-on compatibility page.
pub fn generate_addons_html(report: &AddonReport, settings: &AddonSettings) -> Result<String> {
    let mut output = String::new();
    let mut generator = HtmlGenerator::new(&mut output, &report.title);

    generator.write_header()?;
    generator.write_body_start()?;
    generator.write_addon_table(report, settings)?;
    generator.write_footer()?;

    Ok(output)
}

struct HtmlGenerator<'a, W: Write> {
    writer: &'a mut W,
    title: &'a str,
}

impl<'a, W: Write> HtmlGenerator<'a, W> {
    fn new(writer: &'a mut W, title: &'a str) -> Self {
        Self { writer, title }
    }

    fn write_header(&mut self) -> Result<()> {
        writeln!(self.writer, "<!DOCTYPE html>")?;
        writeln!(self.writer, "<html lang=\"en\">")?;
        writeln!(self.writer, "<head>")?;
        writeln!(self.writer, "<meta charset=\"UTF-8\">")?;
        writeln!(self.writer, "<title>{}</title>", html_escape(self.title))?;
        writeln!(self.writer, "<style>")?;
        writeln!(self.writer, "body {{ font-family: sans-serif; color: {}; margin: 2em; }}", FIREFOX_DARK_BLUE_GREY1)?;
        writeln!(self.writer, "#chart svg {{ border: 1px solid {}; }}", FIREFOX_LIGHT_BLUE_GREY2)?;
        writeln!(self.writer, ".forecast {{ white-space: pre-line; }}")?;
        writeln!(self.writer, "a.open-bugzilla {{ display: block; margin-top: 1em; font-weight: bold; }}")?;
        writeln!(self.writer, "table {{ border-collapse: collapse; }}")?;
        writeln!(self.writer, "td, th {{ padding: 0.3em 0.8em; text-align: left; }}")?;
        writeln!(self.writer, "tr.success {{ background: #dff0d8; }}")?;
        writeln!(self.writer, "tr.warning {{ background: #fcf8e3; }}")?;
        writeln!(self.writer, "tr.danger {{ background: #f2dede; }}")?;
        writeln!(self.writer, "</style>")?;
        writeln!(self.writer, "</head>")?;
        Ok(())
    }

    fn write_body_start(&mut self) -> Result<()> {
        writeln!(self.writer, "<body>")?;
        writeln!(self.writer, "<h1>{}</h1>", html_escape(self.title))?;
        Ok(())
    }

    fn write_no_results(&mut self) -> Result<()> {
        writeln!(self.writer, "<div id=\"chart\">Zarro boogs found</div>")?;
        Ok(())
    }

    fn write_chart(&mut self, burndown: &Burndown) -> Result<()> {
        writeln!(self.writer, "<div id=\"chart\">")?;
        write_svg_chart(self.writer, &burndown.series, burndown.weight.unit())?;
        writeln!(self.writer, "</div>")?;
        Ok(())
    }

    fn write_forecast(&mut self, burndown: &Burndown) -> Result<()> {
        let text = summary_text(&burndown.forecast, burndown.weight.unit());
        writeln!(self.writer, "<h2>Forecast</h2>")?;
        writeln!(self.writer, "<p class=\"forecast\">{}</p>", html_escape(&text))?;
        Ok(())
    }

    fn write_open_issues(&mut self, burndown: &Burndown) -> Result<()> {
        writeln!(self.writer, "<h2>Open Bugs</h2>")?;
        writeln!(self.writer, "<div id=\"bugs\">")?;
        for open in &burndown.open_issues {
            writeln!(
                self.writer,
                "<div><a href=\"{}\">{}</a></div>",
                html_escape(&open.url),
                html_escape(&open_issue_label(open))
            )?;
        }
        if !burndown.open_issues.is_empty() {
            writeln!(
                self.writer,
                "<a class=\"open-bugzilla\" href=\"{}\">Open bug list in Bugzilla</a>",
                html_escape(&burndown.open_list_url)
            )?;
        }
        writeln!(self.writer, "</div>")?;
        Ok(())
    }

    fn write_addon_table(&mut self, report: &AddonReport, settings: &AddonSettings) -> Result<()> {
        if report.table.is_empty() {
            writeln!(self.writer, "<p>No add-ons found in the spreadsheet.</p>")?;
            return Ok(());
        }

        writeln!(self.writer, "<table>")?;
        writeln!(self.writer, "<thead><tr><th>Add-on</th><th>Status</th><th>Bug</th></tr></thead>")?;
        writeln!(self.writer, "<tbody id=\"tbody\">")?;
        for addon in report.table.rows() {
            let style = match addon.compatibility {
                Compatibility::Compatible => "success",
                Compatibility::Unknown => "warning",
                Compatibility::Incompatible => "danger",
            };
            writeln!(
                self.writer,
                "<tr class=\"{}\"><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td></tr>",
                style,
                html_escape(&addon.amo_url),
                html_escape(&addon.name),
                addon.compatibility.label(),
                addon_bug_cell(addon, settings)
            )?;
        }
        writeln!(self.writer, "</tbody>")?;
        writeln!(self.writer, "</table>")?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        writeln!(
            self.writer,
            "<footer><small>Report generated by burndown v{}</small></footer>",
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(self.writer, "</body>")?;
        writeln!(self.writer, "</html>")?;
        Ok(())
    }
}

fn addon_bug_cell(addon: &Addon, settings: &AddonSettings) -> String {
    match (addon.bug, addon.bug_url.as_deref()) {
        (BugRef::Filed(id), Some(url)) => {
            let style = if addon.compatibility == Compatibility::Compatible {
                " style=\"text-decoration:line-through\""
            } else {
                ""
            };
            format!("<a href=\"{}\"{}>bug {}</a>", html_escape(url), style, id)
        }
        (BugRef::Filed(id), None) => format!("bug {}", id),
        (BugRef::NoBug, _) => "no bug".to_string(),
        (BugRef::Unfiled, _) => {
            let mut cell = format!(
                "<a href=\"{}\">Report bug</a>",
                html_escape(&report_bug_url(&addon.name, settings))
            );
            if let Some(url) = it_works_url(&addon.name, settings) {
                cell.push_str(&format!(" or <a href=\"{}\">it works</a>", html_escape(&url)));
            }
            cell
        }
    }
}

/// Draw closed (bottom) and open (stacked on top) as step areas.
fn write_svg_chart<W: Write>(writer: &mut W, series: &TimeSeries, unit: &str) -> Result<()> {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_height;

    let dates = series.dates();
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return Ok(());
    };
    let span_days = (*last - *first).num_days().max(1) as f64;

    let closed: Vec<f64> = series.closed_counts().iter().map(|&c| c as f64).collect();
    let stacked: Vec<f64> = series
        .open_counts()
        .iter()
        .zip(&closed)
        .map(|(&open, &closed)| closed + open.max(0) as f64)
        .collect();
    let y_max = stacked.iter().copied().fold(1.0, f64::max);

    let xs: Vec<f64> = dates
        .iter()
        .map(|date| MARGIN_LEFT + (*date - *first).num_days() as f64 / span_days * plot_width)
        .collect();
    let y = |value: f64| baseline - value / y_max * plot_height;

    let zeros = vec![0.0; xs.len()];
    let closed_area = step_polygon(&xs, &zeros, &closed, MARGIN_LEFT + plot_width, &y);
    let open_area = step_polygon(&xs, &closed, &stacked, MARGIN_LEFT + plot_width, &y);

    writeln!(
        writer,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">",
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    )?;
    writeln!(
        writer,
        "<polygon class=\"closed\" fill=\"{}\" points=\"{}\"><title>Closed {}</title></polygon>",
        FIREFOX_LIGHT_BLUE, closed_area, unit
    )?;
    writeln!(
        writer,
        "<polygon class=\"open\" fill=\"{}\" points=\"{}\"><title>Open {}</title></polygon>",
        FIREFOX_LIGHT_ORANGE, open_area, unit
    )?;

    // Axes and labels
    writeln!(
        writer,
        "<line x1=\"{l}\" y1=\"{b}\" x2=\"{r}\" y2=\"{b}\" stroke=\"{c}\"/><line x1=\"{l}\" y1=\"{t}\" x2=\"{l}\" y2=\"{b}\" stroke=\"{c}\"/>",
        l = MARGIN_LEFT,
        r = MARGIN_LEFT + plot_width,
        t = MARGIN_TOP,
        b = baseline,
        c = FIREFOX_DARK_BLUE_GREY1
    )?;
    writeln!(
        writer,
        "<text x=\"{}\" y=\"{}\" font-size=\"12\" text-anchor=\"end\">{}</text>",
        MARGIN_LEFT - 5.0,
        MARGIN_TOP + 12.0,
        y_max
    )?;
    writeln!(
        writer,
        "<text x=\"{}\" y=\"{}\" font-size=\"12\">{}</text>",
        MARGIN_LEFT,
        baseline + 20.0,
        first.format("%Y-%m-%d")
    )?;
    writeln!(
        writer,
        "<text x=\"{}\" y=\"{}\" font-size=\"12\" text-anchor=\"end\">{}</text>",
        MARGIN_LEFT + plot_width,
        baseline + 20.0,
        last.format("%Y-%m-%d")
    )?;
    writeln!(
        writer,
        "<text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"{}\">&#9632; Open {}</text>",
        MARGIN_LEFT + 10.0,
        MARGIN_TOP + 12.0,
        FIREFOX_LIGHT_ORANGE,
        unit
    )?;
    writeln!(
        writer,
        "<text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"{}\">&#9632; Closed {}</text>",
        MARGIN_LEFT + 10.0,
        MARGIN_TOP + 28.0,
        FIREFOX_LIGHT_BLUE,
        unit
    )?;
    writeln!(writer, "</svg>")?;

    Ok(())
}

/// Polygon points for a step area between `bottoms` and `tops`.
///
/// Each value holds until the next point; the last one extends to `x_end`.
fn step_polygon(
    xs: &[f64],
    bottoms: &[f64],
    tops: &[f64],
    x_end: f64,
    y: &dyn Fn(f64) -> f64,
) -> String {
    let n = xs.len();
    let next_x = |i: usize| if i + 1 < n { xs[i + 1] } else { x_end };
    let mut points = Vec::with_capacity(n * 4);

    for i in 0..n {
        points.push((xs[i], y(tops[i])));
        points.push((next_x(i), y(tops[i])));
    }
    for i in (0..n).rev() {
        points.push((next_x(i), y(bottoms[i])));
        points.push((xs[i], y(bottoms[i])));
    }

    points
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
