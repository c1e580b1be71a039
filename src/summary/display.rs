//! Display formatting for trace summaries.

use super::analyze::TraceSummary;
use std::fmt::Write as _;

/// Render the complete summary to a string.
pub fn render(summary: &TraceSummary) -> String {
    let mut out = String::new();

    render_header(&mut out, summary);
    render_span_breakdown(&mut out, summary);
    render_instants(&mut out, summary);
    render_slowest(&mut out, summary);

    out
}

fn render_header(out: &mut String, summary: &TraceSummary) {
    out.push_str("============================================================\n");
    out.push_str("                   TRACE SPAN SUMMARY\n");
    out.push_str("============================================================\n");
    writeln!(
        out,
        "{} events on {} threads",
        summary.event_count, summary.thread_count
    )
    .unwrap();
    if summary.unmatched > 0 {
        writeln!(out, "{} unmatched begin/end events", summary.unmatched).unwrap();
    }
}

fn render_span_breakdown(out: &mut String, summary: &TraceSummary) {
    out.push_str("\nSPAN BREAKDOWN\n");
    out.push_str("--------------\n");
    writeln!(
        out,
        "{:<24} {:>6} {:>10} {:>8} {:>8} {:>8}",
        "Span", "Count", "Total(ms)", "p50(ms)", "p90(ms)", "Max(ms)"
    )
    .unwrap();
    writeln!(
        out,
        "{:<24} {:>6} {:>10} {:>8} {:>8} {:>8}",
        "------------------------", "------", "----------", "--------", "--------", "--------"
    )
    .unwrap();

    for stat in &summary.span_stats {
        writeln!(
            out,
            "{:<24} {:>6} {:>10.1} {:>8.1} {:>8.1} {:>8.1}",
            truncate(&stat.name, 24),
            stat.count,
            millis(stat.total),
            millis(stat.p50),
            millis(stat.p90),
            millis(stat.max),
        )
        .unwrap();
    }

    writeln!(
        out,
        "{:<24} {:>6} {:>10.1}",
        "TOTAL",
        "",
        millis(summary.total_duration)
    )
    .unwrap();
}

fn render_instants(out: &mut String, summary: &TraceSummary) {
    if summary.instant_counts.is_empty() {
        return;
    }

    out.push_str("\nINSTANT EVENTS\n");
    out.push_str("--------------\n");
    for (name, count) in &summary.instant_counts {
        writeln!(out, "{:<24} {:>6}", truncate(name, 24), count).unwrap();
    }
}

fn render_slowest(out: &mut String, summary: &TraceSummary) {
    out.push_str("\nTOP 10 SLOWEST SPANS\n");
    out.push_str("--------------------\n");

    for (duration, name) in &summary.slowest_spans {
        writeln!(out, "{:>9.1}ms  {}", millis(*duration), truncate(name, 60)).unwrap();
    }
}

fn millis(duration: std::time::Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
