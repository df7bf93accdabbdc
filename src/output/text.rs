//! Plain-text renderings of summaries and hot paths.

use super::json::prepare_output_path;
use crate::aggregator::{HotPath, SummaryMap, SummaryValue, TraceSummary};
use crate::utils::error::OutputError;
use log::info;
use std::fmt::Write as _;
use std::path::Path;

const INDENT: &str = "  ";

/// Render a summary as an indented tree
///
/// Internal nodes print their `[count] id` key, leaves print `id: count`,
/// and each level is indented by two spaces.
pub fn render_summary(summary: &TraceSummary) -> String {
    let mut out = String::new();
    render_map(summary.roots(), 0, &mut out);
    out
}

fn render_map(map: &SummaryMap, depth: usize, out: &mut String) {
    for (key, value) in map.iter() {
        let indent = INDENT.repeat(depth);
        match value {
            SummaryValue::Count(n) => {
                let _ = writeln!(out, "{}{}: {}", indent, key, n);
            }
            SummaryValue::Node(children) => {
                let _ = writeln!(out, "{}{}", indent, key);
                render_map(children, depth + 1, out);
            }
        }
    }
}

/// Write the indented tree rendering of a summary to a file
pub fn write_text(summary: &TraceSummary, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing text summary to: {}", output_path.display());

    prepare_output_path(output_path)?;
    std::fs::write(output_path, render_summary(summary))?;
    Ok(())
}

/// Render hot paths as a table, hottest first
///
/// Long stacks are shortened from the left so the innermost frames stay
/// visible.
pub fn render_hot_paths(paths: &[HotPath]) -> String {
    const STACK_WIDTH: usize = 60;

    let mut lines = Vec::with_capacity(paths.len() + 3);
    lines.push(format!("  {:<width$} | {:>8} | {:>6}", "Call path (hottest first)", "SAMPLES", "%", width = STACK_WIDTH));
    lines.push(format!("  {}", "-".repeat(STACK_WIDTH + 21)));

    for path in paths {
        let chars: Vec<char> = path.stack.chars().collect();
        let display_stack = if chars.len() > STACK_WIDTH {
            let tail: String = chars[chars.len() - (STACK_WIDTH - 3)..].iter().collect();
            format!("...{}", tail)
        } else {
            path.stack.clone()
        };

        lines.push(format!(
            "  {:<width$} | {:>8} | {:>5.1}%",
            display_stack,
            path.samples,
            path.percentage,
            width = STACK_WIDTH
        ));
    }

    if paths.is_empty() {
        lines.push("  (no samples)".to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::TraceAggregator;
    use crate::capture::{KeepAllFrames, Trace};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_summary_indents_two_spaces() {
        let aggregator = TraceAggregator::new(KeepAllFrames);
        aggregator.add_trace(&Trace::from_call_chain(["a", "b"]));
        aggregator.add_trace(&Trace::from_call_chain(["a", "b"]));
        aggregator.add_trace(&Trace::from_call_chain(["a", "c"]));

        let text = render_summary(&aggregator.summary(false));
        let expected = "\
[3] topDown
  [3] a
    b: 2
    c: 1
[3] bottomUp
  [2] b
    a: 2
  [1] c
    a: 1
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_empty_summary() {
        let text = render_summary(&TraceAggregator::default().summary(false));
        assert_eq!(text, "topDown: 0\nbottomUp: 0\n");
    }

    #[test]
    fn test_write_text() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("out/summary.txt");
        let summary = TraceAggregator::default().summary(true);

        write_text(&summary, &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), summary.render_text());
    }

    #[test]
    fn test_render_hot_paths_truncates_long_stacks() {
        let paths = vec![
            HotPath {
                stack: format!("{};leaf", "frame;".repeat(20)),
                samples: 9,
                percentage: 90.0,
            },
            HotPath {
                stack: "main;get".to_string(),
                samples: 1,
                percentage: 10.0,
            },
        ];

        let table = render_hot_paths(&paths);
        let rows: Vec<&str> = table.lines().collect();

        assert_eq!(rows.len(), 4);
        assert!(rows[2].contains("...") && rows[2].contains(";leaf"));
        assert!(rows[2].contains("90.0%"));
        assert!(rows[3].contains("main;get"));
    }

    #[test]
    fn test_render_hot_paths_empty() {
        assert!(render_hot_paths(&[]).ends_with("(no samples)"));
    }
}
