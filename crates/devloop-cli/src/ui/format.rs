//! Human-readable sizes and the build output table.

use console::Term;
use devloop_hmr::OutputRow;
use owo_colors::OwoColorize;

const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count with base-1024 units and one decimal.
///
/// Halves round up. Zero is reported as `n/a` and anything under 1 KB is
/// printed as whole bytes.
///
/// # Examples
///
/// ```
/// use devloop_cli::ui::convert_bytes;
///
/// assert_eq!(convert_bytes(0), "n/a");
/// assert_eq!(convert_bytes(100), "100 Bytes");
/// assert_eq!(convert_bytes(1024), "1.0 KB");
/// assert_eq!(convert_bytes(1234), "1.2 KB");
/// ```
pub fn convert_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "n/a".to_string();
    }

    let mut exp = 0;
    while exp < UNITS.len() - 1 && bytes >= 1u64 << (10 * (exp + 1)) {
        exp += 1;
    }

    if exp == 0 {
        return format!("{} {}", bytes, UNITS[0]);
    }

    let scaled = bytes as f64 / (1u64 << (10 * exp)) as f64;
    let tenths = (scaled * 10.0).round() as u64;
    format!("{}.{} {}", tenths / 10, tenths % 10, UNITS[exp])
}

/// Print the build output table to stderr. Hidden with `--quiet`.
pub fn print_build_output(rows: &[OutputRow]) {
    if super::is_quiet() {
        return;
    }
    let width = (Term::stderr().size().1 as usize).min(80);
    for line in output_table(rows, width, super::colors_enabled()) {
        eprintln!("{}", line);
    }
}

/// Table lines: title, rule, one line per row, rule.
fn output_table(rows: &[OutputRow], width: usize, colors: bool) -> Vec<String> {
    let title = "Build Output";
    let rule = "─".repeat(width);
    let path_width = rows.iter().map(|r| r.path.len()).max().unwrap_or(0);

    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(if colors {
        format!("\n{}", title.bold().underline())
    } else {
        format!("\n{}", title)
    });
    lines.push(rule.clone());
    for row in rows {
        let path = format!("{:<width$}", row.path, width = path_width);
        lines.push(if colors {
            format!("  {} {}  {}", "▸".blue(), path.bright_white().bold(), row.size.dimmed())
        } else {
            format!("  ▸ {}  {}", path, row.size)
        });
    }
    lines.push(rule);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_bytes_zero() {
        assert_eq!(convert_bytes(0), "n/a");
    }

    #[test]
    fn test_convert_bytes_bytes() {
        assert_eq!(convert_bytes(1), "1 Bytes");
        assert_eq!(convert_bytes(100), "100 Bytes");
        assert_eq!(convert_bytes(1023), "1023 Bytes");
    }

    #[test]
    fn test_convert_bytes_kilobytes() {
        assert_eq!(convert_bytes(1024), "1.0 KB");
        assert_eq!(convert_bytes(1234), "1.2 KB");
        assert_eq!(convert_bytes(1536), "1.5 KB");
        assert_eq!(convert_bytes(10_240), "10.0 KB");
    }

    #[test]
    fn test_convert_bytes_larger_units() {
        assert_eq!(convert_bytes(1_048_576), "1.0 MB");
        assert_eq!(convert_bytes(1_572_864), "1.5 MB");
        assert_eq!(convert_bytes(1_073_741_824), "1.0 GB");
        assert_eq!(convert_bytes(1u64 << 40), "1.0 TB");
    }

    #[test]
    fn test_convert_bytes_clamps_to_terabytes() {
        assert_eq!(convert_bytes(2048u64 << 40), "2048.0 TB");
    }

    #[test]
    fn test_print_build_output() {
        print_build_output(&[OutputRow {
            name: "main.js".to_string(),
            path: "dist/main.js".to_string(),
            size: convert_bytes(15_234),
        }]);
        print_build_output(&[]);
    }

    #[test]
    fn test_output_table_aligns_paths() {
        let row = |path: &str, size: &str| OutputRow {
            name: path.to_string(),
            path: path.to_string(),
            size: size.to_string(),
        };
        let lines = output_table(
            &[row("dist/main.js", "1.2 KB"), row("dist/a.css", "80 Bytes")],
            20,
            false,
        );

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "\nBuild Output");
        assert_eq!(lines[1], "─".repeat(20));
        assert_eq!(lines[2], "  ▸ dist/main.js  1.2 KB");
        assert_eq!(lines[3], "  ▸ dist/a.css    80 Bytes");
    }
}
