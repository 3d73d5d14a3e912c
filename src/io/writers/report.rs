//! Fixed-layout text report of a normalization run.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::stats::CorpusReport;
use crate::error::Result;

/// Format an integer with comma thousands separators.
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn percent(ratio: f64) -> String {
    format!("{:.2}", ratio * 100.0)
}

/// Like `percent` but without trailing zeros: 0.1 -> `10`, 0.075 -> `7.5`.
fn short_percent(ratio: f64) -> String {
    let s = percent(ratio);
    match s.trim_end_matches('0').trim_end_matches('.') {
        "" => "0".to_string(),
        trimmed => trimmed.to_string(),
    }
}

pub fn render_report(report: &CorpusReport) -> String {
    let mut s = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(s, "################ General Statistics ################");
    let _ = writeln!(s, "Total number of images: {}", group_thousands(report.total));
    let _ = writeln!(
        s,
        "Most common size: {} (Ratio: {}%)",
        report.most_common.size,
        percent(report.most_common.ratio)
    );
    let _ = writeln!(s);

    let _ = writeln!(s, "################ Loss Ratios Statistics ################");
    let _ = writeln!(s, "Average area loss ratio: {}%", percent(report.loss.mean));
    let _ = writeln!(s, "Min area loss ratio: {}%", percent(report.loss.min));
    let _ = writeln!(s, "Max area loss ratio: {}%", percent(report.loss.max));
    let _ = writeln!(
        s,
        "Standard deviation of area loss ratio: {}%",
        percent(report.loss.std_dev)
    );
    let _ = writeln!(s);

    let _ = writeln!(s, "################ Sizes Statistics ################");
    let _ = writeln!(s, "{:<20}{:<10}{}", "Size", "Count", "Ratio (%)");
    for bucket in report.buckets.iter().filter(|b| b.count > 0) {
        let _ = writeln!(
            s,
            "{:<20}{:<10}{}",
            bucket.size,
            group_thousands(bucket.count),
            percent(bucket.ratio)
        );
    }

    let _ = writeln!(s);
    let _ = writeln!(
        s,
        "Files with large loss ratio (Top {} or >{}%):",
        report.high_loss_top,
        short_percent(report.high_loss_threshold)
    );
    for entry in &report.high_loss {
        let _ = writeln!(
            s,
            "File: {}, Loss ratio: {}%",
            entry.path.display(),
            percent(entry.loss_ratio)
        );
    }
    s
}

/// Render `report` and write it to `dir/file_name`.
pub fn write_report(dir: &Path, file_name: &str, report: &CorpusReport) -> Result<PathBuf> {
    let path = dir.join(file_name);
    std::fs::write(&path, render_report(report))?;
    info!("Report written to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stats::{HighLossEntry, LossStats, SizeBucket};

    fn sample() -> CorpusReport {
        let big = SizeBucket {
            label: 0,
            centroid: (1088.0, 816.0),
            size: "1088x816".to_string(),
            count: 1500,
            ratio: 0.75,
        };
        let small = SizeBucket {
            label: 1,
            centroid: (640.0, 480.0),
            size: "640x480".to_string(),
            count: 500,
            ratio: 0.25,
        };
        CorpusReport {
            total: 2000,
            most_common: big.clone(),
            loss: LossStats {
                count: 2000,
                mean: 0.0123,
                min: 0.0,
                max: 0.5,
                std_dev: 0.04567,
            },
            buckets: vec![big, small],
            high_loss: vec![HighLossEntry {
                path: PathBuf::from("/data/x.jpg"),
                loss_ratio: 0.5,
            }],
            high_loss_top: 10,
            high_loss_threshold: 0.10,
        }
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn layout_is_fixed() {
        let text = render_report(&sample());
        let expected = "\
################ General Statistics ################
Total number of images: 2,000
Most common size: 1088x816 (Ratio: 75.00%)

################ Loss Ratios Statistics ################
Average area loss ratio: 1.23%
Min area loss ratio: 0.00%
Max area loss ratio: 50.00%
Standard deviation of area loss ratio: 4.57%

################ Sizes Statistics ################
Size                Count     Ratio (%)
1088x816            1,500     75.00
640x480             500       25.00

Files with large loss ratio (Top 10 or >10%):
File: /data/x.jpg, Loss ratio: 50.00%
";
        assert_eq!(text, expected);
    }

    #[test]
    fn configured_threshold_heading() {
        let mut report = sample();
        report.high_loss_threshold = 0.07;
        report.high_loss_top = 5;
        assert!(render_report(&report).contains("Files with large loss ratio (Top 5 or >7%):\n"));
        assert_eq!(short_percent(0.075), "7.5");
        assert_eq!(short_percent(0.0), "0");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), "statistics.txt", &sample()).unwrap();
        assert_eq!(path, dir.path().join("statistics.txt"));
        assert!(std::fs::read_to_string(path).unwrap().contains("Total number of images: 2,000"));
    }
}
