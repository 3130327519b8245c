use chrono::{DateTime, SecondsFormat, Utc};
use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use crate::types::{GroupReport, IoPattern, Reduction, SizeCheck};

fn style_figure() -> Style {
    Style::new().cyan().bold()
}

/// Human-readable summary printed once for the whole group.
pub fn format_text(report: &GroupReport) -> String {
    let mut out = String::new();
    let Some(reporter) = report.reporter() else {
        return out;
    };

    let ranks = report.participants.len();
    let figure = format!("{:.6}", reporter.timing.seconds);
    out.push_str(&format!(
        "\nFile stat time: {} sec\n",
        figure.if_supports_color(Stream::Stdout, |s| s.style(style_figure()))
    ));

    let detail = format!(
        "({} over {} rank{}, pattern {}{})",
        reporter.timing.reduction,
        ranks,
        if ranks == 1 { "" } else { "s" },
        report.pattern,
        if report.shuffle && report.pattern == IoPattern::PerProcessFile {
            ", shuffled"
        } else {
            ""
        },
    );
    out.push_str(
        &detail
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
            .to_string(),
    );
    out.push('\n');

    if let Some(check) = reporter.size_check {
        out.push_str(&format_size_check(check, ranks));
        out.push('\n');
    }

    out
}

fn format_size_check(check: SizeCheck, ranks: usize) -> String {
    match check {
        SizeCheck::Consistent { bytes } => format!(
            "File size {} bytes, consistent across {} rank{}",
            bytes,
            ranks,
            if ranks == 1 { "" } else { "s" }
        )
        .if_supports_color(Stream::Stdout, |s| s.green())
        .to_string(),
        SizeCheck::Mismatch { min, max } => {
            format!("File size mismatch across ranks: min {} bytes, max {} bytes", min, max)
                .if_supports_color(Stream::Stdout, |s| s.red())
                .to_string()
        }
        SizeCheck::Unavailable => "File size unavailable: no rank completed stat"
            .if_supports_color(Stream::Stdout, |s| s.yellow())
            .to_string(),
    }
}

/// One line per failed participant, for stderr.
pub fn format_failures(report: &GroupReport) -> String {
    let mut out = String::new();
    for p in report.failures() {
        if let Err(reason) = &p.outcome {
            let prefix = "ERROR"
                .if_supports_color(Stream::Stderr, |s| s.red())
                .to_string();
            out.push_str(&format!("{} - rank {}: {}\n", prefix, p.rank, reason));
        }
    }
    out
}

#[derive(Serialize)]
struct JsonFailure {
    rank: usize,
    path: String,
    error: String,
}

/// JSON output format.
#[derive(Serialize)]
struct JsonReport {
    pattern: IoPattern,
    shuffle: bool,
    ranks: usize,
    reduction: Option<Reduction>,
    elapsed_sec: Option<f64>,
    size_check: Option<SizeCheck>,
    failures: Vec<JsonFailure>,
    timestamp: String,
}

pub fn format_json(report: &GroupReport, now: DateTime<Utc>) -> String {
    let reporter = report.reporter();
    let json = JsonReport {
        pattern: report.pattern,
        shuffle: report.shuffle,
        ranks: report.participants.len(),
        reduction: reporter.map(|r| r.timing.reduction),
        elapsed_sec: reporter.map(|r| r.timing.seconds),
        size_check: reporter.and_then(|r| r.size_check),
        failures: report
            .failures()
            .map(|p| JsonFailure {
                rank: p.rank,
                path: p.path.to_string_lossy().to_string(),
                error: p.outcome.as_ref().err().cloned().unwrap_or_default(),
            })
            .collect(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregateTiming, FileMetadata, ParticipantReport};
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn participant(rank: usize, seconds: f64, ok: bool, check: Option<SizeCheck>) -> ParticipantReport {
        let path = PathBuf::from(format!("/mnt/bench/testfile.nn.{}", rank));
        ParticipantReport {
            rank,
            outcome: if ok {
                Ok(FileMetadata {
                    size: 8,
                    is_file: true,
                    modified: None,
                })
            } else {
                Err(format!("stat({}) failed: No such file or directory", path.display()))
            },
            path,
            timing: AggregateTiming {
                label: "stat".to_string(),
                seconds,
                reduction: Reduction::Max,
            },
            size_check: check,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn text_has_fixed_precision_figure() {
        let report = GroupReport {
            pattern: IoPattern::SharedFile,
            shuffle: false,
            participants: vec![
                participant(0, 0.5, true, Some(SizeCheck::Consistent { bytes: 8 })),
                participant(1, 0.5, true, Some(SizeCheck::Consistent { bytes: 8 })),
            ],
        };
        let out = format_text(&report);
        assert!(out.contains("File stat time: 0.500000 sec"));
        assert!(out.contains("max over 2 ranks, pattern n1"));
        assert!(out.contains("File size 8 bytes, consistent across 2 ranks"));
    }

    #[test]
    fn text_marks_shuffled_per_process_runs() {
        let report = GroupReport {
            pattern: IoPattern::PerProcessFile,
            shuffle: true,
            participants: vec![participant(0, 0.000123, true, None)],
        };
        let out = format_text(&report);
        assert!(out.contains("0.000123"));
        assert!(out.contains("over 1 rank, pattern nn, shuffled"));
        assert!(!out.contains("File size"));
    }

    #[test]
    fn text_reports_mismatch() {
        let report = GroupReport {
            pattern: IoPattern::SharedFile,
            shuffle: false,
            participants: vec![participant(0, 0.1, true, Some(SizeCheck::Mismatch { min: 1, max: 9 }))],
        };
        assert!(format_text(&report).contains("min 1 bytes, max 9 bytes"));
    }

    #[test]
    fn empty_group_formats_nothing() {
        let report = GroupReport {
            pattern: IoPattern::SharedFile,
            shuffle: false,
            participants: vec![],
        };
        assert!(format_text(&report).is_empty());
    }

    #[test]
    fn failures_listed_per_rank() {
        let report = GroupReport {
            pattern: IoPattern::PerProcessFile,
            shuffle: false,
            participants: vec![
                participant(0, 0.1, true, None),
                participant(1, 0.1, false, None),
                participant(2, 0.1, false, None),
            ],
        };
        let out = format_failures(&report);
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("rank 1: stat(/mnt/bench/testfile.nn.1) failed"));
        assert!(out.contains("rank 2:"));
    }

    #[test]
    fn json_schema() {
        let report = GroupReport {
            pattern: IoPattern::PerProcessFile,
            shuffle: true,
            participants: vec![participant(0, 0.25, true, None), participant(1, 0.25, false, None)],
        };
        let parsed: serde_json::Value = serde_json::from_str(&format_json(&report, fixed_now())).unwrap();
        assert_eq!(parsed["pattern"], "nn");
        assert_eq!(parsed["shuffle"], true);
        assert_eq!(parsed["ranks"], 2);
        assert_eq!(parsed["reduction"], "max");
        assert_eq!(parsed["elapsed_sec"], 0.25);
        assert!(parsed["size_check"].is_null());
        assert_eq!(parsed["failures"][0]["rank"], 1);
        assert_eq!(parsed["failures"][0]["path"], "/mnt/bench/testfile.nn.1");
        assert_eq!(parsed["timestamp"], "2026-03-01T12:00:00Z");
    }

    #[test]
    fn json_size_check_tagged() {
        let report = GroupReport {
            pattern: IoPattern::SharedFile,
            shuffle: false,
            participants: vec![participant(0, 0.25, true, Some(SizeCheck::Consistent { bytes: 8 }))],
        };
        let parsed: serde_json::Value = serde_json::from_str(&format_json(&report, fixed_now())).unwrap();
        assert_eq!(parsed["size_check"]["status"], "consistent");
        assert_eq!(parsed["size_check"]["bytes"], 8);
    }
}
