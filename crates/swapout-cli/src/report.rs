//! Text and JSON rendering for both binaries

use std::fmt::Write;

use serde::Serialize;
use swapout_core::{RunReport, StopReason, SwappedProcess, SystemSwap};

/// One-line outcome of a swapout run
pub fn run_summary(report: &RunReport) -> String {
    let mut line = format!(
        "swapout: PID {} {} after {} sample{}",
        report.pid,
        report.stop,
        report.samples,
        if report.samples == 1 { "" } else { "s" }
    );

    if let Some(sample) = report.last_sample {
        let _ = write!(
            line,
            " (RSS {} kB, swap {} kB)",
            sample.resident_kb, sample.swapped_kb
        );
    }

    if !report.restored {
        line.push_str("; limit NOT restored");
    }
    if !report.removed {
        line.push_str("; cgroup left in place");
    }

    line
}

/// Whether the summary should be highlighted as a problem
pub fn needs_attention(report: &RunReport) -> bool {
    !report.restored || matches!(report.stop, StopReason::TimedOut | StopReason::Cancelled)
}

/// `PID SWAP(kB) CMD`
pub fn render_simple(list: &[SwappedProcess]) -> String {
    let mut out = format!("{:<7} {:<10} {}\n", "PID", "SWAP(kB)", "CMD");
    for p in list {
        let _ = writeln!(out, "{:<7} {:<10} {}", p.pid, p.swap_kb, p.cmd);
    }
    out
}

/// `PID SWAP(kB) RSS(kB) VSZ(kB) CMD`
pub fn render_full(list: &[SwappedProcess]) -> String {
    let mut out = format!(
        "{:<7} {:<10} {:<10} {:<10} {}\n",
        "PID", "SWAP(kB)", "RSS(kB)", "VSZ(kB)", "CMD"
    );
    for p in list {
        let _ = writeln!(
            out,
            "{:<7} {:<10} {:<10} {:<10} {}",
            p.pid, p.swap_kb, p.rss_kb, p.vsz_kb, p.cmd
        );
    }
    out
}

pub fn render_table(list: &[SwappedProcess], full: bool) -> String {
    if full {
        render_full(list)
    } else {
        render_simple(list)
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    #[serde(flatten)]
    swap: SystemSwap,
    processes: &'a [SwappedProcess],
}

/// JSON snapshot: system swap totals plus every swapped process
pub fn render_json(swap: SystemSwap, list: &[SwappedProcess]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Snapshot {
        swap,
        processes: list,
    })
}

/// Header shown above each top-mode refresh
pub fn top_header(timestamp: &str, swap: &SystemSwap) -> String {
    format!(
        "swapmon - processes with swapped pages   {}\nSystem swap: used {} kB / total {} kB\n",
        timestamp,
        swap.used_kb(),
        swap.swap_total_kb
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use swapout_core::{CgroupVersion, ProcessMemorySample};

    fn report(stop: StopReason, samples: u32) -> RunReport {
        RunReport {
            pid: 4242,
            version: CgroupVersion::V2,
            stop,
            samples,
            last_sample: Some(ProcessMemorySample {
                pid: 4242,
                resident_kb: 12000,
                swapped_kb: 8000,
            }),
            restored: true,
            removed: true,
        }
    }

    fn process(pid: u32, swap_kb: u64, cmd: &str) -> SwappedProcess {
        SwappedProcess {
            pid,
            name: cmd.split_whitespace().next().unwrap_or("").to_string(),
            swap_kb,
            rss_kb: 1024,
            vsz_kb: 65536,
            cmd: cmd.to_string(),
        }
    }

    #[test]
    fn test_run_summary() {
        let line = run_summary(&report(StopReason::Converged, 2));
        assert_eq!(
            line,
            "swapout: PID 4242 converged after 2 samples (RSS 12000 kB, swap 8000 kB)"
        );
        assert!(!needs_attention(&report(StopReason::Converged, 2)));
    }

    #[test]
    fn test_run_summary_flags_leftovers() {
        let mut r = report(StopReason::TimedOut, 1);
        r.restored = false;
        r.removed = false;
        r.last_sample = None;

        let line = run_summary(&r);
        assert_eq!(
            line,
            "swapout: PID 4242 timed out after 1 sample; limit NOT restored; cgroup left in place"
        );
        assert!(needs_attention(&r));
    }

    #[test]
    fn test_render_simple() {
        let out = render_simple(&[process(812, 20480, "firefox -P default")]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "PID     SWAP(kB)   CMD");
        assert_eq!(lines[1], "812     20480      firefox -P default");
    }

    #[test]
    fn test_render_full() {
        let out = render_table(&[process(9, 64, "sshd")], true);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "PID     SWAP(kB)   RSS(kB)    VSZ(kB)    CMD");
        assert_eq!(lines[1], "9       64         1024       65536      sshd");
    }

    #[test]
    fn test_render_json() {
        let swap = SystemSwap {
            swap_total_kb: 1000,
            swap_free_kb: 400,
        };
        let json = render_json(swap, &[process(9, 64, "say \"hi\"")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["swap_total_kb"], 1000);
        assert_eq!(value["swap_free_kb"], 400);
        assert_eq!(value["processes"][0]["pid"], 9);
        assert_eq!(value["processes"][0]["cmd"], "say \"hi\"");
        assert_eq!(value["processes"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_top_header() {
        let swap = SystemSwap {
            swap_total_kb: 1000,
            swap_free_kb: 400,
        };
        let header = top_header("2025-01-01 12:00:00", &swap);
        assert!(header.starts_with("swapmon - processes with swapped pages   2025-01-01 12:00:00"));
        assert!(header.contains("used 600 kB / total 1000 kB"));
    }
}
