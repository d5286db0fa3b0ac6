use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::constants::{DEMO_PROCESSES, DEMO_TRACE};
use crate::error::{Result, VmError};
use crate::memory::Frame;
use crate::page_table::Mapping;
use crate::replay::ProcessReport;

/// One process of a workload: identity, size in bytes and its access trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub pid: u32,
    pub size: usize,
    pub trace: Vec<usize>,
}

/// Processes to replay, in file order.
///
/// Format: one process per line, `<pid> <size> <page> <page> ...`. Blank
/// lines and lines starting with `#` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    pub processes: Vec<ProcessSpec>,
}

impl Workload {
    /// Read and parse a workload file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse workload text; errors carry the 1-based line number
    pub fn parse(content: &str) -> Result<Self> {
        let mut processes = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            processes.push(Self::parse_line(line, index + 1)?);
        }
        Ok(Workload { processes })
    }

    fn parse_line(line: &str, number: usize) -> Result<ProcessSpec> {
        let parse_err = |message: String| VmError::Parse { line: number, message };
        let mut tokens = line.split_whitespace();

        let pid_token = tokens.next().ok_or_else(|| parse_err("missing process id".into()))?;
        let pid: u32 = pid_token
            .parse()
            .map_err(|_| parse_err(format!("invalid process id: {}", pid_token)))?;
        if pid == 0 {
            return Err(parse_err("process id 0 is reserved".into()));
        }

        let size_token = tokens.next().ok_or_else(|| parse_err("missing process size".into()))?;
        let size: usize = size_token
            .parse()
            .map_err(|_| parse_err(format!("invalid process size: {}", size_token)))?;

        let trace = tokens
            .map(|token| {
                token
                    .parse::<usize>()
                    .map_err(|_| parse_err(format!("invalid page index: {}", token)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ProcessSpec { pid, size, trace })
    }

    /// The two-process demo run when no workload file is given
    pub fn demo() -> Self {
        let processes = DEMO_PROCESSES
            .iter()
            .map(|&(pid, size)| ProcessSpec { pid, size, trace: DEMO_TRACE.to_vec() })
            .collect();
        Workload { processes }
    }
}

/// Render per-process results plus pool occupancy as plain text
pub fn format_report(reports: &[ProcessReport], frames: &[Frame]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(out, "Process {}", report.pid);
        let _ = writeln!(out, "  accesses: {}", report.accesses);
        let _ = writeln!(out, "  page faults: {}", report.faults);
        let _ = writeln!(out, "  hits: {}", report.hits);
        if !report.rejected.is_empty() {
            let _ = writeln!(out, "  rejected: {}", join(&report.rejected));
        }
        let _ = writeln!(out, "  resident (oldest first): {}", join(&report.resident));
        for (page, mapping) in &report.page_table {
            if let Mapping::Mapped(frame) = mapping {
                let _ = writeln!(out, "  page {} => frame {}", page, frame);
            }
        }
    }
    for frame in frames {
        if let Some(owner) = frame.owner {
            let _ = writeln!(out, "frame {} occupied by process {}", frame.number, owner);
        }
    }
    out
}

fn join(values: &[usize]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

pub fn write_report<P: AsRef<Path>>(path: P, reports: &[ProcessReport], frames: &[Frame]) -> Result<()> {
    fs::write(path.as_ref(), format_report(reports, frames))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessId;

    #[test]
    fn test_parse_workload() {
        let content = "# demo\n1 200 7 0 1 2\n\n2 250 3 3\n";
        let workload = Workload::parse(content).unwrap();
        assert_eq!(workload.processes.len(), 2);
        assert_eq!(
            workload.processes[0],
            ProcessSpec { pid: 1, size: 200, trace: vec![7, 0, 1, 2] }
        );
        assert_eq!(workload.processes[1].trace, vec![3, 3]);
    }

    #[test]
    fn test_parse_process_without_trace() {
        let workload = Workload::parse("4 16").unwrap();
        assert!(workload.processes[0].trace.is_empty());
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = Workload::parse("1 200 7\nx 10").unwrap_err();
        assert!(matches!(err, VmError::Parse { line: 2, .. }));

        let err = Workload::parse("1").unwrap_err();
        assert!(err.to_string().contains("missing process size"));

        let err = Workload::parse("0 200 1").unwrap_err();
        assert!(err.to_string().contains("reserved"));

        let err = Workload::parse("1 200 7 -3").unwrap_err();
        assert!(err.to_string().contains("invalid page index: -3"));
    }

    #[test]
    fn test_demo_workload() {
        let workload = Workload::demo();
        assert_eq!(workload.processes.len(), 2);
        assert_eq!(workload.processes[0].size, 200);
        assert_eq!(workload.processes[1].size, 250);
        assert_eq!(workload.processes[1].trace.len(), 15);
    }

    #[test]
    fn test_format_report() {
        let pid = ProcessId::new(1).unwrap();
        let report = ProcessReport {
            pid,
            accesses: 3,
            faults: 2,
            hits: 1,
            rejected: vec![],
            resident: vec![4, 0],
            page_table: vec![(0, Mapping::Mapped(3)), (1, Mapping::Unmapped), (4, Mapping::Mapped(6))],
        };
        let frames = vec![
            Frame { number: 3, owner: Some(pid) },
            Frame { number: 5, owner: None },
        ];
        let text = format_report(&[report], &frames);
        assert!(text.contains("page faults: 2"));
        assert!(text.contains("resident (oldest first): 4 0"));
        assert!(text.contains("page 0 => frame 3"));
        assert!(!text.contains("page 1 =>"));
        assert!(text.contains("frame 3 occupied by process 1"));
        assert!(!text.contains("frame 5"));
    }
}
