//! Event log correlation
//!
//! The controller reports run outcome only through its event log. These
//! functions take the log read after a run, cut it down to the entries newer
//! than the baseline captured before start, and extract the failure verdict and
//! the result log filename from them.

use crate::error::MotionProgramError;
use crate::transport::{EventLogEntry, Severity};
use crate::Result;
use regex::Regex;
use std::sync::OnceLock;

/// Event code carried by the result log file markers
pub const LOG_FILE_EVENT_CODE: u32 = 80003;

const LOG_FILE_OPENED: &str = "motion program log file opened";
const LOG_FILE_CLOSED: &str = "motion program log file closed";
const PROGRAM_FAILED: &str = "motion program failed";

/// Sequence numbers are 16 bit. A baseline above this combined with an entry
/// below [`WRAP_LOW`] means the counter wrapped during the run.
const WRAP_HIGH: u32 = 61440;
const WRAP_LOW: u32 = 4096;

fn log_filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(log-[\d-]+\.bin)").expect("valid log filename regex"))
}

/// Whether an entry with `seqnum` was written after the baseline `prev_seqnum`
pub fn is_after_baseline(prev_seqnum: u32, seqnum: u32) -> bool {
    seqnum > prev_seqnum || (prev_seqnum > WRAP_HIGH && seqnum < WRAP_LOW)
}

/// Keep the leading run of entries newer than the baseline.
///
/// `log` is newest first, so scanning stops at the first entry that predates
/// the baseline. The returned slice keeps the newest-first order.
pub fn entries_after_baseline(log: &[EventLogEntry], prev_seqnum: u32) -> &[EventLogEntry] {
    let end = log
        .iter()
        .position(|e| !is_after_baseline(prev_seqnum, e.seqnum))
        .unwrap_or(log.len());
    &log[..end]
}

fn first_arg_is(entry: &EventLogEntry, marker: &str) -> bool {
    entry
        .args
        .first()
        .map(|a| a.eq_ignore_ascii_case(marker))
        .unwrap_or(false)
}

/// Scan every entry for a reported failure.
///
/// An error-or-worse entry carrying the failure marker yields
/// [`MotionProgramError::ControllerFailure`] with the controller's own text.
/// Any fatal entry without it yields [`MotionProgramError::ProgramFailed`].
/// All entries are inspected before deciding.
pub fn check_for_failure(entries: &[EventLogEntry]) -> Result<()> {
    let mut marker_message: Option<String> = None;
    let mut fatal = false;

    for entry in entries {
        if entry.severity >= Severity::Error
            && marker_message.is_none()
            && first_arg_is(entry, PROGRAM_FAILED)
        {
            marker_message = Some(entry.args[1..].join(" "));
        }
        if entry.severity >= Severity::Fatal {
            fatal = true;
        }
    }

    if let Some(message) = marker_message {
        return Err(MotionProgramError::ControllerFailure(message));
    }
    if fatal {
        return Err(MotionProgramError::ProgramFailed);
    }
    Ok(())
}

/// Locate the result log filename from the opened/closed marker pair.
///
/// Entries are walked oldest first. A closed marker only counts once an opened
/// marker has been seen.
pub fn find_result_log_file(entries: &[EventLogEntry]) -> Result<String> {
    let mut filename: Option<String> = None;
    let mut closed = false;

    for entry in entries.iter().rev() {
        if entry.code != LOG_FILE_EVENT_CODE {
            continue;
        }

        if first_arg_is(entry, LOG_FILE_CLOSED) && filename.is_some() {
            if closed {
                return Err(MotionProgramError::correlation(
                    "Found more than one log closed message",
                    entries,
                ));
            }
            closed = true;
        }

        if first_arg_is(entry, LOG_FILE_OPENED) {
            if filename.is_some() {
                return Err(MotionProgramError::correlation(
                    "Found more than one log opened message",
                    entries,
                ));
            }
            let found = entry
                .args
                .get(1)
                .and_then(|arg| log_filename_regex().captures(arg))
                .map(|caps| caps[1].to_string());
            match found {
                Some(name) => filename = Some(name),
                None => {
                    return Err(MotionProgramError::correlation(
                        "Invalid log opened message",
                        entries,
                    ))
                }
            }
        }
    }

    match filename {
        Some(name) if closed => Ok(name),
        _ => Err(MotionProgramError::MissingResultLog {
            entries: entries.to_vec(),
        }),
    }
}

/// Full post-run correlation: filter against the baseline, fail on reported
/// errors, then return the result log filename
pub fn locate_result_file(log: &[EventLogEntry], prev_seqnum: u32) -> Result<String> {
    let entries = entries_after_baseline(log, prev_seqnum);
    check_for_failure(entries)?;
    find_result_log_file(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(seqnum: u32, severity: Severity, code: u32, args: &[&str]) -> EventLogEntry {
        EventLogEntry {
            seqnum,
            severity,
            code,
            timestamp: String::new(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn opened(seqnum: u32) -> EventLogEntry {
        entry(
            seqnum,
            Severity::Info,
            LOG_FILE_EVENT_CODE,
            &[LOG_FILE_OPENED, "HOME:/log-2022-06-01-12-30-45-1234.bin"],
        )
    }

    fn closed(seqnum: u32) -> EventLogEntry {
        entry(seqnum, Severity::Info, LOG_FILE_EVENT_CODE, &[LOG_FILE_CLOSED])
    }

    #[test]
    fn test_wraparound_baseline() {
        assert!(is_after_baseline(65000, 10));
        assert!(!is_after_baseline(100, 50));
        assert!(!is_after_baseline(100, 100));
        assert!(is_after_baseline(100, 101));
        assert!(!is_after_baseline(61440, 10));
    }

    #[test]
    fn test_entries_after_baseline_stops_at_old_entry() {
        let log = vec![
            entry(12, Severity::Info, 1, &[]),
            entry(5, Severity::Info, 1, &[]),
            entry(3, Severity::Info, 1, &[]),
            entry(11, Severity::Info, 1, &[]),
        ];
        let kept = entries_after_baseline(&log, 4);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].seqnum, 5);
    }

    #[test]
    fn test_entries_after_baseline_across_wrap() {
        let log = vec![
            entry(2, Severity::Info, 1, &[]),
            entry(65535, Severity::Info, 1, &[]),
            entry(65000, Severity::Info, 1, &[]),
        ];
        let kept = entries_after_baseline(&log, 65000);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_single_marker_pair() {
        // newest first
        let log = vec![closed(22), entry(21, Severity::Info, 10002, &["x"]), opened(20)];
        let name = find_result_log_file(&log).unwrap();
        assert_eq!(name, "log-2022-06-01-12-30-45-1234.bin");
    }

    #[test]
    fn test_two_opened_markers() {
        let log = vec![opened(21), opened(20)];
        let err = find_result_log_file(&log).unwrap_err();
        match err {
            MotionProgramError::Correlation { message, entries } => {
                assert!(message.contains("opened"));
                assert_eq!(entries.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_two_closed_markers() {
        let log = vec![closed(22), closed(21), opened(20)];
        assert!(matches!(
            find_result_log_file(&log),
            Err(MotionProgramError::Correlation { .. })
        ));
    }

    #[test]
    fn test_no_markers() {
        let log = vec![entry(20, Severity::Info, 10002, &["running"])];
        assert!(matches!(
            find_result_log_file(&log),
            Err(MotionProgramError::MissingResultLog { .. })
        ));
        assert!(matches!(
            find_result_log_file(&[]),
            Err(MotionProgramError::MissingResultLog { .. })
        ));
    }

    #[test]
    fn test_closed_before_opened_is_ignored() {
        // A stray closed marker older than the opened one does not count
        let log = vec![opened(21), closed(20)];
        assert!(matches!(
            find_result_log_file(&log),
            Err(MotionProgramError::MissingResultLog { .. })
        ));
    }

    #[test]
    fn test_opened_without_filename() {
        let log = vec![
            closed(21),
            entry(20, Severity::Info, LOG_FILE_EVENT_CODE, &[LOG_FILE_OPENED, "HOME:/none"]),
        ];
        assert!(matches!(
            find_result_log_file(&log),
            Err(MotionProgramError::Correlation { .. })
        ));
    }

    #[test]
    fn test_markers_case_insensitive() {
        let log = vec![
            entry(21, Severity::Info, LOG_FILE_EVENT_CODE, &["Motion Program Log File Closed"]),
            entry(
                20,
                Severity::Info,
                LOG_FILE_EVENT_CODE,
                &["Motion Program Log File Opened", "log-1-2.bin"],
            ),
        ];
        assert_eq!(find_result_log_file(&log).unwrap(), "log-1-2.bin");
    }

    #[test]
    fn test_failure_marker_message() {
        let log = vec![entry(
            30,
            Severity::Error,
            80004,
            &["Motion Program Failed", "joint", "out", "of", "range"],
        )];
        match check_for_failure(&log) {
            Err(MotionProgramError::ControllerFailure(msg)) => {
                assert_eq!(msg, "joint out of range")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_marker_wins_over_later_fatal() {
        let log = vec![
            entry(31, Severity::Fatal, 50000, &["collision"]),
            entry(30, Severity::Error, 80004, &["motion program failed", "a", "b", "c", "d"]),
        ];
        assert!(matches!(
            check_for_failure(&log),
            Err(MotionProgramError::ControllerFailure(_))
        ));
    }

    #[test]
    fn test_fatal_without_marker() {
        let log = vec![
            entry(31, Severity::Info, 10, &["ok"]),
            entry(30, Severity::Fatal, 50000, &["collision"]),
        ];
        assert!(matches!(check_for_failure(&log), Err(MotionProgramError::ProgramFailed)));
    }

    #[test]
    fn test_locate_ignores_markers_before_baseline() {
        // markers from a previous run sit behind the baseline entry
        let log = vec![
            entry(41, Severity::Info, 10, &["idle"]),
            entry(40, Severity::Info, 10, &["baseline"]),
            closed(39),
            opened(38),
        ];
        assert!(matches!(
            locate_result_file(&log, 40),
            Err(MotionProgramError::MissingResultLog { .. })
        ));

        let log = vec![closed(42), opened(41), entry(40, Severity::Fatal, 1, &["old"])];
        assert_eq!(
            locate_result_file(&log, 40).unwrap(),
            "log-2022-06-01-12-30-45-1234.bin"
        );
    }

    #[test]
    fn test_marker_ignored_at_info() {
        let log = vec![entry(30, Severity::Info, 80004, &["motion program failed", "x"])];
        assert!(check_for_failure(&log).is_ok());
        assert!(check_for_failure(&[opened(1), closed(2)]).is_ok());
    }
}
