//! Controller transport abstraction
//!
//! The orchestrator never talks HTTP itself. Anything that can query execution
//! state, move files on the controller ramdisk, read the event log and touch
//! I/O signals can drive it: a web services client, a simulator, or a scripted
//! fake in tests. Blocking and async flavours are provided.

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Names of the I/O signals shared with the controller-side executor
pub mod signals {
    /// Analog output: command number at which to switch to the preempting program
    pub const PREEMPT_CMD_NUM: &str = "motion_program_preempt_cmd_num";
    /// Analog output: number of the requested preemption
    pub const PREEMPT: &str = "motion_program_preempt";
    /// Analog input: command number currently executing
    pub const CURRENT_CMD_NUM: &str = "motion_program_current_cmd_num";
    /// Analog input: command number most recently queued by the look-ahead
    pub const QUEUED_CMD_NUM: &str = "motion_program_queued_cmd_num";
    /// Analog input: preemption currently in effect
    pub const PREEMPT_CURRENT: &str = "motion_program_preempt_current";
    /// Digital output: end a long running EGM command
    pub const STOP_EGM: &str = "motion_program_stop_egm";
    /// Digital output: enable motion logging
    pub const LOG_MOTION: &str = "motion_program_log_motion";
}

/// Controller program execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Stopped,
}

/// Program cycle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleMode {
    Once,
    Forever,
    AsIs,
}

impl fmt::Display for CycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleMode::Once => "once",
            CycleMode::Forever => "forever",
            CycleMode::AsIs => "asis",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub run_state: RunState,
    pub cycle: CycleMode,
}

/// Controller power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorState {
    Init,
    MotorOn,
    MotorOff,
    GuardStop,
    EmergencyStop,
    EmergencyStopReset,
    SysFail,
}

/// Event log message severity, ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info = 1,
    Error = 2,
    Fatal = 3,
}

impl Severity {
    /// Map the controller's numeric message type, clamping out-of-range values
    pub fn from_msgtype(msgtype: i32) -> Self {
        match msgtype {
            i32::MIN..=1 => Severity::Info,
            2 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

/// One controller event log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// 16-bit wrapping sequence number
    pub seqnum: u32,
    pub severity: Severity,
    pub code: u32,
    pub timestamp: String,
    pub args: Vec<String>,
}

/// Blocking controller capability
pub trait ControllerTransport {
    fn get_execution_state(&self) -> TransportResult<ExecutionState>;

    fn get_controller_state(&self) -> TransportResult<MotorState>;

    fn reset_program_pointer(&self) -> TransportResult<()>;

    fn start(&self, cycle: CycleMode, tasks: &[String]) -> TransportResult<()>;

    fn stop(&self) -> TransportResult<()>;

    fn upload_file(&self, path: &str, contents: &[u8]) -> TransportResult<()>;

    fn read_file(&self, path: &str) -> TransportResult<Vec<u8>>;

    fn delete_file(&self, path: &str) -> TransportResult<()>;

    /// Event log entries, newest first
    fn read_event_log(&self) -> TransportResult<Vec<EventLogEntry>>;

    fn get_analog_signal(&self, name: &str) -> TransportResult<f64>;

    fn set_analog_signal(&self, name: &str, value: f64) -> TransportResult<()>;

    fn get_digital_signal(&self, name: &str) -> TransportResult<bool>;

    fn set_digital_signal(&self, name: &str, value: bool) -> TransportResult<()>;

    fn get_ramdisk_path(&self) -> TransportResult<String>;
}

/// Async controller capability, same surface as [`ControllerTransport`]
#[async_trait]
pub trait AsyncControllerTransport: Send + Sync {
    async fn get_execution_state(&self) -> TransportResult<ExecutionState>;

    async fn get_controller_state(&self) -> TransportResult<MotorState>;

    async fn reset_program_pointer(&self) -> TransportResult<()>;

    async fn start(&self, cycle: CycleMode, tasks: &[String]) -> TransportResult<()>;

    async fn stop(&self) -> TransportResult<()>;

    async fn upload_file(&self, path: &str, contents: &[u8]) -> TransportResult<()>;

    async fn read_file(&self, path: &str) -> TransportResult<Vec<u8>>;

    async fn delete_file(&self, path: &str) -> TransportResult<()>;

    /// Event log entries, newest first
    async fn read_event_log(&self) -> TransportResult<Vec<EventLogEntry>>;

    async fn get_analog_signal(&self, name: &str) -> TransportResult<f64>;

    async fn set_analog_signal(&self, name: &str, value: f64) -> TransportResult<()>;

    async fn get_digital_signal(&self, name: &str) -> TransportResult<bool>;

    async fn set_digital_signal(&self, name: &str, value: bool) -> TransportResult<()>;

    async fn get_ramdisk_path(&self) -> TransportResult<String>;
}
