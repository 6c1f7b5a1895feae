//! Scripted in-memory controller for exercising the executors

use crate::error::TransportError;
use crate::program::MOTION_PROGRAM_FILE_VERSION;
use crate::transport::{
    AsyncControllerTransport, ControllerTransport, CycleMode, EventLogEntry, ExecutionState,
    MotorState, RunState, Severity, TransportResult,
};
use crate::wire::WireWriter;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub const RAMDISK: &str = "RAMDISK";
pub const RESULT_FILE: &str = "log-2022-06-01-12-30-45-1234.bin";

/// Mutating or file calls, in the order they were made
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ResetProgramPointer,
    Start { cycle: CycleMode, tasks: Vec<String> },
    Stop,
    Upload(String),
    ReadFile(String),
    DeleteFile(String),
    SetAnalog(String, f64),
    SetDigital(String, bool),
}

#[derive(Debug)]
struct FakeState {
    run_state: RunState,
    motor: MotorState,
    started: bool,
    running_polls: usize,
    status_polls: usize,
    log_before: Vec<EventLogEntry>,
    log_after: Vec<EventLogEntry>,
    files: HashMap<String, Vec<u8>>,
    fail_delete: bool,
    analog: HashMap<String, f64>,
    digital: HashMap<String, bool>,
    calls: Vec<Call>,
}

#[derive(Debug)]
pub struct FakeController {
    state: Mutex<FakeState>,
}

pub fn log_entry(seqnum: u32, severity: Severity, code: u32, args: &[&str]) -> EventLogEntry {
    EventLogEntry {
        seqnum,
        severity,
        code,
        timestamp: "2022-06-01 12:30:45".to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
    }
}

/// A two row result log with columns `t,cmd,j1,j2`
pub fn result_log_bytes() -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_num(MOTION_PROGRAM_FILE_VERSION as f64);
    w.put_str("2022-06-01-12-30-45-1234").unwrap();
    w.put_str("t,cmd,j1,j2").unwrap();
    w.put_nums(&[0.0, 1.0, 10.0, 20.0, 0.004, 1.0, 10.5, 20.5]);
    w.into_bytes()
}

/// Newest-first log of a clean run that wrote [`RESULT_FILE`]
pub fn successful_run_log(first_seqnum: u32) -> Vec<EventLogEntry> {
    vec![
        log_entry(
            first_seqnum + 2,
            Severity::Info,
            80003,
            &["Motion Program Log File Closed"],
        ),
        log_entry(first_seqnum + 1, Severity::Info, 10002, &["Program started"]),
        log_entry(
            first_seqnum,
            Severity::Info,
            80003,
            &["Motion Program Log File Opened", &format!("HOME:/{}", RESULT_FILE)],
        ),
    ]
}

impl FakeController {
    /// Stopped, motors on, newest log entry 100, a clean run that stops after
    /// two running polls
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(format!("{}/{}", RAMDISK, RESULT_FILE), result_log_bytes());

        let mut log_after = successful_run_log(101);
        log_after.push(log_entry(100, Severity::Info, 10, &["before"]));

        Self {
            state: Mutex::new(FakeState {
                run_state: RunState::Stopped,
                motor: MotorState::MotorOn,
                started: false,
                running_polls: 2,
                status_polls: 0,
                log_before: vec![
                    log_entry(100, Severity::Info, 10, &["before"]),
                    log_entry(99, Severity::Info, 10, &["older"]),
                ],
                log_after,
                files,
                fail_delete: false,
                analog: HashMap::new(),
                digital: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_run_state(self, run_state: RunState) -> Self {
        self.lock().run_state = run_state;
        self
    }

    pub fn with_motor(self, motor: MotorState) -> Self {
        self.lock().motor = motor;
        self
    }

    pub fn with_running_polls(self, polls: usize) -> Self {
        self.lock().running_polls = polls;
        self
    }

    pub fn with_log_before(self, log: Vec<EventLogEntry>) -> Self {
        self.lock().log_before = log;
        self
    }

    pub fn with_log_after(self, log: Vec<EventLogEntry>) -> Self {
        self.lock().log_after = log;
        self
    }

    pub fn with_failing_delete(self) -> Self {
        self.lock().fail_delete = true;
        self
    }

    pub fn with_analog(self, name: &str, value: f64) -> Self {
        self.lock().analog.insert(name.to_string(), value);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    pub fn status_polls(&self) -> usize {
        self.lock().status_polls
    }

    pub fn digital(&self, name: &str) -> Option<bool> {
        self.lock().digital.get(name).copied()
    }
}

impl ControllerTransport for FakeController {
    fn get_execution_state(&self) -> TransportResult<ExecutionState> {
        let mut state = self.lock();
        state.status_polls += 1;
        let run_state = if state.started && state.running_polls > 0 {
            state.running_polls -= 1;
            RunState::Running
        } else if state.started {
            RunState::Stopped
        } else {
            state.run_state
        };
        Ok(ExecutionState {
            run_state,
            cycle: CycleMode::Once,
        })
    }

    fn get_controller_state(&self) -> TransportResult<MotorState> {
        Ok(self.lock().motor)
    }

    fn reset_program_pointer(&self) -> TransportResult<()> {
        self.lock().calls.push(Call::ResetProgramPointer);
        Ok(())
    }

    fn start(&self, cycle: CycleMode, tasks: &[String]) -> TransportResult<()> {
        let mut state = self.lock();
        state.started = true;
        state.calls.push(Call::Start {
            cycle,
            tasks: tasks.to_vec(),
        });
        Ok(())
    }

    fn stop(&self) -> TransportResult<()> {
        self.lock().calls.push(Call::Stop);
        Ok(())
    }

    fn upload_file(&self, path: &str, contents: &[u8]) -> TransportResult<()> {
        let mut state = self.lock();
        state.files.insert(path.to_string(), contents.to_vec());
        state.calls.push(Call::Upload(path.to_string()));
        Ok(())
    }

    fn read_file(&self, path: &str) -> TransportResult<Vec<u8>> {
        let mut state = self.lock();
        state.calls.push(Call::ReadFile(path.to_string()));
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| TransportError::Response(format!("No such file: {}", path)))
    }

    fn delete_file(&self, path: &str) -> TransportResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::DeleteFile(path.to_string()));
        if state.fail_delete {
            return Err(TransportError::Request("delete refused".to_string()));
        }
        state.files.remove(path);
        Ok(())
    }

    fn read_event_log(&self) -> TransportResult<Vec<EventLogEntry>> {
        let state = self.lock();
        if state.started {
            Ok(state.log_after.clone())
        } else {
            Ok(state.log_before.clone())
        }
    }

    fn get_analog_signal(&self, name: &str) -> TransportResult<f64> {
        self.lock()
            .analog
            .get(name)
            .copied()
            .ok_or_else(|| TransportError::Response(format!("Unknown signal: {}", name)))
    }

    fn set_analog_signal(&self, name: &str, value: f64) -> TransportResult<()> {
        let mut state = self.lock();
        state.analog.insert(name.to_string(), value);
        state.calls.push(Call::SetAnalog(name.to_string(), value));
        Ok(())
    }

    fn get_digital_signal(&self, name: &str) -> TransportResult<bool> {
        Ok(self.lock().digital.get(name).copied().unwrap_or(false))
    }

    fn set_digital_signal(&self, name: &str, value: bool) -> TransportResult<()> {
        let mut state = self.lock();
        state.digital.insert(name.to_string(), value);
        state.calls.push(Call::SetDigital(name.to_string(), value));
        Ok(())
    }

    fn get_ramdisk_path(&self) -> TransportResult<String> {
        Ok(RAMDISK.to_string())
    }
}

#[async_trait]
impl AsyncControllerTransport for FakeController {
    async fn get_execution_state(&self) -> TransportResult<ExecutionState> {
        ControllerTransport::get_execution_state(self)
    }

    async fn get_controller_state(&self) -> TransportResult<MotorState> {
        ControllerTransport::get_controller_state(self)
    }

    async fn reset_program_pointer(&self) -> TransportResult<()> {
        ControllerTransport::reset_program_pointer(self)
    }

    async fn start(&self, cycle: CycleMode, tasks: &[String]) -> TransportResult<()> {
        ControllerTransport::start(self, cycle, tasks)
    }

    async fn stop(&self) -> TransportResult<()> {
        ControllerTransport::stop(self)
    }

    async fn upload_file(&self, path: &str, contents: &[u8]) -> TransportResult<()> {
        ControllerTransport::upload_file(self, path, contents)
    }

    async fn read_file(&self, path: &str) -> TransportResult<Vec<u8>> {
        ControllerTransport::read_file(self, path)
    }

    async fn delete_file(&self, path: &str) -> TransportResult<()> {
        ControllerTransport::delete_file(self, path)
    }

    async fn read_event_log(&self) -> TransportResult<Vec<EventLogEntry>> {
        ControllerTransport::read_event_log(self)
    }

    async fn get_analog_signal(&self, name: &str) -> TransportResult<f64> {
        ControllerTransport::get_analog_signal(self, name)
    }

    async fn set_analog_signal(&self, name: &str, value: f64) -> TransportResult<()> {
        ControllerTransport::set_analog_signal(self, name, value)
    }

    async fn get_digital_signal(&self, name: &str) -> TransportResult<bool> {
        ControllerTransport::get_digital_signal(self, name)
    }

    async fn set_digital_signal(&self, name: &str, value: bool) -> TransportResult<()> {
        ControllerTransport::set_digital_signal(self, name, value)
    }

    async fn get_ramdisk_path(&self) -> TransportResult<String> {
        ControllerTransport::get_ramdisk_path(self)
    }
}
