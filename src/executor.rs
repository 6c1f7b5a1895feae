//! Blocking motion program execution
//!
//! [`MotionProgramExecClient`] drives one run through the controller:
//!
//! 1. check the controller is stopped with motors on
//! 2. record the newest event log sequence number as a baseline
//! 3. reset the program pointer and upload the program file(s)
//! 4. start the task(s) once
//! 5. poll until the controller leaves the running state
//! 6. correlate the event log against the baseline, fetch and delete the
//!    result log file
//!
//! Preemption uploads a second program and raises two analog signals that the
//! controller-side executor watches for. The helpers in this module are shared
//! with the async client so both follow the same transitions.

use crate::config::ExecutorConfig;
use crate::correlation;
use crate::program::{program_file_path, Program, MAX_WIRE_INTEGER};
use crate::result_log::ResultLog;
use crate::transport::{
    signals, ControllerTransport, CycleMode, EventLogEntry, ExecutionState, MotorState, RunState,
};
use crate::{MotionProgramError, Result};
use std::thread;
use tracing::{debug, info, warn};

/// Outcome of an `execute_*` call
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Ran to completion and the result log was retrieved
    Completed(ResultLog),
    /// Started without waiting. Pass `prev_seqnum` to
    /// `read_motion_program_result_log` once the run is complete.
    Started { prev_seqnum: u32 },
}

impl ExecutionOutcome {
    pub fn result_log(&self) -> Option<&ResultLog> {
        match self {
            ExecutionOutcome::Completed(log) => Some(log),
            ExecutionOutcome::Started { .. } => None,
        }
    }

    pub fn into_result_log(self) -> Option<ResultLog> {
        match self {
            ExecutionOutcome::Completed(log) => Some(log),
            ExecutionOutcome::Started { .. } => None,
        }
    }
}

pub(crate) fn check_ready(state: &ExecutionState, motor: MotorState) -> Result<()> {
    if state.run_state != RunState::Stopped {
        return Err(MotionProgramError::Precondition(format!(
            "Robot controller must be stopped to start a motion program (state: {:?})",
            state.run_state
        )));
    }
    if motor != MotorState::MotorOn {
        return Err(MotionProgramError::Precondition(format!(
            "Robot controller motors must be on to start a motion program (state: {:?})",
            motor
        )));
    }
    Ok(())
}

/// Sequence number of the newest entry, 0 for an empty log
pub(crate) fn baseline_seqnum(log: &[EventLogEntry]) -> u32 {
    log.first().map(|e| e.seqnum).unwrap_or(0)
}

/// A preempting program must continue numbering right after the crossover
pub fn check_preempt_alignment(
    program: &Program,
    preempt_number: u32,
    preempt_cmdnum: u32,
) -> Result<()> {
    if preempt_number == 0 {
        return Err(MotionProgramError::Validation(
            "Preempt number must start at 1".to_string(),
        ));
    }
    if preempt_cmdnum >= MAX_WIRE_INTEGER {
        return Err(MotionProgramError::Validation(format!(
            "Crossover command {} leaves no room below the wire limit {}",
            preempt_cmdnum, MAX_WIRE_INTEGER
        )));
    }
    if program.first_cmd_num().checked_sub(1) != Some(preempt_cmdnum) {
        return Err(MotionProgramError::Validation(format!(
            "Preempting program must start at the command after crossover {}, found {}",
            preempt_cmdnum,
            program.first_cmd_num()
        )));
    }
    Ok(())
}

/// Task list for a multimove run, `T_ROB1..T_ROBn` when none is given
pub fn multimove_tasks(program_count: usize, tasks: Option<&[String]>) -> Result<Vec<String>> {
    let tasks: Vec<String> = match tasks {
        Some(tasks) => tasks.to_vec(),
        None => (1..=program_count).map(|i| format!("T_ROB{}", i)).collect(),
    };
    if tasks.len() != program_count {
        return Err(MotionProgramError::Precondition(format!(
            "Got {} programs for {} tasks",
            program_count,
            tasks.len()
        )));
    }
    if tasks.len() < 2 {
        return Err(MotionProgramError::Precondition(
            "Multimove requires at least two tasks".to_string(),
        ));
    }
    Ok(tasks)
}

/// Serialize each program against its task's file path
pub(crate) fn encode_uploads(
    ramdisk: &str,
    programs: &[&Program],
    tasks: &[String],
    preempt_number: Option<u32>,
    seqno: Option<u32>,
) -> Result<Vec<(String, Vec<u8>)>> {
    programs
        .iter()
        .zip(tasks)
        .map(|(program, task)| {
            let path = program_file_path(ramdisk, task, preempt_number);
            Ok((path, program.serialize(seqno)?))
        })
        .collect()
}

/// Command numbers travel as analog values
pub(crate) fn signal_to_cmdnum(value: f64) -> i64 {
    value.round() as i64
}

/// Blocking execution client over any [`ControllerTransport`]
#[derive(Debug)]
pub struct MotionProgramExecClient<T: ControllerTransport> {
    transport: T,
    config: ExecutorConfig,
}

impl<T: ControllerTransport> MotionProgramExecClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ExecutorConfig::default())
    }

    pub fn with_config(transport: T, config: ExecutorConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn ramdisk(&self) -> Result<String> {
        match self.config.ramdisk_path() {
            Some(path) => Ok(path.to_string()),
            None => Ok(self.transport.get_ramdisk_path()?),
        }
    }

    /// Run `program` on `task` (the configured default task when `None`).
    ///
    /// `seqno` overrides the program's sequence number for this upload only.
    pub fn execute_motion_program(
        &self,
        program: &Program,
        task: Option<&str>,
        wait: bool,
        seqno: Option<u32>,
    ) -> Result<ExecutionOutcome> {
        let task = task.unwrap_or_else(|| self.config.default_task()).to_string();
        let tasks = vec![task];
        let uploads = encode_uploads(&self.ramdisk()?, &[program], &tasks, None, seqno)?;
        self.execute(&tasks, &uploads, wait)
    }

    /// Run one program per task in lockstep
    pub fn execute_multimove_motion_program(
        &self,
        programs: &[Program],
        tasks: Option<&[String]>,
        wait: bool,
        seqno: Option<u32>,
    ) -> Result<ExecutionOutcome> {
        let tasks = multimove_tasks(programs.len(), tasks)?;
        let programs: Vec<&Program> = programs.iter().collect();
        let uploads = encode_uploads(&self.ramdisk()?, &programs, &tasks, None, seqno)?;
        self.execute(&tasks, &uploads, wait)
    }

    fn execute(
        &self,
        tasks: &[String],
        uploads: &[(String, Vec<u8>)],
        wait: bool,
    ) -> Result<ExecutionOutcome> {
        let state = self.transport.get_execution_state()?;
        let motor = self.transport.get_controller_state()?;
        check_ready(&state, motor)?;
        debug!("Controller ready: {:?}, {:?}", state.run_state, motor);

        let prev_seqnum = baseline_seqnum(&self.transport.read_event_log()?);
        debug!("Event log baseline: {}", prev_seqnum);

        self.transport.reset_program_pointer()?;
        for (path, bytes) in uploads {
            self.transport.upload_file(path, bytes)?;
            info!("Uploaded motion program {} ({} bytes)", path, bytes.len());
        }

        self.transport.start(CycleMode::Once, tasks)?;
        info!("Started motion program on {}", tasks.join(", "));

        if !wait {
            return Ok(ExecutionOutcome::Started { prev_seqnum });
        }

        self.wait_motion_program_complete()?;
        let log = self.read_motion_program_result_log(prev_seqnum)?;
        Ok(ExecutionOutcome::Completed(log))
    }

    /// Upload a program that takes over from the running one after command
    /// `preempt_cmdnum`
    pub fn preempt_motion_program(
        &self,
        program: &Program,
        task: Option<&str>,
        preempt_number: u32,
        preempt_cmdnum: u32,
        seqno: Option<u32>,
    ) -> Result<()> {
        check_preempt_alignment(program, preempt_number, preempt_cmdnum)?;
        let task = task.unwrap_or_else(|| self.config.default_task()).to_string();
        let ramdisk = self.ramdisk()?;
        let uploads = encode_uploads(&ramdisk, &[program], &[task], Some(preempt_number), seqno)?;
        self.preempt(&uploads, preempt_number, preempt_cmdnum)
    }

    pub fn preempt_multimove_motion_program(
        &self,
        programs: &[Program],
        tasks: Option<&[String]>,
        preempt_number: u32,
        preempt_cmdnum: u32,
        seqno: Option<u32>,
    ) -> Result<()> {
        let tasks = multimove_tasks(programs.len(), tasks)?;
        for program in programs {
            check_preempt_alignment(program, preempt_number, preempt_cmdnum)?;
        }
        let programs: Vec<&Program> = programs.iter().collect();
        let ramdisk = self.ramdisk()?;
        let uploads = encode_uploads(&ramdisk, &programs, &tasks, Some(preempt_number), seqno)?;
        self.preempt(&uploads, preempt_number, preempt_cmdnum)
    }

    fn preempt(
        &self,
        uploads: &[(String, Vec<u8>)],
        preempt_number: u32,
        preempt_cmdnum: u32,
    ) -> Result<()> {
        for (path, bytes) in uploads {
            self.transport.upload_file(path, bytes)?;
            info!("Uploaded preempting program {} ({} bytes)", path, bytes.len());
        }
        self.transport
            .set_analog_signal(signals::PREEMPT_CMD_NUM, preempt_cmdnum as f64)?;
        self.transport
            .set_analog_signal(signals::PREEMPT, preempt_number as f64)?;
        info!("Requested preemption {} after command {}", preempt_number, preempt_cmdnum);
        Ok(())
    }

    /// Command number currently executing
    pub fn get_current_cmdnum(&self) -> Result<i64> {
        Ok(signal_to_cmdnum(self.transport.get_analog_signal(signals::CURRENT_CMD_NUM)?))
    }

    /// Command number most recently queued; crossovers must be beyond it
    pub fn get_queued_cmdnum(&self) -> Result<i64> {
        Ok(signal_to_cmdnum(self.transport.get_analog_signal(signals::QUEUED_CMD_NUM)?))
    }

    pub fn get_current_preempt_number(&self) -> Result<i64> {
        Ok(signal_to_cmdnum(self.transport.get_analog_signal(signals::PREEMPT_CURRENT)?))
    }

    pub fn is_motion_program_running(&self) -> Result<bool> {
        Ok(self.transport.get_execution_state()?.run_state == RunState::Running)
    }

    /// Block until the controller leaves the running state
    pub fn wait_motion_program_complete(&self) -> Result<()> {
        let interval = self.config.poll_interval();
        let mut polls: u64 = 0;
        while self.is_motion_program_running()? {
            polls += 1;
            if let Some(max) = self.config.max_poll_iterations() {
                if polls >= max {
                    warn!("Motion program still running after {} polls", polls);
                    return Err(MotionProgramError::PollTimeout(polls));
                }
            }
            thread::sleep(interval);
        }
        info!("Motion program finished after {} polls", polls);
        Ok(())
    }

    /// Correlate the event log against `prev_seqnum`, then fetch, delete and
    /// parse the result log
    pub fn read_motion_program_result_log(&self, prev_seqnum: u32) -> Result<ResultLog> {
        let log = self.transport.read_event_log()?;
        let filename = correlation::locate_result_file(&log, prev_seqnum)?;
        let path = format!("{}/{}", self.ramdisk()?, filename);
        info!("Reading result log {}", path);

        let contents = self.transport.read_file(&path)?;
        if let Err(e) = self.transport.delete_file(&path) {
            warn!("Failed to delete result log {}: {}", path, e);
        }
        ResultLog::parse(&contents)
    }

    pub fn stop_motion_program(&self) -> Result<()> {
        info!("Stopping motion program");
        Ok(self.transport.stop()?)
    }

    /// End a long running EGM command
    pub fn stop_egm(&self) -> Result<()> {
        Ok(self.transport.set_digital_signal(signals::STOP_EGM, true)?)
    }

    pub fn enable_motion_logging(&self) -> Result<()> {
        Ok(self.transport.set_digital_signal(signals::LOG_MOTION, true)?)
    }

    pub fn disable_motion_logging(&self) -> Result<()> {
        Ok(self.transport.set_digital_signal(signals::LOG_MOTION, false)?)
    }

    pub fn motion_logging_enabled(&self) -> Result<bool> {
        Ok(self.transport.get_digital_signal(signals::LOG_MOTION)?)
    }
}
