//! Async motion program execution
//!
//! Same transitions as [`crate::executor::MotionProgramExecClient`]; the
//! status poll yields to the runtime between ticks instead of blocking a
//! thread.

use crate::config::ExecutorConfig;
use crate::correlation;
use crate::executor::{
    baseline_seqnum, check_preempt_alignment, check_ready, encode_uploads, multimove_tasks,
    signal_to_cmdnum, ExecutionOutcome,
};
use crate::program::Program;
use crate::result_log::ResultLog;
use crate::transport::{signals, AsyncControllerTransport, CycleMode, RunState};
use crate::{MotionProgramError, Result};
use tracing::{debug, info, warn};

/// Async execution client over any [`AsyncControllerTransport`]
#[derive(Debug)]
pub struct AsyncMotionProgramExecClient<T: AsyncControllerTransport> {
    transport: T,
    config: ExecutorConfig,
}

impl<T: AsyncControllerTransport> AsyncMotionProgramExecClient<T> {
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

    async fn ramdisk(&self) -> Result<String> {
        match self.config.ramdisk_path() {
            Some(path) => Ok(path.to_string()),
            None => Ok(self.transport.get_ramdisk_path().await?),
        }
    }

    pub async fn execute_motion_program(
        &self,
        program: &Program,
        task: Option<&str>,
        wait: bool,
        seqno: Option<u32>,
    ) -> Result<ExecutionOutcome> {
        let task = task.unwrap_or_else(|| self.config.default_task()).to_string();
        let tasks = vec![task];
        let ramdisk = self.ramdisk().await?;
        let uploads = encode_uploads(&ramdisk, &[program], &tasks, None, seqno)?;
        self.execute(&tasks, &uploads, wait).await
    }

    pub async fn execute_multimove_motion_program(
        &self,
        programs: &[Program],
        tasks: Option<&[String]>,
        wait: bool,
        seqno: Option<u32>,
    ) -> Result<ExecutionOutcome> {
        let tasks = multimove_tasks(programs.len(), tasks)?;
        let programs: Vec<&Program> = programs.iter().collect();
        let ramdisk = self.ramdisk().await?;
        let uploads = encode_uploads(&ramdisk, &programs, &tasks, None, seqno)?;
        self.execute(&tasks, &uploads, wait).await
    }

    async fn execute(
        &self,
        tasks: &[String],
        uploads: &[(String, Vec<u8>)],
        wait: bool,
    ) -> Result<ExecutionOutcome> {
        let state = self.transport.get_execution_state().await?;
        let motor = self.transport.get_controller_state().await?;
        check_ready(&state, motor)?;
        debug!("Controller ready: {:?}, {:?}", state.run_state, motor);

        let prev_seqnum = baseline_seqnum(&self.transport.read_event_log().await?);
        debug!("Event log baseline: {}", prev_seqnum);

        self.transport.reset_program_pointer().await?;
        for (path, bytes) in uploads {
            self.transport.upload_file(path, bytes).await?;
            info!("Uploaded motion program {} ({} bytes)", path, bytes.len());
        }

        self.transport.start(CycleMode::Once, tasks).await?;
        info!("Started motion program on {}", tasks.join(", "));

        if !wait {
            return Ok(ExecutionOutcome::Started { prev_seqnum });
        }

        self.wait_motion_program_complete().await?;
        let log = self.read_motion_program_result_log(prev_seqnum).await?;
        Ok(ExecutionOutcome::Completed(log))
    }

    pub async fn preempt_motion_program(
        &self,
        program: &Program,
        task: Option<&str>,
        preempt_number: u32,
        preempt_cmdnum: u32,
        seqno: Option<u32>,
    ) -> Result<()> {
        check_preempt_alignment(program, preempt_number, preempt_cmdnum)?;
        let task = task.unwrap_or_else(|| self.config.default_task()).to_string();
        let ramdisk = self.ramdisk().await?;
        let uploads = encode_uploads(&ramdisk, &[program], &[task], Some(preempt_number), seqno)?;
        self.preempt(&uploads, preempt_number, preempt_cmdnum).await
    }

    pub async fn preempt_multimove_motion_program(
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
        let ramdisk = self.ramdisk().await?;
        let uploads = encode_uploads(&ramdisk, &programs, &tasks, Some(preempt_number), seqno)?;
        self.preempt(&uploads, preempt_number, preempt_cmdnum).await
    }

    async fn preempt(
        &self,
        uploads: &[(String, Vec<u8>)],
        preempt_number: u32,
        preempt_cmdnum: u32,
    ) -> Result<()> {
        for (path, bytes) in uploads {
            self.transport.upload_file(path, bytes).await?;
            info!("Uploaded preempting program {} ({} bytes)", path, bytes.len());
        }
        self.transport
            .set_analog_signal(signals::PREEMPT_CMD_NUM, preempt_cmdnum as f64)
            .await?;
        self.transport
            .set_analog_signal(signals::PREEMPT, preempt_number as f64)
            .await?;
        info!("Requested preemption {} after command {}", preempt_number, preempt_cmdnum);
        Ok(())
    }

    pub async fn get_current_cmdnum(&self) -> Result<i64> {
        let value = self.transport.get_analog_signal(signals::CURRENT_CMD_NUM).await?;
        Ok(signal_to_cmdnum(value))
    }

    pub async fn get_queued_cmdnum(&self) -> Result<i64> {
        let value = self.transport.get_analog_signal(signals::QUEUED_CMD_NUM).await?;
        Ok(signal_to_cmdnum(value))
    }

    pub async fn get_current_preempt_number(&self) -> Result<i64> {
        let value = self.transport.get_analog_signal(signals::PREEMPT_CURRENT).await?;
        Ok(signal_to_cmdnum(value))
    }

    pub async fn is_motion_program_running(&self) -> Result<bool> {
        Ok(self.transport.get_execution_state().await?.run_state == RunState::Running)
    }

    pub async fn wait_motion_program_complete(&self) -> Result<()> {
        let interval = self.config.poll_interval();
        let mut polls: u64 = 0;
        while self.is_motion_program_running().await? {
            polls += 1;
            if let Some(max) = self.config.max_poll_iterations() {
                if polls >= max {
                    warn!("Motion program still running after {} polls", polls);
                    return Err(MotionProgramError::PollTimeout(polls));
                }
            }
            tokio::time::sleep(interval).await;
        }
        info!("Motion program finished after {} polls", polls);
        Ok(())
    }

    pub async fn read_motion_program_result_log(&self, prev_seqnum: u32) -> Result<ResultLog> {
        let log = self.transport.read_event_log().await?;
        let filename = correlation::locate_result_file(&log, prev_seqnum)?;
        let path = format!("{}/{}", self.ramdisk().await?, filename);
        info!("Reading result log {}", path);

        let contents = self.transport.read_file(&path).await?;
        if let Err(e) = self.transport.delete_file(&path).await {
            warn!("Failed to delete result log {}: {}", path, e);
        }
        ResultLog::parse(&contents)
    }

    pub async fn stop_motion_program(&self) -> Result<()> {
        info!("Stopping motion program");
        Ok(self.transport.stop().await?)
    }

    pub async fn stop_egm(&self) -> Result<()> {
        Ok(self.transport.set_digital_signal(signals::STOP_EGM, true).await?)
    }

    pub async fn enable_motion_logging(&self) -> Result<()> {
        Ok(self.transport.set_digital_signal(signals::LOG_MOTION, true).await?)
    }

    pub async fn disable_motion_logging(&self) -> Result<()> {
        Ok(self.transport.set_digital_signal(signals::LOG_MOTION, false).await?)
    }

    pub async fn motion_logging_enabled(&self) -> Result<bool> {
        Ok(self.transport.get_digital_signal(signals::LOG_MOTION).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{log_entry, Call, FakeController, RAMDISK, RESULT_FILE};
    use crate::transport::{MotorState, Severity};

    fn program() -> Program {
        let mut mp = Program::new();
        mp.wait_time(0.5).unwrap();
        mp
    }

    fn client(fake: FakeController) -> AsyncMotionProgramExecClient<FakeController> {
        let config = ExecutorConfig {
            poll_interval_ms: Some(1),
            ..ExecutorConfig::default()
        };
        AsyncMotionProgramExecClient::with_config(fake, config)
    }

    #[tokio::test]
    async fn test_execute_success() {
        let client = client(FakeController::new());
        let outcome = client
            .execute_motion_program(&program(), None, true, None)
            .await
            .unwrap();
        let log = outcome.into_result_log().unwrap();
        assert_eq!(log.columns(), 4);

        let result_path = format!("{}/{}", RAMDISK, RESULT_FILE);
        let calls = client.transport().calls();
        assert_eq!(calls[0], Call::ResetProgramPointer);
        assert_eq!(calls[3], Call::ReadFile(result_path.clone()));
        assert_eq!(calls[4], Call::DeleteFile(result_path));
    }

    #[tokio::test]
    async fn test_precondition_failure() {
        let client = client(FakeController::new().with_motor(MotorState::GuardStop));
        let err = client
            .execute_motion_program(&program(), None, true, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(client.transport().uploads().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_is_swallowed() {
        let client = client(FakeController::new().with_failing_delete());
        let outcome = client
            .execute_motion_program(&program(), None, true, None)
            .await
            .unwrap();
        assert!(outcome.result_log().is_some());
    }

    #[tokio::test]
    async fn test_fatal_entry_fails_run() {
        let log = vec![
            log_entry(101, Severity::Fatal, 50204, &["Motion supervision"]),
            log_entry(100, Severity::Info, 10, &["before"]),
        ];
        let client = client(FakeController::new().with_log_after(log));
        let err = client
            .execute_motion_program(&program(), None, true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MotionProgramError::ProgramFailed));
    }

    #[tokio::test]
    async fn test_poll_timeout() {
        let config = ExecutorConfig {
            poll_interval_ms: Some(1),
            max_poll_iterations: Some(2),
            ..ExecutorConfig::default()
        };
        let client = AsyncMotionProgramExecClient::with_config(
            FakeController::new().with_running_polls(10),
            config,
        );
        let err = client
            .execute_motion_program(&program(), None, true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MotionProgramError::PollTimeout(2)));
    }

    #[tokio::test]
    async fn test_multimove_and_preempt() {
        let client = client(FakeController::new());
        let tasks = vec!["T_ROB1".to_string(), "T_ROB2".to_string()];
        let outcome = client
            .execute_multimove_motion_program(&[program(), program()], Some(&tasks), false, None)
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Started { prev_seqnum: 100 });

        let next = Program::new().with_first_cmd_num(2);
        client
            .preempt_multimove_motion_program(&[next.clone(), next], Some(&tasks), 1, 1, None)
            .await
            .unwrap();

        let calls = client.transport().calls();
        let n = calls.len();
        assert_eq!(calls[n - 2], Call::SetAnalog(signals::PREEMPT_CMD_NUM.to_string(), 1.0));
        assert_eq!(calls[n - 1], Call::SetAnalog(signals::PREEMPT.to_string(), 1.0));
        assert_eq!(
            client.transport().uploads(),
            vec![
                format!("{}/motion_program.bin", RAMDISK),
                format!("{}/motion_program2.bin", RAMDISK),
                format!("{}/motion_program_p1.bin", RAMDISK),
                format!("{}/motion_program2_p1.bin", RAMDISK),
            ]
        );
    }

    #[tokio::test]
    async fn test_signals() {
        let client = client(FakeController::new().with_analog(signals::QUEUED_CMD_NUM, 12.0));
        assert_eq!(client.get_queued_cmdnum().await.unwrap(), 12);
        client.enable_motion_logging().await.unwrap();
        assert!(client.motion_logging_enabled().await.unwrap());
        client.stop_egm().await.unwrap();
        assert_eq!(client.transport().digital(signals::STOP_EGM), Some(true));
        assert!(!client.is_motion_program_running().await.unwrap());
    }
}
