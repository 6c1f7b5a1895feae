//! Configuration loading for the executor and YAML program documents

use crate::commands::Command;
use crate::egm::EgmConfig;
use crate::program::Program;
use crate::types::{LoadData, ToolData, WobjData};
use crate::{MotionProgramError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Orchestrator settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExecutorConfig {
    pub poll_interval_ms: Option<u64>,
    /// Upper bound on status polls while a program runs; unbounded when absent
    pub max_poll_iterations: Option<u64>,
    pub default_task: Option<String>,
    /// Overrides the ramdisk path reported by the controller
    pub ramdisk_path: Option<String>,
}

impl ExecutorConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            MotionProgramError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self> {
        let config: ExecutorConfig = serde_yaml::from_str(contents)?;
        if config.poll_interval_ms == Some(0) {
            return Err(MotionProgramError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    /// Get poll interval with default fallback
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(50))
    }

    /// Get poll bound, `None` means poll until the program stops
    pub fn max_poll_iterations(&self) -> Option<u64> {
        self.max_poll_iterations
    }

    /// Get default task with default fallback
    pub fn default_task(&self) -> &str {
        self.default_task.as_deref().unwrap_or("T_ROB1")
    }

    pub fn ramdisk_path(&self) -> Option<&str> {
        self.ramdisk_path.as_deref()
    }
}

/// A motion program written out as YAML
///
/// ```yaml
/// first_cmd_num: 1
/// seqno: 7
/// commands:
///   - cmd: WaitTime
///     t: 0.5
///   - cmd: SyncMoveOn
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgramDocument {
    pub first_cmd_num: Option<u32>,
    pub tool: Option<ToolData>,
    pub wobj: Option<WobjData>,
    pub gripload: Option<LoadData>,
    pub timestamp: Option<String>,
    pub seqno: Option<u32>,
    #[serde(default)]
    pub egm: EgmConfig,
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl ProgramDocument {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            MotionProgramError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Build a validated [`Program`], stamping the current time when no
    /// timestamp is given
    pub fn into_program(self) -> Result<Program> {
        let mut program = Program::new()
            .with_first_cmd_num(self.first_cmd_num.unwrap_or(1))
            .with_seqno(self.seqno.unwrap_or(0))
            .with_egm_config(self.egm);
        if let Some(tool) = self.tool {
            program = program.with_tool(tool);
        }
        if let Some(wobj) = self.wobj {
            program = program.with_wobj(wobj)?;
        }
        if let Some(gripload) = self.gripload {
            program = program.with_gripload(gripload);
        }
        if let Some(timestamp) = self.timestamp {
            program = program.with_timestamp(&timestamp)?;
        }
        for command in self.commands {
            program.push(command)?;
        }
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Opcode;
    use crate::error::ErrorKind;

    #[test]
    fn test_executor_defaults() {
        let config = ExecutorConfig::load_from_str("{}").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.max_poll_iterations(), None);
        assert_eq!(config.default_task(), "T_ROB1");
        assert_eq!(config.ramdisk_path(), None);
    }

    #[test]
    fn test_executor_overrides() {
        let yaml = "poll_interval_ms: 10\nmax_poll_iterations: 200\n\
                    default_task: T_ROB2\nramdisk_path: /tmp/ram\n";
        let config = ExecutorConfig::load_from_str(yaml).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.max_poll_iterations(), Some(200));
        assert_eq!(config.default_task(), "T_ROB2");
        assert_eq!(config.ramdisk_path(), Some("/tmp/ram"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = ExecutorConfig::load_from_str("poll_interval_ms: 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_missing_file() {
        let err = ExecutorConfig::load_from_path("/nonexistent/mpx.yaml").unwrap_err();
        assert!(matches!(err, MotionProgramError::Config(_)));
    }

    #[test]
    fn test_program_document() {
        let yaml = r#"
first_cmd_num: 5
seqno: 9
timestamp: 2022-06-01-12-30-45-1234
commands:
  - cmd: WaitTime
    t: 0.5
  - cmd: SyncMoveOn
  - cmd: CirPathMode
    switch: CirPointOri
"#;
        let program = ProgramDocument::load_from_str(yaml).unwrap().into_program().unwrap();
        assert_eq!(program.first_cmd_num(), 5);
        assert_eq!(program.last_cmd_num(), Some(7));
        assert_eq!(program.seqno(), 9);
        assert_eq!(program.timestamp(), "2022-06-01-12-30-45-1234");
        assert_eq!(program.commands()[1].opcode(), Opcode::SyncMoveOn);
        assert_eq!(*program.egm_config(), EgmConfig::None);
    }

    #[test]
    fn test_program_document_validation() {
        let yaml = "commands:\n  - cmd: WaitTime\n    t: -1.0\n";
        let err = ProgramDocument::load_from_str(yaml)
            .unwrap()
            .into_program()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let yaml = "timestamp: yesterday\n";
        let err = ProgramDocument::load_from_str(yaml)
            .unwrap()
            .into_program()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
