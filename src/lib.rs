//! ABB Motion Program Exec - motion programs for ABB robot controllers
//!
//! This library builds sequences of RAPID-style motion commands, encodes them
//! into the binary file format read by the controller-side executor, and
//! supervises a run: upload, start, poll, event log correlation and result log
//! retrieval. The controller itself is reached through a transport trait so
//! any web services client can be plugged in.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use abb_mpx::{JointTarget, Program, FINE, V1000};
//!
//! let mut program = Program::new();
//! program
//!     .move_abs_j(JointTarget::new([0.0, 0.0, 0.0, 0.0, 90.0, 0.0], [0.0; 6]), V1000, FINE)
//!     .wait_time(1.0)?;
//! let bytes = program.to_bytes()?;
//! println!("{} byte program", bytes.len());
//! # Ok::<(), abb_mpx::MotionProgramError>(())
//! ```
//!
//! # Architecture
//!
//! - **Program**: append-only command builder and binary serializer
//! - **ResultLog**: decoder for the per-run joint log
//! - **ControllerTransport / AsyncControllerTransport**: controller capabilities
//! - **MotionProgramExecClient / AsyncMotionProgramExecClient**: run supervision,
//!   preemption and multimove

pub mod commands;
pub mod config;
pub mod correlation;
pub mod egm;
pub mod error;
pub mod executor;
pub mod executor_async;
pub mod program;
pub mod result_log;
pub mod transport;
pub mod types;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

// High-level exports for easy usage
pub use config::{ExecutorConfig, ProgramDocument};
pub use error::{ErrorKind, MotionProgramError, Result, TransportError};
pub use executor::{ExecutionOutcome, MotionProgramExecClient};
pub use executor_async::AsyncMotionProgramExecClient;
pub use program::{DecodedProgram, Program, MAX_WIRE_INTEGER, MOTION_PROGRAM_FILE_VERSION};
pub use result_log::ResultLog;
pub use transport::{
    AsyncControllerTransport, ControllerTransport, CycleMode, EventLogEntry, ExecutionState,
    MotorState, RunState, Severity,
};

// Value types and presets
pub use commands::{Command, Opcode};
pub use egm::{
    EgmConfig, EgmFrameType, EgmJointTargetConfig, EgmMinMax, EgmPathCorrectionConfig,
    EgmPoseTargetConfig,
};
pub use types::{
    CirPathModeSwitch, ConfData, JointTarget, LoadData, Pose, RobTarget, SpeedData, ToolData,
    WobjData, ZoneData, FINE, LOAD0, TOOL0, V10, V100, V1000, V150, V1500, V20, V200, V2000,
    V2500, V30, V300, V3000, V40, V400, V4000, V5, V50, V500, V5000, V60, V600, V6000, V7000,
    V80, V800, VMAX, Z0, Z1, Z10, Z100, Z15, Z150, Z20, Z200, Z30, Z40, Z5, Z50, Z60, Z80,
};
