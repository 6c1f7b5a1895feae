//! Motion program builder and binary codec
//!
//! A [`Program`] is authored by appending commands and then serialized into the
//! versioned buffer the controller-side executor reads:
//!
//! ```text
//! version | tooldata | wobjdata | gripload | timestamp | seqno | egm config
//! (cmd_num, opcode, params)*
//! ```
//!
//! The decoder exists for diagnostics: it turns a buffer back into commands so
//! that an uploaded file can be inspected as text.

use crate::commands::{Command, Opcode};
use crate::egm::EgmConfig;
use crate::types::{
    CirPathModeSwitch, JointTarget, LoadData, Pose, RobTarget, SpeedData, ToolData, WobjData,
    ZoneData, LOAD0, TOOL0,
};
use crate::wire::{WireCodec, WireReader, WireWriter};
use crate::{MotionProgramError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Binary format version shared by motion programs and result logs.
/// Must change whenever either layout changes; readers require an exact match.
pub const MOTION_PROGRAM_FILE_VERSION: u32 = 10011;

/// Largest integer an f32 wire field holds exactly (2^24). Command numbers and
/// sequence numbers above it would collide on the wire.
pub const MAX_WIRE_INTEGER: u32 = 1 << 24;

fn check_wire_integer(value: u64, what: &str) -> Result<u32> {
    if value > MAX_WIRE_INTEGER as u64 {
        return Err(MotionProgramError::Validation(format!(
            "{} {} exceeds the largest exact wire value {}",
            what, value, MAX_WIRE_INTEGER
        )));
    }
    Ok(value as u32)
}

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}-\d{4}$").expect("valid timestamp regex")
    })
}

/// Current local time as `YYYY-MM-DD-HH-MM-SS-ffff` (ffff = tenths of milliseconds)
pub fn current_timestamp() -> String {
    let now = chrono::Local::now();
    format!(
        "{}-{:04}",
        now.format("%Y-%m-%d-%H-%M-%S"),
        timestamp_fraction(now.timestamp_subsec_micros())
    )
}

/// Tenths of milliseconds; leap seconds report micros past 999_999
fn timestamp_fraction(micros: u32) -> u32 {
    (micros / 100).min(9999)
}

pub fn validate_timestamp(timestamp: &str) -> Result<()> {
    if timestamp_pattern().is_match(timestamp) {
        Ok(())
    } else {
        Err(MotionProgramError::Validation(format!(
            "Invalid timestamp '{}', expected YYYY-MM-DD-HH-MM-SS-ffff",
            timestamp
        )))
    }
}

fn task_index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^.*[A-Za-z_](\d+)$").expect("valid task regex"))
}

/// Controller path of the program file for `task`.
///
/// `T_ROB1` uses the bare `motion_program` name; other tasks ending in digits
/// get those digits appended. Preempting programs add a `_p<n>` suffix.
pub fn program_file_path(ramdisk: &str, task: &str, preempt_number: Option<u32>) -> String {
    let mut path = format!("{}/motion_program", ramdisk);
    if task != "T_ROB1" {
        let index = task_index_pattern()
            .captures(task)
            .and_then(|caps| caps[1].parse::<u64>().ok());
        if let Some(index) = index {
            path.push_str(&index.to_string());
        }
    }
    if let Some(n) = preempt_number {
        path.push_str(&format!("_p{}", n));
    }
    path.push_str(".bin");
    path
}

/// A motion program under construction
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    first_cmd_num: u32,
    tool: ToolData,
    wobj: WobjData,
    gripload: LoadData,
    timestamp: String,
    seqno: u32,
    egm_config: EgmConfig,
    commands: Vec<Command>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// Empty program with the default tool, work object and grip load, stamped now
    pub fn new() -> Self {
        Self {
            first_cmd_num: 1,
            tool: TOOL0,
            wobj: WobjData::default(),
            gripload: LOAD0,
            timestamp: current_timestamp(),
            seqno: 0,
            egm_config: EgmConfig::None,
            commands: Vec::new(),
        }
    }

    /// Number assigned to the first command. Preempting programs start one
    /// past the crossover command.
    pub fn with_first_cmd_num(mut self, first_cmd_num: u32) -> Self {
        self.first_cmd_num = first_cmd_num;
        self
    }

    pub fn with_tool(mut self, tool: ToolData) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_wobj(mut self, wobj: WobjData) -> Result<Self> {
        wobj.validate()?;
        self.wobj = wobj;
        Ok(self)
    }

    pub fn with_gripload(mut self, gripload: LoadData) -> Self {
        self.gripload = gripload;
        self
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Result<Self> {
        validate_timestamp(timestamp)?;
        self.timestamp = timestamp.to_string();
        Ok(self)
    }

    pub fn with_seqno(mut self, seqno: u32) -> Self {
        self.seqno = seqno;
        self
    }

    pub fn with_egm_config(mut self, egm_config: EgmConfig) -> Self {
        self.egm_config = egm_config;
        self
    }

    /// Append a command after checking its invariants
    pub fn push(&mut self, command: Command) -> Result<&mut Self> {
        command.validate()?;
        self.commands.push(command);
        Ok(self)
    }

    pub fn move_abs_j(
        &mut self,
        to_joint_pos: JointTarget,
        speed: SpeedData,
        zone: ZoneData,
    ) -> &mut Self {
        self.commands.push(Command::MoveAbsJ {
            to_joint_pos,
            speed,
            zone,
        });
        self
    }

    pub fn move_j(&mut self, to_point: RobTarget, speed: SpeedData, zone: ZoneData) -> &mut Self {
        self.commands.push(Command::MoveJ {
            to_point,
            speed,
            zone,
        });
        self
    }

    pub fn move_l(&mut self, to_point: RobTarget, speed: SpeedData, zone: ZoneData) -> &mut Self {
        self.commands.push(Command::MoveL {
            to_point,
            speed,
            zone,
        });
        self
    }

    pub fn move_c(
        &mut self,
        cir_point: RobTarget,
        to_point: RobTarget,
        speed: SpeedData,
        zone: ZoneData,
    ) -> &mut Self {
        self.commands.push(Command::MoveC {
            cir_point,
            to_point,
            speed,
            zone,
        });
        self
    }

    /// Dwell for `t` seconds; `t` must be strictly positive
    pub fn wait_time(&mut self, t: f64) -> Result<&mut Self> {
        self.push(Command::WaitTime { t })
    }

    pub fn cir_path_mode(&mut self, switch: CirPathModeSwitch) -> &mut Self {
        self.commands.push(Command::CirPathMode { switch });
        self
    }

    pub fn sync_move_on(&mut self) -> &mut Self {
        self.commands.push(Command::SyncMoveOn);
        self
    }

    pub fn sync_move_off(&mut self) -> &mut Self {
        self.commands.push(Command::SyncMoveOff);
        self
    }

    pub fn egm_run_joint(
        &mut self,
        cond_time: f64,
        ramp_in_time: f64,
        ramp_out_time: f64,
    ) -> &mut Self {
        self.commands.push(Command::EgmRunJoint {
            cond_time,
            ramp_in_time,
            ramp_out_time,
        });
        self
    }

    pub fn egm_run_pose(
        &mut self,
        cond_time: f64,
        ramp_in_time: f64,
        ramp_out_time: f64,
        offset: Pose,
    ) -> &mut Self {
        self.commands.push(Command::EgmRunPose {
            cond_time,
            ramp_in_time,
            ramp_out_time,
            offset,
        });
        self
    }

    pub fn egm_move_l(
        &mut self,
        to_point: RobTarget,
        speed: SpeedData,
        zone: ZoneData,
    ) -> &mut Self {
        self.commands.push(Command::EgmMoveL {
            to_point,
            speed,
            zone,
        });
        self
    }

    pub fn egm_move_c(
        &mut self,
        cir_point: RobTarget,
        to_point: RobTarget,
        speed: SpeedData,
        zone: ZoneData,
    ) -> &mut Self {
        self.commands.push(Command::EgmMoveC {
            cir_point,
            to_point,
            speed,
            zone,
        });
        self
    }

    pub fn first_cmd_num(&self) -> u32 {
        self.first_cmd_num
    }

    /// Number of the last command, or `None` for an empty program
    pub fn last_cmd_num(&self) -> Option<u32> {
        if self.commands.is_empty() {
            None
        } else {
            let offset = (self.commands.len() - 1) as u64;
            Some((self.first_cmd_num as u64 + offset).min(u32::MAX as u64) as u32)
        }
    }

    pub fn tool(&self) -> &ToolData {
        &self.tool
    }

    pub fn wobj(&self) -> &WobjData {
        &self.wobj
    }

    pub fn gripload(&self) -> &LoadData {
        &self.gripload
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn seqno(&self) -> u32 {
        self.seqno
    }

    pub fn egm_config(&self) -> &EgmConfig {
        &self.egm_config
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Commands paired with their wire command numbers
    pub fn numbered_commands(&self) -> impl Iterator<Item = (u32, &Command)> {
        self.commands
            .iter()
            .enumerate()
            .map(move |(i, cmd)| (self.first_cmd_num.saturating_add(i as u32), cmd))
    }

    /// Encode the program. `override_seqno` replaces the program's own sequence
    /// number in the header without modifying the program.
    pub fn serialize(&self, override_seqno: Option<u32>) -> Result<Vec<u8>> {
        let seqno = override_seqno.unwrap_or(self.seqno);
        check_wire_integer(seqno as u64, "Sequence number")?;
        let last = self.first_cmd_num as u64 + self.commands.len().saturating_sub(1) as u64;
        check_wire_integer(last, "Command number")?;

        let mut w = WireWriter::new();
        w.put_num(MOTION_PROGRAM_FILE_VERSION as f64);
        self.tool.encode(&mut w)?;
        self.wobj.encode(&mut w)?;
        self.gripload.encode(&mut w)?;
        w.put_str(&self.timestamp)?;
        w.put_num(seqno as f64);
        self.egm_config.encode(&mut w)?;

        for (cmd_num, cmd) in self.numbered_commands() {
            w.put_num(cmd_num as f64);
            w.put_num(u16::from(cmd.opcode()) as f64);
            cmd.write_params(&mut w)?;
        }

        Ok(w.into_bytes())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.serialize(None)
    }
}

fn read_u32(r: &mut WireReader<'_>, what: &str) -> Result<u32> {
    let value = r.read_count(what)?;
    u32::try_from(value).map_err(|_| {
        MotionProgramError::Format(format!("Invalid {}: {} is out of range", what, value))
    })
}

/// A program buffer decoded back into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedProgram {
    pub version: u32,
    pub tool: ToolData,
    pub wobj: WobjData,
    pub gripload: LoadData,
    pub timestamp: String,
    pub seqno: u32,
    pub egm_config: EgmConfig,
    pub commands: Vec<(u32, Command)>,
}

impl DecodedProgram {
    /// Parse a program buffer. The version must match exactly and every opcode
    /// must be known; trailing partial commands are rejected.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);

        let version = read_u32(&mut r, "version")?;
        if version != MOTION_PROGRAM_FILE_VERSION {
            return Err(MotionProgramError::Format(format!(
                "Incompatible motion program version {} (expected {})",
                version, MOTION_PROGRAM_FILE_VERSION
            )));
        }

        let tool = ToolData::decode(&mut r)?;
        let wobj = WobjData::decode(&mut r)?;
        let gripload = LoadData::decode(&mut r)?;
        let timestamp = r.read_str()?;
        let seqno = read_u32(&mut r, "seqno")?;
        let egm_config = EgmConfig::decode(&mut r)?;

        let mut commands = Vec::new();
        while !r.is_empty() {
            let cmd_num = read_u32(&mut r, "command number")?;
            let opcode = Opcode::from_wire(r.read_num()?)?;
            let cmd = Command::read_params(opcode, &mut r)?;
            commands.push((cmd_num, cmd));
        }

        Ok(Self {
            version,
            tool,
            wobj,
            gripload,
            timestamp,
            seqno,
            egm_config,
            commands,
        })
    }

    /// Rebuild an authoring-side [`Program`]. Command numbers must be contiguous.
    pub fn into_program(self) -> Result<Program> {
        let first_cmd_num = self.commands.first().map(|(n, _)| *n).unwrap_or(1);
        for (i, (cmd_num, _)) in self.commands.iter().enumerate() {
            let expected = first_cmd_num as u64 + i as u64;
            if *cmd_num as u64 != expected {
                return Err(MotionProgramError::Format(format!(
                    "Command number gap: expected {} but found {}",
                    expected, cmd_num
                )));
            }
        }

        validate_timestamp(&self.timestamp)?;
        Ok(Program {
            first_cmd_num,
            tool: self.tool,
            wobj: self.wobj,
            gripload: self.gripload,
            timestamp: self.timestamp,
            seqno: self.seqno,
            egm_config: self.egm_config,
            commands: self.commands.into_iter().map(|(_, cmd)| cmd).collect(),
        })
    }
}

impl fmt::Display for DecodedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "! format version {}", self.version)?;
        writeln!(f, "! timestamp {}", self.timestamp)?;
        writeln!(f, "! seqno {}", self.seqno)?;
        writeln!(f, "tooldata {};", self.tool)?;
        writeln!(f, "wobjdata {};", self.wobj)?;
        writeln!(f, "gripload {};", self.gripload)?;
        if self.egm_config != EgmConfig::None {
            writeln!(f, "! egm {:?}", self.egm_config)?;
        }
        for (cmd_num, cmd) in &self.commands {
            writeln!(f, "! cmd_num = {}", cmd_num)?;
            writeln!(f, "{}", cmd)?;
        }
        Ok(())
    }
}
