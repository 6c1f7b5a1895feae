//! Motion program commands
//!
//! A closed set of commands, each with a fixed opcode and a fixed-size parameter
//! block. Ordinary motion and control commands use small opcodes; the external
//! guidance commands live in a separate range starting at 50001.

use crate::types::{CirPathModeSwitch, JointTarget, Pose, RobTarget, SpeedData, ZoneData};
use crate::wire::{WireCodec, WireReader, WireWriter};
use crate::{MotionProgramError, Result};
use int_enum::IntEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire opcodes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntEnum)]
pub enum Opcode {
    MoveAbsJ = 1,
    MoveJ = 2,
    MoveL = 3,
    MoveC = 4,
    WaitTime = 5,
    CirPathMode = 6,
    SyncMoveOn = 7,
    SyncMoveOff = 8,
    EgmRunJoint = 50001,
    EgmRunPose = 50002,
    EgmMoveL = 50003,
    EgmMoveC = 50004,
}

impl Opcode {
    /// Interpret a decoded wire float as an opcode. Anything unknown is
    /// corruption: payload sizes depend on the opcode, so there is no way to skip.
    pub fn from_wire(value: f64) -> Result<Self> {
        if value.fract() != 0.0 || value < 0.0 || value > u16::MAX as f64 {
            return Err(MotionProgramError::Format(format!("Invalid opcode: {}", value)));
        }
        Opcode::try_from(value as u16)
            .map_err(|_| MotionProgramError::Format(format!("Unknown opcode: {}", value)))
    }

    pub fn is_egm(self) -> bool {
        u16::from(self) > 50000
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    MoveAbsJ {
        to_joint_pos: JointTarget,
        speed: SpeedData,
        zone: ZoneData,
    },
    MoveJ {
        to_point: RobTarget,
        speed: SpeedData,
        zone: ZoneData,
    },
    MoveL {
        to_point: RobTarget,
        speed: SpeedData,
        zone: ZoneData,
    },
    MoveC {
        cir_point: RobTarget,
        to_point: RobTarget,
        speed: SpeedData,
        zone: ZoneData,
    },
    /// Dwell, in seconds
    WaitTime { t: f64 },
    CirPathMode { switch: CirPathModeSwitch },
    SyncMoveOn,
    SyncMoveOff,
    #[serde(rename = "EGMRunJoint")]
    EgmRunJoint {
        cond_time: f64,
        ramp_in_time: f64,
        ramp_out_time: f64,
    },
    #[serde(rename = "EGMRunPose")]
    EgmRunPose {
        cond_time: f64,
        ramp_in_time: f64,
        ramp_out_time: f64,
        offset: Pose,
    },
    #[serde(rename = "EGMMoveL")]
    EgmMoveL {
        to_point: RobTarget,
        speed: SpeedData,
        zone: ZoneData,
    },
    #[serde(rename = "EGMMoveC")]
    EgmMoveC {
        cir_point: RobTarget,
        to_point: RobTarget,
        speed: SpeedData,
        zone: ZoneData,
    },
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::MoveAbsJ { .. } => Opcode::MoveAbsJ,
            Command::MoveJ { .. } => Opcode::MoveJ,
            Command::MoveL { .. } => Opcode::MoveL,
            Command::MoveC { .. } => Opcode::MoveC,
            Command::WaitTime { .. } => Opcode::WaitTime,
            Command::CirPathMode { .. } => Opcode::CirPathMode,
            Command::SyncMoveOn => Opcode::SyncMoveOn,
            Command::SyncMoveOff => Opcode::SyncMoveOff,
            Command::EgmRunJoint { .. } => Opcode::EgmRunJoint,
            Command::EgmRunPose { .. } => Opcode::EgmRunPose,
            Command::EgmMoveL { .. } => Opcode::EgmMoveL,
            Command::EgmMoveC { .. } => Opcode::EgmMoveC,
        }
    }

    /// Check invariants that the type system does not already enforce
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::WaitTime { t } if !(t.is_finite() && *t > 0.0) => Err(
                MotionProgramError::Validation(format!("WaitTime must be positive, got {}", t)),
            ),
            _ => Ok(()),
        }
    }

    /// Write the parameter block (without command number or opcode)
    pub fn write_params(&self, w: &mut WireWriter) -> Result<()> {
        self.validate()?;
        match self {
            Command::MoveAbsJ {
                to_joint_pos,
                speed,
                zone,
            } => {
                to_joint_pos.encode(w)?;
                speed.encode(w)?;
                zone.encode(w)
            }
            Command::MoveJ {
                to_point,
                speed,
                zone,
            }
            | Command::MoveL {
                to_point,
                speed,
                zone,
            }
            | Command::EgmMoveL {
                to_point,
                speed,
                zone,
            } => {
                to_point.encode(w)?;
                speed.encode(w)?;
                zone.encode(w)
            }
            Command::MoveC {
                cir_point,
                to_point,
                speed,
                zone,
            }
            | Command::EgmMoveC {
                cir_point,
                to_point,
                speed,
                zone,
            } => {
                cir_point.encode(w)?;
                to_point.encode(w)?;
                speed.encode(w)?;
                zone.encode(w)
            }
            Command::WaitTime { t } => {
                w.put_num(*t);
                Ok(())
            }
            Command::CirPathMode { switch } => {
                w.put_num(u8::from(*switch) as f64);
                Ok(())
            }
            Command::SyncMoveOn | Command::SyncMoveOff => Ok(()),
            Command::EgmRunJoint {
                cond_time,
                ramp_in_time,
                ramp_out_time,
            } => {
                w.put_nums(&[*cond_time, *ramp_in_time, *ramp_out_time]);
                Ok(())
            }
            Command::EgmRunPose {
                cond_time,
                ramp_in_time,
                ramp_out_time,
                offset,
            } => {
                w.put_nums(&[*cond_time, *ramp_in_time, *ramp_out_time]);
                offset.encode(w)
            }
        }
    }

    /// Read the parameter block for `opcode`
    pub fn read_params(opcode: Opcode, r: &mut WireReader<'_>) -> Result<Self> {
        let cmd = match opcode {
            Opcode::MoveAbsJ => Command::MoveAbsJ {
                to_joint_pos: JointTarget::decode(r)?,
                speed: SpeedData::decode(r)?,
                zone: ZoneData::decode(r)?,
            },
            Opcode::MoveJ => Command::MoveJ {
                to_point: RobTarget::decode(r)?,
                speed: SpeedData::decode(r)?,
                zone: ZoneData::decode(r)?,
            },
            Opcode::MoveL => Command::MoveL {
                to_point: RobTarget::decode(r)?,
                speed: SpeedData::decode(r)?,
                zone: ZoneData::decode(r)?,
            },
            Opcode::MoveC => Command::MoveC {
                cir_point: RobTarget::decode(r)?,
                to_point: RobTarget::decode(r)?,
                speed: SpeedData::decode(r)?,
                zone: ZoneData::decode(r)?,
            },
            Opcode::WaitTime => Command::WaitTime { t: r.read_num()? },
            Opcode::CirPathMode => {
                let raw = r.read_count("CirPathMode switch")?;
                let switch = u8::try_from(raw)
                    .ok()
                    .and_then(|v| CirPathModeSwitch::try_from(v).ok())
                    .ok_or_else(|| {
                        MotionProgramError::Format(format!("Invalid CirPathMode switch: {}", raw))
                    })?;
                Command::CirPathMode { switch }
            }
            Opcode::SyncMoveOn => Command::SyncMoveOn,
            Opcode::SyncMoveOff => Command::SyncMoveOff,
            Opcode::EgmRunJoint => {
                let [cond_time, ramp_in_time, ramp_out_time] = r.read_nums()?;
                Command::EgmRunJoint {
                    cond_time,
                    ramp_in_time,
                    ramp_out_time,
                }
            }
            Opcode::EgmRunPose => {
                let [cond_time, ramp_in_time, ramp_out_time] = r.read_nums()?;
                Command::EgmRunPose {
                    cond_time,
                    ramp_in_time,
                    ramp_out_time,
                    offset: Pose::decode(r)?,
                }
            }
            Opcode::EgmMoveL => Command::EgmMoveL {
                to_point: RobTarget::decode(r)?,
                speed: SpeedData::decode(r)?,
                zone: ZoneData::decode(r)?,
            },
            Opcode::EgmMoveC => Command::EgmMoveC {
                cir_point: RobTarget::decode(r)?,
                to_point: RobTarget::decode(r)?,
                speed: SpeedData::decode(r)?,
                zone: ZoneData::decode(r)?,
            },
        };
        Ok(cmd)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::MoveAbsJ {
                to_joint_pos,
                speed,
                zone,
            } => write!(f, "MoveAbsJ {}, {}, {};", to_joint_pos, speed, zone),
            Command::MoveJ {
                to_point,
                speed,
                zone,
            } => write!(f, "MoveJ {}, {}, {};", to_point, speed, zone),
            Command::MoveL {
                to_point,
                speed,
                zone,
            } => write!(f, "MoveL {}, {}, {};", to_point, speed, zone),
            Command::MoveC {
                cir_point,
                to_point,
                speed,
                zone,
            } => write!(f, "MoveC {}, {}, {}, {};", cir_point, to_point, speed, zone),
            Command::WaitTime { t } => write!(f, "WaitTime {};", t),
            Command::CirPathMode { switch } => write!(f, "CirPathMode\\{};", switch),
            Command::SyncMoveOn => write!(f, "SyncMoveOn;"),
            Command::SyncMoveOff => write!(f, "SyncMoveOff;"),
            Command::EgmRunJoint {
                cond_time,
                ramp_in_time,
                ramp_out_time,
            } => write!(f, "EGMRunJoint {}, {}, {};", cond_time, ramp_in_time, ramp_out_time),
            Command::EgmRunPose {
                cond_time,
                ramp_in_time,
                ramp_out_time,
                offset,
            } => write!(
                f,
                "EGMRunPose {}, {}, {}, {};",
                cond_time, ramp_in_time, ramp_out_time, offset
            ),
            Command::EgmMoveL {
                to_point,
                speed,
                zone,
            } => write!(f, "EGMMoveL {}, {}, {};", to_point, speed, zone),
            Command::EgmMoveC {
                cir_point,
                to_point,
                speed,
                zone,
            } => write!(f, "EGMMoveC {}, {}, {}, {};", cir_point, to_point, speed, zone),
        }
    }
}
