//! External guided motion (EGM) configuration records
//!
//! Only the configuration carried in the program header lives here. The
//! real-time correction stream itself runs over a separate UDP link that this
//! crate does not drive.

use crate::types::Pose;
use crate::wire::{WireCodec, WireReader, WireWriter};
use crate::{MotionProgramError, Result};
use int_enum::IntEnum;
use serde::{Deserialize, Serialize};

/// Convergence window for one controlled quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EgmMinMax {
    pub min: f64,
    pub max: f64,
}

impl EgmMinMax {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl WireCodec for EgmMinMax {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_num(self.min);
        w.put_num(self.max);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self::new(r.read_num()?, r.read_num()?))
    }
}

/// Frame types for corrections and sensor measurements
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum, Serialize, Deserialize)]
pub enum EgmFrameType {
    Base = 0,
    Tool = 1,
    Wobj = 2,
    World = 3,
    Joint = 4,
}

impl WireCodec for EgmFrameType {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_num(u8::from(*self) as f64);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let raw = r.read_count("EGM frame type")?;
        u8::try_from(raw)
            .ok()
            .and_then(|v| EgmFrameType::try_from(v).ok())
            .ok_or_else(|| MotionProgramError::Format(format!("Invalid EGM frame type: {}", raw)))
    }
}

/// Joint target guidance: per-joint convergence and deviation limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EgmJointTargetConfig {
    pub joints: [EgmMinMax; 6],
    /// Max joint deviation in degrees
    pub max_pos_deviation: f64,
    /// Max joint speed deviation in degrees/second
    pub max_speed_deviation: f64,
}

/// Pose target guidance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EgmPoseTargetConfig {
    pub corr_frame: Pose,
    pub corr_fr_type: EgmFrameType,
    pub sensor_frame: Pose,
    pub sensor_fr_type: EgmFrameType,
    /// Convergence windows for x, y, z, rx, ry, rz
    pub axes: [EgmMinMax; 6],
    pub max_pos_deviation: f64,
    pub max_speed_deviation: f64,
}

/// Path correction guidance, used with `EgmMoveL` / `EgmMoveC`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EgmPathCorrectionConfig {
    pub sensor_frame: Pose,
}

/// Guidance mode for a whole program. The variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EgmConfig {
    /// No guidance; the controller may still stream feedback
    #[default]
    None,
    JointTarget(EgmJointTargetConfig),
    PoseTarget(EgmPoseTargetConfig),
    PathCorrection(EgmPathCorrectionConfig),
}

impl EgmConfig {
    pub fn tag(&self) -> u8 {
        match self {
            EgmConfig::None => 0,
            EgmConfig::JointTarget(_) => 1,
            EgmConfig::PoseTarget(_) => 2,
            EgmConfig::PathCorrection(_) => 3,
        }
    }
}

fn encode_minmax(w: &mut WireWriter, values: &[EgmMinMax]) -> Result<()> {
    for v in values {
        v.encode(w)?;
    }
    Ok(())
}

fn decode_minmax6(r: &mut WireReader<'_>) -> Result<[EgmMinMax; 6]> {
    let mut out = [EgmMinMax::new(0.0, 0.0); 6];
    for v in out.iter_mut() {
        *v = EgmMinMax::decode(r)?;
    }
    Ok(out)
}

impl WireCodec for EgmConfig {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_num(self.tag() as f64);
        match self {
            EgmConfig::None => Ok(()),
            EgmConfig::JointTarget(c) => {
                encode_minmax(w, &c.joints)?;
                w.put_num(c.max_pos_deviation);
                w.put_num(c.max_speed_deviation);
                Ok(())
            }
            EgmConfig::PoseTarget(c) => {
                c.corr_frame.encode(w)?;
                c.corr_fr_type.encode(w)?;
                c.sensor_frame.encode(w)?;
                c.sensor_fr_type.encode(w)?;
                encode_minmax(w, &c.axes)?;
                w.put_num(c.max_pos_deviation);
                w.put_num(c.max_speed_deviation);
                Ok(())
            }
            EgmConfig::PathCorrection(c) => c.sensor_frame.encode(w),
        }
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        match r.read_count("EGM mode")? {
            0 => Ok(EgmConfig::None),
            1 => Ok(EgmConfig::JointTarget(EgmJointTargetConfig {
                joints: decode_minmax6(r)?,
                max_pos_deviation: r.read_num()?,
                max_speed_deviation: r.read_num()?,
            })),
            2 => Ok(EgmConfig::PoseTarget(EgmPoseTargetConfig {
                corr_frame: Pose::decode(r)?,
                corr_fr_type: EgmFrameType::decode(r)?,
                sensor_frame: Pose::decode(r)?,
                sensor_fr_type: EgmFrameType::decode(r)?,
                axes: decode_minmax6(r)?,
                max_pos_deviation: r.read_num()?,
                max_speed_deviation: r.read_num()?,
            })),
            3 => Ok(EgmConfig::PathCorrection(EgmPathCorrectionConfig {
                sensor_frame: Pose::decode(r)?,
            })),
            other => Err(MotionProgramError::Format(format!("Invalid EGM mode: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(config: &EgmConfig) -> Vec<u8> {
        let mut w = WireWriter::new();
        config.encode(&mut w).unwrap();
        w.into_bytes()
    }

    #[test]
    fn test_payload_sizes() {
        assert_eq!(encoded(&EgmConfig::None).len(), 4);

        let joint = EgmConfig::JointTarget(EgmJointTargetConfig {
            joints: [EgmMinMax::new(-0.1, 0.1); 6],
            max_pos_deviation: 1000.0,
            max_speed_deviation: 1000.0,
        });
        assert_eq!(encoded(&joint).len(), 4 + (12 + 2) * 4);

        let pose = EgmConfig::PoseTarget(EgmPoseTargetConfig {
            corr_frame: Pose::IDENTITY,
            corr_fr_type: EgmFrameType::Wobj,
            sensor_frame: Pose::IDENTITY,
            sensor_fr_type: EgmFrameType::Wobj,
            axes: [EgmMinMax::new(-1.0, 1.0); 6],
            max_pos_deviation: 1000.0,
            max_speed_deviation: 1000.0,
        });
        assert_eq!(encoded(&pose).len(), 4 + (7 + 1 + 7 + 1 + 12 + 2) * 4);

        let path = EgmConfig::PathCorrection(EgmPathCorrectionConfig {
            sensor_frame: Pose::IDENTITY,
        });
        let bytes = encoded(&path);
        assert_eq!(bytes.len(), 4 + 7 * 4);
        assert_eq!(&bytes[0..4], &3.0f32.to_le_bytes());
    }

    #[test]
    fn test_pose_target_decode() {
        let pose = EgmConfig::PoseTarget(EgmPoseTargetConfig {
            corr_frame: Pose::new([0.0, 0.0, 10.0], [1.0, 0.0, 0.0, 0.0]),
            corr_fr_type: EgmFrameType::Tool,
            sensor_frame: Pose::IDENTITY,
            sensor_fr_type: EgmFrameType::World,
            axes: [EgmMinMax::new(-1.0, 1.0); 6],
            max_pos_deviation: 500.0,
            max_speed_deviation: 250.0,
        });
        let bytes = encoded(&pose);
        let decoded = EgmConfig::decode(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(decoded, pose);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let mut w = WireWriter::new();
        w.put_num(9.0);
        let bytes = w.into_bytes();
        assert!(EgmConfig::decode(&mut WireReader::new(&bytes)).is_err());
    }
}
