//! Controller value types
//!
//! Fixed-shape records mirroring the controller's own data types. Each one has a
//! binary form (see [`WireCodec`]) and a bracketed text form via `Display` that
//! follows the controller's aggregate literal syntax.

use crate::wire::{WireCodec, WireReader, WireWriter, PADDED_STR_LEN};
use crate::{MotionProgramError, Result};
use int_enum::IntEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Copy a slice into a fixed-length array, rejecting any other length
pub(crate) fn fixed_array<const N: usize>(values: &[f64], what: &str) -> Result<[f64; N]> {
    values.try_into().map_err(|_| {
        MotionProgramError::Validation(format!(
            "Invalid {}, expected array length {} but got {}",
            what,
            N,
            values.len()
        ))
    })
}

pub(crate) fn fmt_nums(f: &mut fmt::Formatter<'_>, values: &[f64]) -> fmt::Result {
    write!(f, "[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, "]")
}

fn fmt_bool(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Cartesian frame: translation in mm and scalar-first quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub trans: [f64; 3],
    pub rot: [f64; 4],
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        trans: [0.0, 0.0, 0.0],
        rot: [1.0, 0.0, 0.0, 0.0],
    };

    pub const fn new(trans: [f64; 3], rot: [f64; 4]) -> Self {
        Self { trans, rot }
    }

    pub fn from_slices(trans: &[f64], rot: &[f64]) -> Result<Self> {
        Ok(Self {
            trans: fixed_array(trans, "translation")?,
            rot: fixed_array(rot, "rotation")?,
        })
    }
}

impl WireCodec for Pose {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_nums(&self.trans);
        w.put_nums(&self.rot);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            trans: r.read_nums()?,
            rot: r.read_nums()?,
        })
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        fmt_nums(f, &self.trans)?;
        write!(f, ",")?;
        fmt_nums(f, &self.rot)?;
        write!(f, "]")
    }
}

/// Joint-space target: six robot axes and six external axes, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointTarget {
    pub robax: [f64; 6],
    pub extax: [f64; 6],
}

impl JointTarget {
    pub const fn new(robax: [f64; 6], extax: [f64; 6]) -> Self {
        Self { robax, extax }
    }

    pub fn from_slices(robax: &[f64], extax: &[f64]) -> Result<Self> {
        Ok(Self {
            robax: fixed_array(robax, "joint vector")?,
            extax: fixed_array(extax, "external axes")?,
        })
    }
}

impl WireCodec for JointTarget {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_nums(&self.robax);
        w.put_nums(&self.extax);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            robax: r.read_nums()?,
            extax: r.read_nums()?,
        })
    }
}

impl fmt::Display for JointTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        fmt_nums(f, &self.robax)?;
        write!(f, ",")?;
        fmt_nums(f, &self.extax)?;
        write!(f, "]")
    }
}

/// Axis configuration used to pick an inverse kinematics branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfData {
    /// Quadrant of axis 1
    pub cf1: i32,
    /// Quadrant of axis 4
    pub cf4: i32,
    /// Quadrant of axis 6
    pub cf6: i32,
    /// Wrist/arm configuration index
    pub cfx: i32,
}

impl ConfData {
    pub const fn new(cf1: i32, cf4: i32, cf6: i32, cfx: i32) -> Self {
        Self { cf1, cf4, cf6, cfx }
    }
}

fn read_int(r: &mut WireReader<'_>, what: &str) -> Result<i32> {
    let value = r.read_num()?;
    if value.fract() != 0.0 {
        return Err(MotionProgramError::Format(format!(
            "Expected integral {} but found {}",
            what, value
        )));
    }
    Ok(value as i32)
}

impl WireCodec for ConfData {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_nums(&[
            self.cf1 as f64,
            self.cf4 as f64,
            self.cf6 as f64,
            self.cfx as f64,
        ]);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            cf1: read_int(r, "cf1")?,
            cf4: read_int(r, "cf4")?,
            cf6: read_int(r, "cf6")?,
            cfx: read_int(r, "cfx")?,
        })
    }
}

impl fmt::Display for ConfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{},{}]", self.cf1, self.cf4, self.cf6, self.cfx)
    }
}

/// Cartesian target with configuration and external axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobTarget {
    pub trans: [f64; 3],
    pub rot: [f64; 4],
    pub robconf: ConfData,
    pub extax: [f64; 6],
}

impl RobTarget {
    pub const fn new(trans: [f64; 3], rot: [f64; 4], robconf: ConfData, extax: [f64; 6]) -> Self {
        Self {
            trans,
            rot,
            robconf,
            extax,
        }
    }

    pub fn from_slices(
        trans: &[f64],
        rot: &[f64],
        robconf: ConfData,
        extax: &[f64],
    ) -> Result<Self> {
        Ok(Self {
            trans: fixed_array(trans, "translation")?,
            rot: fixed_array(rot, "rotation")?,
            robconf,
            extax: fixed_array(extax, "external axes")?,
        })
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.trans, self.rot)
    }
}

impl WireCodec for RobTarget {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_nums(&self.trans);
        w.put_nums(&self.rot);
        self.robconf.encode(w)?;
        w.put_nums(&self.extax);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            trans: r.read_nums()?,
            rot: r.read_nums()?,
            robconf: ConfData::decode(r)?,
            extax: r.read_nums()?,
        })
    }
}

impl fmt::Display for RobTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        fmt_nums(f, &self.trans)?;
        write!(f, ",")?;
        fmt_nums(f, &self.rot)?;
        write!(f, ",{},", self.robconf)?;
        fmt_nums(f, &self.extax)?;
        write!(f, "]")
    }
}

/// Velocities for TCP (mm/s), orientation (deg/s), linear and rotary external axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedData {
    pub v_tcp: f64,
    pub v_ori: f64,
    pub v_leax: f64,
    pub v_reax: f64,
}

impl SpeedData {
    pub const fn new(v_tcp: f64, v_ori: f64, v_leax: f64, v_reax: f64) -> Self {
        Self {
            v_tcp,
            v_ori,
            v_leax,
            v_reax,
        }
    }

    /// Preset with the given TCP speed and the standard secondary speeds
    const fn preset(v_tcp: f64) -> Self {
        Self::new(v_tcp, 500.0, 5000.0, 1000.0)
    }
}

impl WireCodec for SpeedData {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_nums(&[self.v_tcp, self.v_ori, self.v_leax, self.v_reax]);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let [v_tcp, v_ori, v_leax, v_reax] = r.read_nums()?;
        Ok(Self::new(v_tcp, v_ori, v_leax, v_reax))
    }
}

impl fmt::Display for SpeedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_nums(f, &[self.v_tcp, self.v_ori, self.v_leax, self.v_reax])
    }
}

pub const V5: SpeedData = SpeedData::preset(5.0);
pub const V10: SpeedData = SpeedData::preset(10.0);
pub const V20: SpeedData = SpeedData::preset(20.0);
pub const V30: SpeedData = SpeedData::preset(30.0);
pub const V40: SpeedData = SpeedData::preset(40.0);
pub const V50: SpeedData = SpeedData::preset(50.0);
pub const V60: SpeedData = SpeedData::preset(60.0);
pub const V80: SpeedData = SpeedData::preset(80.0);
pub const V100: SpeedData = SpeedData::preset(100.0);
pub const V150: SpeedData = SpeedData::preset(150.0);
pub const V200: SpeedData = SpeedData::preset(200.0);
pub const V300: SpeedData = SpeedData::preset(300.0);
pub const V400: SpeedData = SpeedData::preset(400.0);
pub const V500: SpeedData = SpeedData::preset(500.0);
pub const V600: SpeedData = SpeedData::preset(600.0);
pub const V800: SpeedData = SpeedData::preset(800.0);
pub const V1000: SpeedData = SpeedData::preset(1000.0);
pub const V1500: SpeedData = SpeedData::preset(1500.0);
pub const V2000: SpeedData = SpeedData::preset(2000.0);
pub const V2500: SpeedData = SpeedData::preset(2500.0);
pub const V3000: SpeedData = SpeedData::preset(3000.0);
pub const V4000: SpeedData = SpeedData::preset(4000.0);
pub const V5000: SpeedData = SpeedData::preset(5000.0);
pub const V6000: SpeedData = SpeedData::preset(6000.0);
pub const V7000: SpeedData = SpeedData::preset(7000.0);
pub const VMAX: SpeedData = SpeedData::preset(10000.0);

/// Blend zone. `finep` marks a stop point; the radii are always carried so the
/// record has a fixed size on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneData {
    pub finep: bool,
    pub pzone_tcp: f64,
    pub pzone_ori: f64,
    pub pzone_eax: f64,
    pub zone_ori: f64,
    pub zone_leax: f64,
    pub zone_reax: f64,
}

impl ZoneData {
    pub const fn new(finep: bool, radii: [f64; 6]) -> Self {
        Self {
            finep,
            pzone_tcp: radii[0],
            pzone_ori: radii[1],
            pzone_eax: radii[2],
            zone_ori: radii[3],
            zone_leax: radii[4],
            zone_reax: radii[5],
        }
    }

    pub fn radii(&self) -> [f64; 6] {
        [
            self.pzone_tcp,
            self.pzone_ori,
            self.pzone_eax,
            self.zone_ori,
            self.zone_leax,
            self.zone_reax,
        ]
    }
}

impl WireCodec for ZoneData {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_bool(self.finep);
        w.put_nums(&self.radii());
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let finep = r.read_bool()?;
        Ok(Self::new(finep, r.read_nums()?))
    }
}

impl fmt::Display for ZoneData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},", fmt_bool(self.finep))?;
        let radii = self.radii();
        for (i, v) in radii.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

pub const FINE: ZoneData = ZoneData::new(true, [0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
pub const Z0: ZoneData = ZoneData::new(false, [0.3, 0.3, 0.3, 0.03, 0.3, 0.03]);
pub const Z1: ZoneData = ZoneData::new(false, [1.0, 1.0, 1.0, 0.1, 1.0, 0.1]);
pub const Z5: ZoneData = ZoneData::new(false, [5.0, 8.0, 8.0, 0.8, 8.0, 0.8]);
pub const Z10: ZoneData = ZoneData::new(false, [10.0, 15.0, 15.0, 1.5, 15.0, 1.5]);
pub const Z15: ZoneData = ZoneData::new(false, [15.0, 23.0, 23.0, 2.3, 23.0, 2.3]);
pub const Z20: ZoneData = ZoneData::new(false, [20.0, 30.0, 30.0, 3.0, 30.0, 3.0]);
pub const Z30: ZoneData = ZoneData::new(false, [30.0, 45.0, 45.0, 4.5, 45.0, 4.5]);
pub const Z40: ZoneData = ZoneData::new(false, [40.0, 60.0, 60.0, 6.0, 60.0, 6.0]);
pub const Z50: ZoneData = ZoneData::new(false, [50.0, 75.0, 75.0, 7.5, 75.0, 7.5]);
pub const Z60: ZoneData = ZoneData::new(false, [60.0, 90.0, 90.0, 9.0, 90.0, 9.0]);
pub const Z80: ZoneData = ZoneData::new(false, [80.0, 120.0, 120.0, 12.0, 120.0, 12.0]);
pub const Z100: ZoneData = ZoneData::new(false, [100.0, 150.0, 150.0, 15.0, 150.0, 15.0]);
pub const Z150: ZoneData = ZoneData::new(false, [150.0, 225.0, 225.0, 23.0, 225.0, 23.0]);
pub const Z200: ZoneData = ZoneData::new(false, [200.0, 300.0, 300.0, 30.0, 300.0, 30.0]);

/// Payload description: mass (kg), center of gravity (mm), axes of moment and inertia
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadData {
    pub mass: f64,
    pub cog: [f64; 3],
    pub aom: [f64; 4],
    pub ix: f64,
    pub iy: f64,
    pub iz: f64,
}

impl LoadData {
    pub const fn new(mass: f64, cog: [f64; 3], aom: [f64; 4], ix: f64, iy: f64, iz: f64) -> Self {
        Self {
            mass,
            cog,
            aom,
            ix,
            iy,
            iz,
        }
    }

    pub fn from_slices(mass: f64, cog: &[f64], aom: &[f64], inertia: [f64; 3]) -> Result<Self> {
        Ok(Self {
            mass,
            cog: fixed_array(cog, "center of gravity")?,
            aom: fixed_array(aom, "axes of moment")?,
            ix: inertia[0],
            iy: inertia[1],
            iz: inertia[2],
        })
    }
}

impl WireCodec for LoadData {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_num(self.mass);
        w.put_nums(&self.cog);
        w.put_nums(&self.aom);
        w.put_nums(&[self.ix, self.iy, self.iz]);
        Ok(())
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let mass = r.read_num()?;
        let cog = r.read_nums()?;
        let aom = r.read_nums()?;
        let [ix, iy, iz] = r.read_nums()?;
        Ok(Self::new(mass, cog, aom, ix, iy, iz))
    }
}

impl fmt::Display for LoadData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},", self.mass)?;
        fmt_nums(f, &self.cog)?;
        write!(f, ",")?;
        fmt_nums(f, &self.aom)?;
        write!(f, ",{},{},{}]", self.ix, self.iy, self.iz)
    }
}

/// Negligible load used when nothing is held
pub const LOAD0: LoadData =
    LoadData::new(0.001, [0.0, 0.0, 0.001], [1.0, 0.0, 0.0, 0.0], 0.0, 0.0, 0.0);

/// Tool: held-by-robot flag, tool frame and tool load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolData {
    pub robhold: bool,
    pub tframe: Pose,
    pub tload: LoadData,
}

impl ToolData {
    pub const fn new(robhold: bool, tframe: Pose, tload: LoadData) -> Self {
        Self {
            robhold,
            tframe,
            tload,
        }
    }
}

impl Default for ToolData {
    fn default() -> Self {
        TOOL0
    }
}

impl WireCodec for ToolData {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.put_bool(self.robhold);
        self.tframe.encode(w)?;
        self.tload.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            robhold: r.read_bool()?,
            tframe: Pose::decode(r)?,
            tload: LoadData::decode(r)?,
        })
    }
}

impl fmt::Display for ToolData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", fmt_bool(self.robhold), self.tframe, self.tload)
    }
}

pub const TOOL0: ToolData = ToolData::new(true, Pose::IDENTITY, LOAD0);

/// Work object: holding flags, coordinating mechanical unit, user and object frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WobjData {
    pub robhold: bool,
    pub ufprog: bool,
    pub ufmec: String,
    pub uframe: Pose,
    pub oframe: Pose,
}

impl WobjData {
    pub fn new(
        robhold: bool,
        ufprog: bool,
        ufmec: &str,
        uframe: Pose,
        oframe: Pose,
    ) -> Result<Self> {
        let wobj = Self {
            robhold,
            ufprog,
            ufmec: ufmec.to_string(),
            uframe,
            oframe,
        };
        wobj.validate()?;
        Ok(wobj)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.ufmec.is_ascii() || self.ufmec.len() > PADDED_STR_LEN {
            return Err(MotionProgramError::Validation(format!(
                "Mechanical unit name '{}' must be ASCII and at most {} bytes",
                self.ufmec, PADDED_STR_LEN
            )));
        }
        Ok(())
    }
}

/// The controller's `wobj0`: fixed user frame, no coordinating unit
impl Default for WobjData {
    fn default() -> Self {
        Self {
            robhold: false,
            ufprog: true,
            ufmec: String::new(),
            uframe: Pose::IDENTITY,
            oframe: Pose::IDENTITY,
        }
    }
}

impl WireCodec for WobjData {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        self.validate()?;
        w.put_bool(self.robhold);
        w.put_bool(self.ufprog);
        w.put_padded_str(&self.ufmec)?;
        self.uframe.encode(w)?;
        self.oframe.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        Ok(Self {
            robhold: r.read_bool()?,
            ufprog: r.read_bool()?,
            ufmec: r.read_padded_str()?,
            uframe: Pose::decode(r)?,
            oframe: Pose::decode(r)?,
        })
    }
}

impl fmt::Display for WobjData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{},\"{}\",{},{}]",
            fmt_bool(self.robhold),
            fmt_bool(self.ufprog),
            self.ufmec,
            self.uframe,
            self.oframe
        )
    }
}

/// Interpretation of tool orientation during circular moves
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum, Serialize, Deserialize)]
pub enum CirPathModeSwitch {
    PathFrame = 1,
    ObjectFrame = 2,
    CirPointOri = 3,
    Wrist45 = 4,
    Wrist46 = 5,
    Wrist56 = 6,
}

impl fmt::Display for CirPathModeSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CirPathModeSwitch::PathFrame => "PathFrame",
            CirPathModeSwitch::ObjectFrame => "ObjectFrame",
            CirPathModeSwitch::CirPointOri => "CirPointOri",
            CirPathModeSwitch::Wrist45 => "Wrist45",
            CirPathModeSwitch::Wrist46 => "Wrist46",
            CirPathModeSwitch::Wrist56 => "Wrist56",
        };
        write!(f, "{}", name)
    }
}
