//! Effect kinds and their parameter sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default tempo multiplier.
pub const DEFAULT_SPEED: f64 = 1.0;
/// Default output volume multiplier.
pub const DEFAULT_VOLUME: f64 = 0.8;
/// Default pitch multiplier.
pub const DEFAULT_PITCH: f64 = 1.0;
/// Default reverb amount (percent, 0 disables the echo stage).
pub const DEFAULT_REVERB_AMOUNT: f64 = 0.0;
/// Default bass gain in dB.
pub const DEFAULT_BASS_GAIN: f64 = 0.0;
/// Default flanger depth (0 disables the flanger stage).
pub const DEFAULT_FLANGER_MIX: f64 = 0.0;

/// Accepted tempo range of the `atempo` filter.
pub const SPEED_RANGE: (f64, f64) = (0.5, 100.0);
/// Accepted reverb range (percent).
pub const REVERB_RANGE: (f64, f64) = (0.0, 100.0);
/// Accepted flanger depth range.
pub const FLANGER_RANGE: (f64, f64) = (0.0, 10.0);
/// Accepted bass gain range (dB).
pub const BASS_GAIN_RANGE: (f64, f64) = (-900.0, 900.0);

/// Errors raised while building a parameter set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    #[error("Invalid effect type: {0}")]
    UnknownEffect(String),

    #[error("Invalid value for {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Supported transform categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    #[serde(rename = "speedup")]
    Speedup,
    #[serde(rename = "slowed")]
    Slowed,
    #[serde(rename = "nightcore")]
    Nightcore,
    #[serde(rename = "alleffects", alias = "all-effects")]
    AllEffects,
}

impl EffectKind {
    /// All kinds, in declaration order.
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Speedup,
        EffectKind::Slowed,
        EffectKind::Nightcore,
        EffectKind::AllEffects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Speedup => "speedup",
            EffectKind::Slowed => "slowed",
            EffectKind::Nightcore => "nightcore",
            EffectKind::AllEffects => "alleffects",
        }
    }

    /// Name of the worker function that runs this kind.
    pub fn function_name(&self) -> &'static str {
        match self {
            EffectKind::Speedup => "speedup_audio",
            EffectKind::Slowed => "slowed_reverb_audio",
            EffectKind::Nightcore => "nightcore_audio",
            EffectKind::AllEffects => "alleffects_audio",
        }
    }

    /// Suffix appended to the input stem to name the produced file.
    pub fn output_suffix(&self) -> &'static str {
        match self {
            EffectKind::Speedup => "speedup",
            EffectKind::Slowed => "slowed_reverb",
            EffectKind::Nightcore => "nightcore",
            EffectKind::AllEffects => "alleffects",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectKind {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "speedup" => Ok(EffectKind::Speedup),
            "slowed" => Ok(EffectKind::Slowed),
            "nightcore" => Ok(EffectKind::Nightcore),
            "alleffects" | "all-effects" => Ok(EffectKind::AllEffects),
            other => Err(ParamsError::UnknownEffect(other.to_string())),
        }
    }
}

/// Tagged parameter set; each variant carries only the fields its kind uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect_type")]
pub enum EffectParams {
    #[serde(rename = "speedup")]
    Speedup {
        #[serde(default = "default_speed")]
        speed: f64,
        #[serde(default = "default_volume")]
        volume: f64,
    },
    #[serde(rename = "slowed")]
    Slowed {
        #[serde(default = "default_speed")]
        speed: f64,
        #[serde(default = "default_reverb_amount")]
        reverb_amount: f64,
        #[serde(default = "default_volume")]
        volume: f64,
    },
    #[serde(rename = "nightcore")]
    Nightcore {
        #[serde(default = "default_speed")]
        speed: f64,
        #[serde(default = "default_pitch")]
        pitch: f64,
        #[serde(default = "default_volume")]
        volume: f64,
    },
    #[serde(rename = "alleffects", alias = "all-effects")]
    AllEffects {
        #[serde(default = "default_speed")]
        speed: f64,
        #[serde(default = "default_pitch")]
        pitch: f64,
        #[serde(default = "default_reverb_amount")]
        reverb_amount: f64,
        #[serde(default = "default_volume")]
        volume: f64,
        #[serde(default = "default_bass_gain")]
        bass_gain: f64,
        #[serde(default = "default_flanger_mix")]
        flanger_mix: f64,
    },
}

fn default_speed() -> f64 {
    DEFAULT_SPEED
}

fn default_volume() -> f64 {
    DEFAULT_VOLUME
}

fn default_pitch() -> f64 {
    DEFAULT_PITCH
}

fn default_reverb_amount() -> f64 {
    DEFAULT_REVERB_AMOUNT
}

fn default_bass_gain() -> f64 {
    DEFAULT_BASS_GAIN
}

fn default_flanger_mix() -> f64 {
    DEFAULT_FLANGER_MIX
}

impl EffectParams {
    /// Parameter set for `kind` with every field at its default.
    pub fn defaults(kind: EffectKind) -> Self {
        EffectRequest::default().into_params(kind)
    }

    pub fn kind(&self) -> EffectKind {
        match self {
            EffectParams::Speedup { .. } => EffectKind::Speedup,
            EffectParams::Slowed { .. } => EffectKind::Slowed,
            EffectParams::Nightcore { .. } => EffectKind::Nightcore,
            EffectParams::AllEffects { .. } => EffectKind::AllEffects,
        }
    }

    /// Check every field against the range its filter accepts.
    pub fn validate(&self) -> Result<(), ParamsError> {
        match *self {
            EffectParams::Speedup { speed, volume } => {
                check_speed(speed)?;
                check_volume(volume)
            }
            EffectParams::Slowed {
                speed,
                reverb_amount,
                volume,
            } => {
                check_speed(speed)?;
                check_range("reverb_amount", reverb_amount, REVERB_RANGE)?;
                check_volume(volume)
            }
            EffectParams::Nightcore {
                speed,
                pitch,
                volume,
            } => {
                check_speed(speed)?;
                check_pitch(pitch)?;
                check_volume(volume)
            }
            EffectParams::AllEffects {
                speed,
                pitch,
                reverb_amount,
                volume,
                bass_gain,
                flanger_mix,
            } => {
                check_speed(speed)?;
                check_pitch(pitch)?;
                check_range("reverb_amount", reverb_amount, REVERB_RANGE)?;
                check_volume(volume)?;
                check_range("bass_gain", bass_gain, BASS_GAIN_RANGE)?;
                check_range("flanger_mix", flanger_mix, FLANGER_RANGE)
            }
        }
    }

    /// Parameters as a JSON object, as recorded in history entries.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.remove("effect_type");
        }
        value
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ParamsError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ParamsError::OutOfRange { field, value })
    }
}

fn check_speed(speed: f64) -> Result<(), ParamsError> {
    check_range("speed", speed, SPEED_RANGE)
}

fn check_volume(volume: f64) -> Result<(), ParamsError> {
    check_range("volume", volume, (0.0, f64::MAX))
}

fn check_pitch(pitch: f64) -> Result<(), ParamsError> {
    if pitch.is_finite() && pitch > 0.0 {
        Ok(())
    } else {
        Err(ParamsError::OutOfRange {
            field: "pitch",
            value: pitch,
        })
    }
}

/// Flat request body as sent by clients.
///
/// `effect_type` stays a plain string so an unknown kind is reported as an
/// invalid request rather than a body parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectRequest {
    #[serde(default)]
    pub effect_type: String,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub reverb_amount: Option<f64>,
    #[serde(default)]
    pub pitch: Option<f64>,
    #[serde(default)]
    pub bass_gain: Option<f64>,
    #[serde(default)]
    pub flanger_mix: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl EffectRequest {
    /// Resolve the kind named by `effect_type`.
    pub fn kind(&self) -> Result<EffectKind, ParamsError> {
        self.effect_type.parse()
    }

    /// Build the tagged parameter set for `kind`, dropping unrelated fields.
    pub fn into_params(self, kind: EffectKind) -> EffectParams {
        let speed = self.speed.unwrap_or(DEFAULT_SPEED);
        let volume = self.volume.unwrap_or(DEFAULT_VOLUME);
        let pitch = self.pitch.unwrap_or(DEFAULT_PITCH);
        let reverb_amount = self.reverb_amount.unwrap_or(DEFAULT_REVERB_AMOUNT);

        match kind {
            EffectKind::Speedup => EffectParams::Speedup { speed, volume },
            EffectKind::Slowed => EffectParams::Slowed {
                speed,
                reverb_amount,
                volume,
            },
            EffectKind::Nightcore => EffectParams::Nightcore {
                speed,
                pitch,
                volume,
            },
            EffectKind::AllEffects => EffectParams::AllEffects {
                speed,
                pitch,
                reverb_amount,
                volume,
                bass_gain: self.bass_gain.unwrap_or(DEFAULT_BASS_GAIN),
                flanger_mix: self.flanger_mix.unwrap_or(DEFAULT_FLANGER_MIX),
            },
        }
    }

    /// Parse the kind, build and validate the parameter set.
    pub fn resolve(self) -> Result<EffectParams, ParamsError> {
        let kind = self.kind()?;
        let params = self.into_params(kind);
        params.validate()?;
        Ok(params)
    }
}
