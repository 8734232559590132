use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Device a loaded model is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    /// Host CPU
    Cpu,
    /// CUDA GPU by ordinal
    Cuda(u32),
}

/// Error returned for unrecognized device strings
#[derive(Debug, Error)]
#[error("unsupported device '{0}', expected 'cpu' or 'cuda:<index>'")]
pub struct InvalidDevice(String);

impl Device {
    /// Whether the device is an accelerator
    #[must_use]
    pub const fn is_gpu(self) -> bool {
        matches!(self, Self::Cuda(_))
    }

    /// Device this build can actually use
    ///
    /// Without the `cuda` feature every device resolves to the CPU.
    #[must_use]
    pub fn effective(self) -> Self {
        if self.is_gpu() && !cfg!(feature = "cuda") {
            tracing::warn!(
                requested = %self,
                "built without the `cuda` feature, falling back to cpu"
            );
            return Self::Cpu;
        }
        self
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::Cuda(0)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(index) => write!(f, "cuda:{index}"),
        }
    }
}

impl FromStr for Device {
    type Err = InvalidDevice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(Self::Cuda)
                .ok_or_else(|| InvalidDevice(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = InvalidDevice;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

/// Numeric precision of the loaded checkpoint
///
/// Precision picks which published weight file is fetched and loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Full 32-bit weights
    Float32,
    /// Half-precision weights
    #[default]
    Float16,
    /// 8-bit quantized weights
    Int8,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Float32 => "float32",
            Self::Float16 => "float16",
            Self::Int8 => "int8",
        })
    }
}

/// Error returned for unrecognized precision strings
#[derive(Debug, Error)]
#[error("unsupported precision '{0}', expected 'float32', 'float16' or 'int8'")]
pub struct InvalidPrecision(String);

impl FromStr for Precision {
    type Err = InvalidPrecision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" | "fp32" => Ok(Self::Float32),
            "float16" | "fp16" => Ok(Self::Float16),
            "int8" => Ok(Self::Int8),
            _ => Err(InvalidPrecision(s.to_owned())),
        }
    }
}
