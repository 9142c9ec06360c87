//! Scalar conversions from environment variable text.

use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Type tag of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Int { bits: u32 },
    Uint { bits: u32 },
    Float { bits: u32 },
    Bool,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Int { bits } => write!(f, "i{bits}"),
            Self::Uint { bits } => write!(f, "u{bits}"),
            Self::Float { bits } => write!(f, "f{bits}"),
            Self::Bool => f.write_str("bool"),
        }
    }
}

/// Why a variable's text could not be converted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("invalid integer: {0}")]
    Int(#[from] ParseIntError),

    #[error("invalid float: {0}")]
    Float(#[from] ParseFloatError),

    #[error("invalid boolean `{0}`")]
    Bool(String),
}

/// A scalar field that can be assigned from environment variable text.
pub trait EnvValue {
    /// Type tag used for diagnostics.
    fn kind(&self) -> ValueKind;

    /// Parses `raw` and assigns it. On failure the field keeps its value.
    fn set_from_env(&mut self, raw: &str) -> Result<(), ConvertError>;
}

impl EnvValue for String {
    fn kind(&self) -> ValueKind {
        ValueKind::String
    }

    fn set_from_env(&mut self, raw: &str) -> Result<(), ConvertError> {
        raw.clone_into(self);
        Ok(())
    }
}

impl EnvValue for bool {
    fn kind(&self) -> ValueKind {
        ValueKind::Bool
    }

    fn set_from_env(&mut self, raw: &str) -> Result<(), ConvertError> {
        *self = parse_bool(raw)?;
        Ok(())
    }
}

/// Parses the canonical boolean spellings.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
/// counterparts `0`, `f`, `F`, `FALSE`, `false`, `False`.
pub fn parse_bool(raw: &str) -> Result<bool, ConvertError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(ConvertError::Bool(other.to_string())),
    }
}

macro_rules! impl_env_value {
    ($kind:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl EnvValue for $ty {
                fn kind(&self) -> ValueKind {
                    ValueKind::$kind { bits: <$ty>::BITS }
                }

                fn set_from_env(&mut self, raw: &str) -> Result<(), ConvertError> {
                    *self = raw.parse::<$ty>()?;
                    Ok(())
                }
            }
        )+
    };
}

impl_env_value!(Int => i8, i16, i32, i64, i128, isize);
impl_env_value!(Uint => u8, u16, u32, u64, u128, usize);

impl EnvValue for f32 {
    fn kind(&self) -> ValueKind {
        ValueKind::Float { bits: 32 }
    }

    fn set_from_env(&mut self, raw: &str) -> Result<(), ConvertError> {
        *self = raw.parse()?;
        Ok(())
    }
}

impl EnvValue for f64 {
    fn kind(&self) -> ValueKind {
        ValueKind::Float { bits: 64 }
    }

    fn set_from_env(&mut self, raw: &str) -> Result<(), ConvertError> {
        *self = raw.parse()?;
        Ok(())
    }
}
