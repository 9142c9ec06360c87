use std::ffi::OsString;

use thiserror::Error;
use tracing::trace;

use super::source::{EnvSource, ProcessEnv};
use super::value::ConvertError;
use super::{EnvOverlay, FieldSlot};

/// Errors raised while overlaying environment variables.
///
/// The walk stops at the first error; fields visited before it keep the
/// values already assigned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    /// The variable is set but its value does not parse as the field's type.
    #[error("failed to set field {field} from env {var}: {source}")]
    Convert {
        field: &'static str,
        var: &'static str,
        #[source]
        source: ConvertError,
    },

    /// The field is bound to a variable but its type cannot be assigned from text.
    #[error("failed to set field {field} from env {var}: unsupported field type: {type_name}")]
    UnsupportedType {
        field: &'static str,
        var: &'static str,
        type_name: &'static str,
    },

    /// The variable is set but is not valid Unicode.
    #[error("failed to set field {field} from env {var}: value is not valid unicode: {value:?}")]
    NotUnicode {
        field: &'static str,
        var: &'static str,
        value: OsString,
    },
}

impl EnvError {
    /// Name of the field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Convert { field, .. }
            | Self::UnsupportedType { field, .. }
            | Self::NotUnicode { field, .. } => field,
        }
    }

    /// Name of the variable bound to the failing field.
    pub fn var(&self) -> &'static str {
        match self {
            Self::Convert { var, .. }
            | Self::UnsupportedType { var, .. }
            | Self::NotUnicode { var, .. } => var,
        }
    }
}

/// Result type for overlay operations.
pub type EnvResult<T> = Result<T, EnvError>;

/// Overrides the fields of `record` from the process environment.
///
/// Fields whose variable is unset, and fields without a variable, keep their
/// current value. Running it twice with the same environment gives the same
/// record as running it once.
pub fn apply_overrides<T: EnvOverlay + ?Sized>(record: &mut T) -> EnvResult<()> {
    apply_overrides_from(record, &ProcessEnv)
}

/// Like [`apply_overrides`], reading variables from `source`.
pub fn apply_overrides_from<T, S>(record: &mut T, source: &S) -> EnvResult<()>
where
    T: EnvOverlay + ?Sized,
    S: EnvSource + ?Sized,
{
    overlay_record(record.env_fields(), source)
}

fn overlay_record<S: EnvSource + ?Sized>(
    fields: Vec<super::FieldBinding<'_>>,
    source: &S,
) -> EnvResult<()> {
    for binding in fields {
        match binding.slot {
            FieldSlot::Nested(inner) => overlay_record(inner.env_fields(), source)?,
            FieldSlot::OptionalNested(inner) => {
                overlay_record(inner.get_or_default().env_fields(), source)?
            }
            FieldSlot::Value(value) => {
                let Some(var) = binding.env else {
                    continue;
                };
                let raw = match source.lookup(var) {
                    Ok(Some(raw)) => raw,
                    Ok(None) => continue,
                    Err(value) => {
                        return Err(EnvError::NotUnicode {
                            field: binding.name,
                            var,
                            value,
                        });
                    }
                };
                value
                    .set_from_env(&raw)
                    .map_err(|source| EnvError::Convert {
                        field: binding.name,
                        var,
                        source,
                    })?;
                trace!(field = binding.name, var, kind = %value.kind(), "applied environment override");
            }
            FieldSlot::Unsupported(type_name) => {
                if let Some(var) = binding.env {
                    return Err(EnvError::UnsupportedType {
                        field: binding.name,
                        var,
                        type_name,
                    });
                }
            }
        }
    }
    Ok(())
}
