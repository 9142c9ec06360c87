//! Where environment variables are looked up.

use std::collections::{BTreeMap, HashMap};
use std::env::VarError;
use std::ffi::OsString;

/// A source of named string variables.
pub trait EnvSource {
    /// Returns the value of `key`, or `None` when it is not set.
    ///
    /// Fails only when the variable is set but its value is unusable.
    fn lookup(&self, key: &str) -> Result<Option<String>, OsString>;
}

/// The environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, key: &str) -> Result<Option<String>, OsString> {
        match std::env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(raw)) => Err(raw),
        }
    }
}

impl<S: std::hash::BuildHasher> EnvSource for HashMap<String, String, S> {
    fn lookup(&self, key: &str) -> Result<Option<String>, OsString> {
        Ok(self.get(key).cloned())
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Result<Option<String>, OsString> {
        Ok(self.get(key).cloned())
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn lookup(&self, key: &str) -> Result<Option<String>, OsString> {
        (**self).lookup(key)
    }
}
