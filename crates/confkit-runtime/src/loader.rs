//! Load-then-overlay composition.
//!
//! [`ConfKit`] pairs a [`Store`] with the environment overlay:
//!
//! 1. The file is loaded, or created from the record's defaults
//! 2. Fields bound to environment variables are overridden in place
//!
//! Variables always win over values read from the file.
//!
//! # Example
//!
//! ```rust,ignore
//! use confkit_runtime::ConfKit;
//!
//! let mut config = Config::default();
//! ConfKit::new()
//!     .file("./config/app.json")
//!     .exit_code(1)
//!     .load_or_exit_with_env(&mut config)?;
//! ```

use std::path::PathBuf;

use confkit_core::env::{EnvOverlay, EnvSource, ProcessEnv, apply_overrides, apply_overrides_from};
use confkit_core::{Codec, JsonCodec, Store};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ConfigResult;

/// A configuration file with environment overrides.
#[derive(Debug)]
pub struct ConfKit<C: Codec = JsonCodec> {
    store: Store<C>,
}

impl Default for ConfKit<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfKit<JsonCodec> {
    /// Compact JSON at `config.json`.
    pub fn new() -> Self {
        Self::with_store(Store::json())
    }
}

impl<C: Codec> ConfKit<C> {
    /// Uses `codec` with its default file name.
    pub fn with_codec(codec: C) -> Self {
        Self::with_store(Store::new(codec))
    }

    pub fn with_store(store: Store<C>) -> Self {
        Self { store }
    }

    /// Replaces the store with one for `path`, keeping the codec.
    ///
    /// The new store starts with the default exit code and action, so call
    /// this before [`exit_code`](Self::exit_code) and [`exit_fn`](Self::exit_fn).
    pub fn file(self, path: impl Into<PathBuf>) -> Self {
        Self::with_store(Store::with_path(self.store.into_codec(), path))
    }

    /// Sets the code passed to the exit action on first run.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.store.set_exit_code(code);
        self
    }

    /// Sets the action run after a first-run file creation.
    pub fn exit_fn<F>(mut self, exit_fn: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.store.set_exit_fn(exit_fn);
        self
    }

    pub fn store(&self) -> &Store<C> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<C> {
        &mut self.store
    }

    pub fn exists(&self) -> bool {
        self.store.exists()
    }

    pub fn load<T>(&self, record: &mut T) -> ConfigResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        Ok(self.store.load(record)?)
    }

    pub fn load_or_exit<T>(&self, record: &mut T) -> ConfigResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        Ok(self.store.load_or_exit(record)?)
    }

    pub fn save<T>(&self, record: &T) -> ConfigResult<()>
    where
        T: Serialize + ?Sized,
    {
        Ok(self.store.save(record)?)
    }

    pub fn delete(&self) -> ConfigResult<()> {
        Ok(self.store.delete()?)
    }

    /// Loads the file, then overrides fields from the process environment.
    ///
    /// An overlay error is returned after a successful load; the record then
    /// keeps the overrides applied before the failing field.
    pub fn load_with_env<T>(&self, record: &mut T) -> ConfigResult<()>
    where
        T: Serialize + DeserializeOwned + EnvOverlay,
    {
        self.load_with_env_from(record, &ProcessEnv)
    }

    /// Like [`load_with_env`](Self::load_with_env), reading variables from `source`.
    pub fn load_with_env_from<T, S>(&self, record: &mut T, source: &S) -> ConfigResult<()>
    where
        T: Serialize + DeserializeOwned + EnvOverlay,
        S: EnvSource + ?Sized,
    {
        self.store.load(record)?;
        apply_overrides_from(record, source)?;
        Ok(())
    }

    /// Loads the file and overrides fields from the process environment, then
    /// runs the exit action if the file did not exist before the call.
    ///
    /// The exit action only runs when both steps succeed.
    pub fn load_or_exit_with_env<T>(&self, record: &mut T) -> ConfigResult<()>
    where
        T: Serialize + DeserializeOwned + EnvOverlay,
    {
        self.load_or_exit_with_env_from(record, &ProcessEnv)
    }

    /// Like [`load_or_exit_with_env`](Self::load_or_exit_with_env), reading
    /// variables from `source`.
    pub fn load_or_exit_with_env_from<T, S>(&self, record: &mut T, source: &S) -> ConfigResult<()>
    where
        T: Serialize + DeserializeOwned + EnvOverlay,
        S: EnvSource + ?Sized,
    {
        let existed = self.store.exists();
        self.load_with_env_from(record, source)?;
        if !existed {
            self.store.exit();
        }
        Ok(())
    }
}

/// Overrides fields of `record` from the process environment, without any
/// file access.
pub fn load_from_env<T: EnvOverlay + ?Sized>(record: &mut T) -> ConfigResult<()> {
    apply_overrides(record)?;
    Ok(())
}
