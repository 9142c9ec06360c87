//! Procedural macros for confkit.
//!
//! This crate provides:
//!
//! - `#[derive(EnvOverlay)]` - Generates the environment field table of a record
//!
//! Use it through the `confkit` facade, which re-exports the derive next to the
//! trait it implements:
//!
//! ```rust,ignore
//! use confkit::prelude::*;
//!
//! #[derive(Default, Serialize, Deserialize, EnvOverlay)]
//! struct Config {
//!     #[env("APP_PORT")]
//!     port: u16,
//!     database: Database,
//! }
//! ```

mod overlay;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `EnvOverlay` for a struct.
///
/// Every field appears in the generated table in declaration order. Fields
/// that are records themselves (or `Option` of a record) are walked
/// recursively; scalar fields are only written when bound to a variable.
///
/// # Field attributes
///
/// - `#[env("VAR")]` or `#[env(name = "VAR")]` - Bind the field to `VAR`
/// - `#[env(skip)]` - Leave the field out of the table entirely
///
/// Every field that is not skipped must have a type implementing `EnvSlot`.
///
/// # Container attributes
///
/// - `#[env_overlay(crate = "path")]` - Path of the crate exporting the `env`
///   module (default: `::confkit`)
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default, EnvOverlay)]
/// struct Server {
///     #[env("SERVER_HOST")]
///     host: String,
///     #[env(name = "SERVER_PORT")]
///     port: u16,
///     #[env(skip)]
///     started_at: std::time::Instant,
///     tls: Option<Tls>,
/// }
/// ```
#[proc_macro_derive(EnvOverlay, attributes(env, env_overlay))]
pub fn derive_env_overlay(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match overlay::derive_env_overlay(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
