//! # Confkit Core
//!
//! Building blocks for binding a configuration file to a typed record.
//!
//! ## Layers
//!
//! - **Codecs**: one [`Codec`] per wire format (JSON, YAML, TOML, XML,
//!   MessagePack), plus [`Format`] for choosing one at runtime.
//! - **Store**: a [`Store`] ties one file path to one codec and implements the
//!   create-on-first-load workflow.
//! - **Environment overlay**: the [`env`] module overrides record fields from
//!   environment variables through a per-type field table.
//!
//! ```text
//! ┌──────────┐  read/write  ┌───────┐  decode/encode  ┌────────┐
//! │   file   │◀────────────▶│ Store │◀───────────────▶│ record │
//! └──────────┘              └───────┘                 └────────┘
//!                                                         ▲
//!                                   env::apply_overrides  │
//!                                   ──────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use confkit_core::{JsonCodec, Store};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Config {
//!     name: String,
//! }
//!
//! let store = Store::new(JsonCodec::new().with_indent());
//! let mut config = Config { name: "Default name".into() };
//! store.load(&mut config)?;
//! # Ok::<(), confkit_core::StoreError>(())
//! ```

pub mod codec;
pub mod env;
pub mod error;
mod store;

pub use codec::{Codec, Format, JsonCodec};
#[cfg(feature = "msgpack")]
pub use codec::MsgPackCodec;
#[cfg(feature = "toml")]
pub use codec::TomlCodec;
#[cfg(feature = "xml")]
pub use codec::XmlCodec;
#[cfg(feature = "yaml")]
pub use codec::YamlCodec;

pub use env::{
    EnvError, EnvOverlay, EnvResult, EnvSlot, EnvSource, FieldBinding, FieldSlot, ProcessEnv,
    apply_overrides, apply_overrides_from,
};
pub use error::{CodecError, CodecResult, StoreError, StoreResult};
pub use store::{DEFAULT_EXIT_CODE, Store};
