//! # Confkit
//!
//! Typed configuration files with environment variable overrides.
//!
//! ## Overview
//!
//! Declare the configuration as a struct, give it defaults, and let confkit
//! keep it in a file:
//!
//! - the first run writes the defaults to the file so they can be edited;
//! - later runs read the file back into the struct;
//! - fields bound to environment variables are then overridden in memory.
//!
//! The file format is chosen by a codec: JSON (always available), YAML, TOML,
//! XML and MessagePack.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use confkit::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, EnvOverlay)]
//! struct Config {
//!     #[env("APP_SECRET")]
//!     secret: String,
//!     name: String,
//!     #[env("APP_PORT")]
//!     port: u16,
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = Config { secret: String::new(), name: "Default name".into(), port: 3000 };
//!     ConfKit::with_codec(JsonCodec::new().with_indent())
//!         .load_or_exit_with_env(&mut config)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `macros`: Enable the `EnvOverlay` derive macro (default)
//! - `yaml`, `toml`, `xml`, `msgpack`: Enable the codec for that format (default)
//! - `json-log`: Enable JSON log output in [`logging`]

// Lets the derive's default `::confkit` path resolve inside this crate.
extern crate self as confkit;

pub use confkit_core::{codec, env, error};
pub use confkit_runtime::logging;

pub use confkit_core::{
    Codec, CodecError, CodecResult, DEFAULT_EXIT_CODE, EnvError, EnvOverlay, EnvResult, Format,
    JsonCodec, Store, StoreError, StoreResult, apply_overrides, apply_overrides_from,
};
#[cfg(feature = "msgpack")]
pub use confkit_core::MsgPackCodec;
#[cfg(feature = "toml")]
pub use confkit_core::TomlCodec;
#[cfg(feature = "xml")]
pub use confkit_core::XmlCodec;
#[cfg(feature = "yaml")]
pub use confkit_core::YamlCodec;
pub use confkit_runtime::{ConfKit, ConfigError, ConfigResult, load_from_env};

#[cfg(feature = "macros")]
pub use confkit_macros::EnvOverlay;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use confkit::prelude::*;
/// ```
pub mod prelude {
    // Composition root - main entry point
    pub use confkit_runtime::{ConfKit, ConfigError, ConfigResult, load_from_env};

    // File store and codecs
    pub use confkit_core::{Codec, Format, JsonCodec, Store};
    #[cfg(feature = "msgpack")]
    pub use confkit_core::MsgPackCodec;
    #[cfg(feature = "toml")]
    pub use confkit_core::TomlCodec;
    #[cfg(feature = "xml")]
    pub use confkit_core::XmlCodec;
    #[cfg(feature = "yaml")]
    pub use confkit_core::YamlCodec;

    // Environment overlay
    pub use confkit_core::env::{EnvOverlay, EnvSlot, apply_overrides};
    #[cfg(feature = "macros")]
    pub use confkit_macros::EnvOverlay;
}

#[cfg(all(test, feature = "macros"))]
mod tests {
    use super::prelude::*;
    use crate::apply_overrides_from;
    use crate::env::{FieldSlot, OptionalRecord};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, EnvOverlay)]
    struct Database {
        #[env("DB_HOST")]
        host: String,
        #[env(name = "DB_PORT")]
        port: u16,
    }

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, EnvOverlay)]
    struct Tls {
        #[env("TLS_ENABLED")]
        enabled: bool,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnvOverlay)]
    #[serde(rename = "config")]
    struct Config {
        #[env("APP_SECRET")]
        secret: String,
        name: String,
        #[env("APP_PORT")]
        port: i32,
        #[env("APP_RATIO")]
        ratio: f32,
        #[env("APP_WORKERS")]
        workers: usize,
        database: Database,
        tls: Option<Tls>,
        boxed: Box<Database>,
        #[env(skip)]
        data_dir: PathBuf,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                secret: String::new(),
                name: "Default name".to_string(),
                port: 3000,
                ratio: 0.5,
                workers: 4,
                database: Database::default(),
                tls: None,
                boxed: Box::default(),
                data_dir: PathBuf::from("data"),
                tags: Vec::new(),
            }
        }
    }

    #[derive(Debug, Default, EnvOverlay)]
    struct Port(#[env("TUPLE_PORT")] u16, String);

    #[derive(Debug, EnvOverlay)]
    struct Listener {
        #[env("LISTEN_PORT")]
        port: u16,
        nickname: Option<String>,
        retries: Option<u16>,
        timeout: Duration,
        addr: SocketAddr,
    }

    impl Default for Listener {
        fn default() -> Self {
            Self {
                port: 80,
                nickname: None,
                retries: Some(3),
                timeout: Duration::from_secs(5),
                addr: SocketAddr::from(([127, 0, 0, 1], 80)),
            }
        }
    }

    #[derive(Debug, Default, EnvOverlay)]
    struct Wrapper<T> {
        inner: T,
        #[env("WRAPPER_LABEL")]
        label: String,
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_derived_table_order_and_tags() {
        let mut config = Config::default();
        let fields = config.env_fields();
        let names: Vec<_> = fields.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            [
                "secret", "name", "port", "ratio", "workers", "database", "tls", "boxed", "tags"
            ]
        );
        assert_eq!(fields[0].env, Some("APP_SECRET"));
        assert_eq!(fields[1].env, None);
        assert!(matches!(fields[5].slot, FieldSlot::Nested(_)));
        assert!(matches!(fields[6].slot, FieldSlot::OptionalNested(_)));
        assert!(matches!(fields[8].slot, FieldSlot::Unsupported(_)));
    }

    #[test]
    fn test_derived_overlay() {
        let mut config = Config::default();
        let env = vars(&[
            ("APP_PORT", "8080"),
            ("APP_RATIO", "0.75"),
            ("APP_WORKERS", "16"),
            ("DB_HOST", "db.internal"),
            ("TLS_ENABLED", "T"),
        ]);
        apply_overrides_from(&mut config, &env).unwrap();

        assert_eq!(config.port, 8080);
        assert!((config.ratio - 0.75).abs() < f32::EPSILON);
        assert_eq!(config.workers, 16);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.boxed.host, "db.internal");
        assert_eq!(config.tls, Some(Tls { enabled: true }));
        assert_eq!(config.name, "Default name");
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_tuple_and_generic_structs() {
        let env = vars(&[("TUPLE_PORT", "443"), ("WRAPPER_LABEL", "w"), ("DB_PORT", "1")]);

        let mut port = Port::default();
        apply_overrides_from(&mut port, &env).unwrap();
        assert_eq!(port.0, 443);

        let mut wrapper = Wrapper::<Database>::default();
        apply_overrides_from(&mut wrapper, &env).unwrap();
        assert_eq!(wrapper.label, "w");
        assert_eq!(wrapper.inner.port, 1);

        let mut optional = Wrapper::<Option<Tls>>::default();
        assert!(optional.inner.get_or_default().env_fields().len() == 1);
    }

    #[test]
    fn test_untagged_fields_without_slot_are_skipped() {
        let mut listener = Listener::default();
        {
            let fields = listener.env_fields();
            assert!(matches!(fields[0].slot, FieldSlot::Value(_)));
            for field in &fields[1..] {
                assert!(
                    matches!(field.slot, FieldSlot::Unsupported(_)),
                    "{}",
                    field.name
                );
            }
        }

        let env = vars(&[("LISTEN_PORT", "8443"), ("NICKNAME", "x")]);
        apply_overrides_from(&mut listener, &env).unwrap();
        assert_eq!(listener.port, 8443);
        assert_eq!(listener.nickname, None);
        assert_eq!(listener.retries, Some(3));
        assert_eq!(listener.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overflow_is_conversion_error() {
        let mut config = Config::default();
        let err = apply_overrides_from(&mut config, &vars(&[("DB_PORT", "70000")])).unwrap_err();
        assert_eq!(err.field(), "port");
        assert_eq!(err.var(), "DB_PORT");
    }

    #[test]
    #[cfg(all(feature = "yaml", feature = "toml", feature = "xml", feature = "msgpack"))]
    fn test_every_codec_with_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let codecs: Vec<Format> = vec![
            JsonCodec::new().with_indent().into(),
            YamlCodec.into(),
            TomlCodec.into(),
            XmlCodec::new().with_indent().into(),
            MsgPackCodec.into(),
        ];

        for codec in codecs {
            let name = codec.name();
            let path = dir.path().join(codec.default_file_name());
            let kit = ConfKit::with_store(Store::with_path(codec, path));

            let mut created = Config::default();
            created.tls = Some(Tls { enabled: false });
            kit.save(&created).unwrap();

            let mut loaded = Config::default();
            kit.load_with_env_from(&mut loaded, &vars(&[("APP_SECRET", "env")]))
                .unwrap();
            assert_eq!(loaded.secret, "env", "{name}");
            assert_eq!(loaded.tls, created.tls, "{name}");
            assert_eq!(loaded.database, created.database, "{name}");
        }
    }

    #[test]
    fn test_load_from_env_with_facade() {
        temp_env::with_var("APP_SECRET", Some("from-env"), || {
            let mut config = Config::default();
            load_from_env(&mut config).unwrap();
            assert_eq!(config.secret, "from-env");
        });
    }
}
