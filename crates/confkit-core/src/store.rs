//! File-backed configuration store.
//!
//! A [`Store`] binds one file path to one [`Codec`]. Loading a missing file
//! writes the caller's defaults to it instead of failing, which is how a first
//! run produces an editable configuration file.

use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::codec::{Codec, Format, JsonCodec};
use crate::error::{StoreError, StoreResult};

/// Exit code used by [`Store::load_or_exit`] unless changed.
pub const DEFAULT_EXIT_CODE: i32 = 0;

type ExitFn = Box<dyn Fn(i32) + Send + Sync>;

/// One configuration file read and written through a codec.
pub struct Store<C: Codec = JsonCodec> {
    codec: C,
    path: PathBuf,
    exit_code: i32,
    exit_fn: ExitFn,
}

impl<C: Codec> Store<C> {
    /// Creates a store for the codec's default file name in the working directory.
    pub fn new(codec: C) -> Self {
        let path = PathBuf::from(codec.default_file_name());
        Self::with_path(codec, path)
    }

    /// Creates a store for an explicit path.
    pub fn with_path(codec: C, path: impl Into<PathBuf>) -> Self {
        Self {
            codec,
            path: path.into(),
            exit_code: DEFAULT_EXIT_CODE,
            exit_fn: Box::new(|code| std::process::exit(code)),
        }
    }

    /// Creates a store at `<platform config dir>/<app>/<default file name>`.
    pub fn in_config_dir(codec: C, app: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        let path = dir.join(app).join(codec.default_file_name());
        Ok(Self::with_path(codec, path))
    }

    /// Consumes the store, returning its codec.
    pub fn into_codec(self) -> C {
        self.codec
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Replaces the action run after a first-run file creation.
    pub fn set_exit_fn<F>(&mut self, exit_fn: F) -> &mut Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit_fn = Box::new(exit_fn);
        self
    }

    pub fn set_exit_code(&mut self, code: i32) -> &mut Self {
        self.exit_code = code;
        self
    }

    /// Logs the first-run notice and runs the exit action with the exit code.
    pub fn exit(&self) {
        info!(
            "A new configuration file has been created: {}. Please edit it and restart the program.",
            self.path.display()
        );
        (self.exit_fn)(self.exit_code);
    }

    /// Returns `false` only when the file is known not to exist.
    ///
    /// Any other metadata failure (permission denied, a parent that is not a
    /// directory, ...) counts as existing, so the file is never recreated over
    /// content the process cannot currently see.
    pub fn exists(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(_) => true,
            Err(err) => err.kind() != ErrorKind::NotFound,
        }
    }

    /// Decodes the file into `record`, or creates the file from `record` if
    /// it does not exist.
    ///
    /// Keys missing from the file keep the values already in `record`.
    pub fn load<T>(&self, record: &mut T) -> StoreResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        if !self.exists() {
            return self.create_file(record);
        }

        debug!(path = %self.path.display(), "loading configuration file");
        let file = File::open(&self.path)?;
        self.codec.read(BufReader::new(file), record)?;
        Ok(())
    }

    /// Like [`load`](Self::load), then runs the exit action if the file did
    /// not exist before the call.
    ///
    /// The exit action only runs once the defaults have been written.
    pub fn load_or_exit<T>(&self, record: &mut T) -> StoreResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let existed = self.exists();
        self.load(record)?;
        if !existed {
            self.exit();
        }
        Ok(())
    }

    /// Writes `record` to the file, replacing its previous content.
    pub fn save<T>(&self, record: &T) -> StoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        if !self.exists() {
            return self.create_file(record);
        }

        debug!(path = %self.path.display(), "saving configuration file");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.write_to(file, record)
    }

    /// Removes the file. Fails if it does not exist.
    pub fn delete(&self) -> StoreResult<()> {
        debug!(path = %self.path.display(), "deleting configuration file");
        fs::remove_file(&self.path)?;
        Ok(())
    }

    fn create_file<T>(&self, record: &T) -> StoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }

        debug!(path = %self.path.display(), "creating configuration file with defaults");
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        self.write_to(file, record)
    }

    fn write_to<T>(&self, file: File, record: &T) -> StoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        let mut writer = BufWriter::new(file);
        self.codec.write(&mut writer, record)?;
        writer.flush()?;
        Ok(())
    }
}

impl Store<JsonCodec> {
    /// A compact JSON store at `config.json`.
    pub fn json() -> Self {
        Self::new(JsonCodec::new())
    }
}

impl Default for Store<JsonCodec> {
    fn default() -> Self {
        Self::json()
    }
}

impl Store<Format> {
    /// Creates a store for `path`, picking the codec from its extension.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let format = Format::from_path(&path).ok_or_else(|| {
            StoreError::UnknownFormat(
                path.extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?;
        Ok(Self::with_path(format, path))
    }
}

impl<C: Codec + std::fmt::Debug> std::fmt::Debug for Store<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("codec", &self.codec)
            .field("path", &self.path)
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}

#[cfg(unix)]
fn create_dir_all(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_dir_all(dir: &Path) -> std::io::Result<()> {
    DirBuilder::new().recursive(true).create(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{Sample, sample};
    use serde::Deserialize;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Config {
        secret: String,
        name: String,
    }

    #[derive(Serialize)]
    struct PartialDatabase {
        port: u16,
    }

    /// An older shape of `Sample`, without most of its keys.
    #[derive(Serialize)]
    #[serde(rename = "config")]
    struct Partial {
        name: &'static str,
        database: PartialDatabase,
    }

    impl Default for Partial {
        fn default() -> Self {
            Self {
                name: "from file",
                database: PartialDatabase { port: 1 },
            }
        }
    }

    fn defaults() -> Config {
        Config {
            secret: String::new(),
            name: "Default name".to_string(),
        }
    }

    /// Installs an exit action that records its codes instead of exiting.
    fn record_exits<C: Codec>(store: &mut Store<C>) -> Arc<Mutex<Vec<i32>>> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        store.set_exit_fn(move |code| sink.lock().unwrap().push(code));
        calls
    }

    #[test]
    fn test_default_paths() {
        assert_eq!(Store::json().path(), Path::new("config.json"));
        assert_eq!(Store::default().exit_code(), DEFAULT_EXIT_CODE);
        #[cfg(feature = "yaml")]
        assert_eq!(
            Store::new(crate::codec::YamlCodec).path(),
            Path::new("config.yaml")
        );
        let explicit = Store::with_path(JsonCodec::new(), "settings/app.json");
        assert_eq!(explicit.path(), Path::new("settings/app.json"));
    }

    #[test]
    fn test_load_creates_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::with_path(JsonCodec::new(), dir.path().join("config.json"));
        assert!(!store.exists());

        let mut config = defaults();
        store.load(&mut config).unwrap();

        assert!(store.exists());
        assert_eq!(config, defaults());
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "{\"secret\":\"\",\"name\":\"Default name\"}\n"
        );
    }

    #[test]
    fn test_save_rewrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = Store::with_path(JsonCodec::new(), &path);

        let mut config = defaults();
        store.load(&mut config).unwrap();

        let reopened = Store::with_path(JsonCodec::new(), &path);
        let mut config = defaults();
        reopened.load(&mut config).unwrap();
        config.name = "Updated name".to_string();
        reopened.save(&config).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"secret\":\"\",\"name\":\"Updated name\"}\n"
        );

        let mut loaded = defaults();
        reopened.load(&mut loaded).unwrap();
        assert_eq!(loaded.name, "Updated name");
    }

    #[test]
    fn test_save_truncates_longer_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::with_path(JsonCodec::new().with_indent(), dir.path().join("c.json"));

        let mut config = defaults();
        config.name = "a much longer name than the next one".to_string();
        store.save(&config).unwrap();

        config.name = "x".to_string();
        store.save(&config).unwrap();

        let mut loaded = defaults();
        store.load(&mut loaded).unwrap();
        assert_eq!(loaded.name, "x");
    }

    #[test]
    fn test_save_on_fresh_path_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::with_path(JsonCodec::new(), dir.path().join("fresh.json"));
        store.save(&defaults()).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_load_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("config.json");
        let store = Store::with_path(JsonCodec::new(), &path);
        store.load(&mut defaults()).unwrap();
        assert!(path.is_file());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dir.path().join("a")).unwrap().permissions().mode();
            assert_eq!(mode & 0o700, 0o700);
            assert_eq!(mode & 0o777 & !0o755, 0, "never wider than 0755");
        }
    }

    #[test]
    fn test_load_decode_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let store = Store::with_path(JsonCodec::new(), &path);
        let mut config = defaults();
        let err = store.load(&mut config).unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
        assert_eq!(config, defaults());
    }

    #[test]
    fn test_load_or_exit_exits_only_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::with_path(JsonCodec::new(), dir.path().join("config.json"));
        store.set_exit_code(3);
        let calls = record_exits(&mut store);

        store.load_or_exit(&mut defaults()).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![3]);
        assert!(store.exists(), "file is written before exiting");

        store.load_or_exit(&mut defaults()).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_load_or_exit_does_not_exit_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[]").unwrap();

        let mut store = Store::with_path(JsonCodec::new(), &path);
        let calls = record_exits(&mut store);
        assert!(store.load_or_exit(&mut defaults()).is_err());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::with_path(JsonCodec::new(), dir.path().join("config.json"));
        fs::write(store.path(), r#"{"secret":"s"}"#).unwrap();

        let mut config = defaults();
        store.load(&mut config).unwrap();
        assert_eq!(config.secret, "s");
        assert_eq!(config.name, "Default name");
        assert_eq!(fs::read_to_string(store.path()).unwrap(), r#"{"secret":"s"}"#);
    }

    #[test]
    #[cfg(all(feature = "yaml", feature = "toml", feature = "xml", feature = "msgpack"))]
    fn test_every_format_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["p.json", "p.yaml", "p.toml", "p.xml", "p.msgpack"] {
            let store = Store::open(dir.path().join(name)).unwrap();
            store.save(&Partial::default()).unwrap();

            let mut loaded = sample();
            store.load(&mut loaded).unwrap();
            assert_eq!(loaded.name, "from file", "{name}");
            assert_eq!(loaded.database.port, 1, "{name}");
            assert_eq!(loaded.database.host, "localhost", "{name}");
            assert_eq!(loaded.secret, "s3cr3t", "{name}");
            assert_eq!(loaded.replica, sample().replica, "{name}");
        }
    }

    #[test]
    fn test_setters_chain() {
        let mut store = Store::json();
        store.set_exit_code(7).set_exit_fn(|_| {});
        assert_eq!(store.exit_code(), 7);

        let codec = Store::with_path(JsonCodec::new().with_indent(), "a.json").into_codec();
        assert_eq!(codec, JsonCodec::new().with_indent());
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::with_path(JsonCodec::new(), dir.path().join("config.json"));
        store.save(&defaults()).unwrap();

        store.delete().unwrap();
        assert!(!store.exists());

        let err = store.delete().unwrap_err();
        assert!(err.is_io_kind(ErrorKind::NotFound));
    }

    #[test]
    fn test_exists_is_permissive_on_stat_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("plain-file");
        fs::write(&blocker, "").unwrap();

        // a path below a regular file fails with an error other than NotFound
        let store = Store::with_path(JsonCodec::new(), blocker.join("config.json"));
        assert!(store.exists());
    }

    #[test]
    fn test_open_selects_codec_from_extension() {
        let store = Store::open("settings.json").unwrap();
        assert_eq!(store.codec().name(), "json");

        let err = Store::open("settings.ini").unwrap_err();
        assert!(matches!(err, StoreError::UnknownFormat(ref ext) if ext == "ini"));
        assert!(matches!(Store::open("settings"), Err(StoreError::UnknownFormat(_))));
    }

    #[test]
    #[cfg(all(feature = "yaml", feature = "toml", feature = "xml", feature = "msgpack"))]
    fn test_every_format_persists_nested_records() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.json", "c.yaml", "c.toml", "c.xml", "c.msgpack"] {
            let store = Store::open(dir.path().join(name)).unwrap();
            let mut created = sample();
            store.load(&mut created).unwrap();

            let mut loaded = Sample::default();
            store.load(&mut loaded).unwrap();
            assert_eq!(loaded, sample(), "{name}");
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_in_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var("XDG_CONFIG_HOME", Some(dir.path()), || {
            let store = Store::in_config_dir(JsonCodec::new(), "my-app").unwrap();
            assert_eq!(store.path(), dir.path().join("my-app").join("config.json"));
        });
    }

    #[test]
    fn test_debug_omits_exit_fn() {
        let debug = format!("{:?}", Store::json());
        assert!(debug.contains("config.json"));
        assert!(debug.contains("exit_code"));
    }
}
