//! Connection configuration.
//!
//! Options can come from the five-line credential file (host, user, password,
//! schema, port), from a TOML file with a `[connection]` table, or be built
//! explicitly in code.
use crate::core::{ArkdbError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Default port written into options that do not specify one.
pub const DEFAULT_PORT: u16 = 3306;

/// Host value that selects a private in-memory database.
pub const MEMORY_HOST: &str = ":memory:";

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_create_if_missing() -> bool {
    true
}

/// Everything needed to open one connection.
#[derive(Clone, PartialEq, Deserialize)]
pub struct ConnectOptions {
    /// Directory holding the database files, or `:memory:`
    pub host: String,
    pub user: String,
    pub password: String,
    /// Database name; stored as `<host>/<schema>.db`
    pub schema: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long the driver waits on a locked database before failing
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
}

// The password never reaches logs.
impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .field("port", &self.port)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .field("create_if_missing", &self.create_if_missing)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    connection: ConnectOptions,
}

impl ConnectOptions {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        ConnectOptions {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            schema: schema.into(),
            port: DEFAULT_PORT,
            busy_timeout_ms: None,
            create_if_missing: true,
        }
    }

    /// Options for a private in-memory database.
    pub fn in_memory(schema: impl Into<String>) -> Self {
        ConnectOptions::new(MEMORY_HOST, "", "", schema)
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Parses the five-line credential format.
    ///
    /// Lines are read in fixed order (host, user, password, schema, port) with
    /// trailing whitespace stripped. There is no escaping.
    pub fn from_credential_str(content: &str) -> Result<Self> {
        let mut lines = content.lines().map(str::trim_end);
        let mut next = |field: &str| {
            lines
                .next()
                .map(str::to_string)
                .ok_or_else(|| ArkdbError::Config(format!("credential file is missing the {} line", field)))
        };

        let host = next("host")?;
        let user = next("user")?;
        let password = next("password")?;
        let schema = next("schema")?;
        let port_line = next("port")?;
        let port = port_line
            .trim()
            .parse::<u16>()
            .map_err(|e| ArkdbError::Config(format!("invalid port {:?}: {}", port_line, e)))?;

        ConnectOptions::new(host, user, password, schema).port(port).validated()
    }

    pub fn from_credential_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        ConnectOptions::from_credential_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| ArkdbError::Config(e.to_string()))?;
        file.connection.validated()
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        ConnectOptions::from_toml_str(&content)
    }

    /// Loads options from `path`, reading `.toml` files as TOML and anything
    /// else as the five-line credential format.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => ConnectOptions::from_toml_file(path),
            _ => ConnectOptions::from_credential_file(path),
        }
    }

    /// `None` for in-memory databases, otherwise the database file path.
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.host == MEMORY_HOST {
            None
        } else {
            Some(Path::new(&self.host).join(format!("{}.db", self.schema)))
        }
    }

    pub fn validated(self) -> Result<Self> {
        if self.schema.trim().is_empty() {
            return Err(ArkdbError::Config("schema name must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ArkdbError::Config("port must be between 1 and 65535".to_string()));
        }
        Ok(self)
    }
}

/// Where a handle takes its connection settings from.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A credential or TOML file, see [`ConnectOptions::load`]
    File(PathBuf),
    Explicit(ConnectOptions),
}

impl Credentials {
    pub fn resolve(self) -> Result<ConnectOptions> {
        match self {
            Credentials::File(path) => ConnectOptions::load(path),
            Credentials::Explicit(options) => options.validated(),
        }
    }
}

impl From<ConnectOptions> for Credentials {
    fn from(options: ConnectOptions) -> Self {
        Credentials::Explicit(options)
    }
}

/// `<config dir>/arkdb/credentials`, if the platform has a config directory.
pub fn default_credential_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("arkdb").join("credentials"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_arkdb_error;
    use std::io::Write;

    const SAMPLE_CONFIG: &str = r#"
[connection]
host = "/var/lib/arkdb"
user = "tester"
password = "secret"
schema = "gtest"
busy_timeout_ms = 250
"#;

    #[test]
    fn test_parse_credential_str() {
        let options = ConnectOptions::from_credential_str("localhost  \ntester\ntester\t\ngtest\n3307\n").unwrap();
        assert_eq!(options.host, "localhost");
        assert_eq!(options.user, "tester");
        assert_eq!(options.password, "tester");
        assert_eq!(options.schema, "gtest");
        assert_eq!(options.port, 3307);
        assert!(options.create_if_missing);
    }

    #[test]
    fn test_credential_str_errors() {
        let result = ConnectOptions::from_credential_str("localhost\ntester\n");
        assert!(result.as_ref().is_err_and(|e| e.to_string().contains("password")));
        assert_arkdb_error!(result, Config, "truncated credential file");

        let result = ConnectOptions::from_credential_str("h\nu\np\ns\nnot-a-port\n");
        assert!(result.as_ref().is_err_and(|e| e.to_string().contains("invalid port")));
        assert_arkdb_error!(result, Config, "non-numeric port");
    }

    #[test]
    fn test_load_config_from_toml() {
        let options = ConnectOptions::from_toml_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(options.host, "/var/lib/arkdb");
        assert_eq!(options.port, DEFAULT_PORT);
        assert_eq!(options.busy_timeout_ms, Some(250));
        assert_eq!(
            options.database_path(),
            Some(PathBuf::from("/var/lib/arkdb/gtest.db"))
        );
    }

    #[test]
    fn test_load_dispatches_on_extension() {
        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        toml_file.write_all(SAMPLE_CONFIG.as_bytes()).unwrap();
        assert_eq!(ConnectOptions::load(toml_file.path()).unwrap().schema, "gtest");

        let mut cred_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(cred_file, ":memory:\nu\np\nlocal\n3306").unwrap();
        let options = Credentials::File(cred_file.path().to_path_buf()).resolve().unwrap();
        assert_eq!(options.database_path(), None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let options = ConnectOptions::new("h", "u", "hunter2", "s");
        let debug = format!("{:?}", options);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert!(matches!(
            Credentials::Explicit(ConnectOptions::new("h", "u", "p", " ")).resolve(),
            Err(ArkdbError::Config(_))
        ));
    }
}
