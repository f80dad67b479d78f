use crate::{
    models::{ids::OwnerId, metadata::PlacementPolicy},
    services::{backend::DEFAULT_MAX_CHUNK_SIZE, context::DEFAULT_REQUEST_TIMEOUT, gateway::GatewaySettings},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Prefix of every environment variable read here.
pub const ENV_PREFIX: &str = "BUCKET_FS_";

/// Which [`Backend`](crate::services::backend::Backend) serves the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// SQLite metadata plus on-disk payloads.
    Sqlite,
    /// Process memory; everything is lost on exit.
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    pub storage_dir: String,
    pub database_url: String,
    pub staging_dir: Option<PathBuf>,
    pub owner: OwnerId,
    pub container_policy: PlacementPolicy,
    pub request_timeout: Duration,
    pub chunk_size: usize,
    pub read_only: bool,
    pub reject_duplicate_names: bool,
    pub debug_level: String,
    pub debug_stderr: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Filesystem gateway over a bucket/object store")]
pub struct Args {
    /// Host to bind to (overrides BUCKET_FS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BUCKET_FS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage backend (overrides BUCKET_FS_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Directory where object payloads are stored (overrides BUCKET_FS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides BUCKET_FS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory for upload staging files (overrides BUCKET_FS_STAGING_DIR)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Identity owning listed and created buckets (overrides BUCKET_FS_OWNER)
    #[arg(long)]
    pub owner: Option<String>,

    /// Placement policy for new buckets (overrides BUCKET_FS_CONTAINER_POLICY)
    #[arg(long)]
    pub container_policy: Option<String>,

    /// Per-call backend timeout in seconds (overrides BUCKET_FS_REQUEST_TIMEOUT)
    #[arg(long)]
    pub request_timeout: Option<u64>,

    /// Upload chunk size in bytes (overrides BUCKET_FS_CHUNK_SIZE)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Refuse every mutating operation (or BUCKET_FS_READ_ONLY=true)
    #[arg(short = 'R', long)]
    pub read_only: bool,

    /// Fail uploads and mkdir when the name is already taken
    /// (or BUCKET_FS_REJECT_DUPLICATE_NAMES=true)
    #[arg(long)]
    pub reject_duplicate_names: bool,

    /// Log level when RUST_LOG is unset (overrides BUCKET_FS_DEBUG_LEVEL)
    #[arg(short = 'l', long)]
    pub debug_level: Option<String>,

    /// Write logs to stderr instead of discarding them (or BUCKET_FS_DEBUG_STDERR=true)
    #[arg(short = 'e', long)]
    pub debug_stderr: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::from_args(Args::parse(), |key| env::var(key))
    }

    /// Merge parsed arguments over variables supplied by `lookup`.
    pub fn from_args<F>(args: Args, lookup: F) -> Result<(Self, bool)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env = EnvSource { lookup };

        let owner = match args.owner.or(env.string("OWNER")?) {
            Some(raw) => raw
                .parse::<OwnerId>()
                .with_context(|| format!("parsing owner id `{}`", raw))?,
            None => OwnerId::default(),
        };
        let request_timeout = args
            .request_timeout
            .or(env.parse("REQUEST_TIMEOUT")?)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let cfg = Self {
            host: args
                .host
                .or(env.string("HOST")?)
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.or(env.parse("PORT")?).unwrap_or(3000),
            backend: args
                .backend
                .or(env.parse("BACKEND")?)
                .unwrap_or(BackendKind::Sqlite),
            storage_dir: args
                .storage_dir
                .or(env.string("STORAGE_DIR")?)
                .unwrap_or_else(|| "./data/objects".into()),
            database_url: args
                .database_url
                .or(env.string("DATABASE_URL")?)
                .unwrap_or_else(|| "sqlite://./data/meta/bucket_fs.db".into()),
            staging_dir: args
                .staging_dir
                .or(env.string("STAGING_DIR")?.map(PathBuf::from)),
            owner,
            container_policy: args
                .container_policy
                .or(env.string("CONTAINER_POLICY")?)
                .map(PlacementPolicy)
                .unwrap_or_default(),
            request_timeout,
            chunk_size: args
                .chunk_size
                .or(env.parse("CHUNK_SIZE")?)
                .unwrap_or(DEFAULT_MAX_CHUNK_SIZE)
                .max(1),
            read_only: args.read_only || env.flag("READ_ONLY")?,
            reject_duplicate_names: args.reject_duplicate_names
                || env.flag("REJECT_DUPLICATE_NAMES")?,
            debug_level: args
                .debug_level
                .or(env.string("DEBUG_LEVEL")?)
                .unwrap_or_else(|| "error".into()),
            debug_stderr: args.debug_stderr || env.flag("DEBUG_STDERR")?,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// No owner was configured; buckets are listed for the nil identity.
    pub fn owner_is_unset(&self) -> bool {
        self.owner.as_uuid().is_nil()
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            owner: self.owner,
            read_only: self.read_only,
            container_policy: self.container_policy.clone(),
            reject_duplicate_names: self.reject_duplicate_names,
            staging_dir: self.staging_dir.clone(),
        }
    }
}

/// Prefixed environment lookups with the error context callers need.
struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    fn string(&self, name: &str) -> Result<Option<String>> {
        let key = format!("{ENV_PREFIX}{name}");
        match (self.lookup)(&key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", key)),
        }
    }

    fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.string(name)? {
            Some(value) => value.parse::<T>().map(Some).map_err(|err| {
                anyhow::anyhow!("parsing {ENV_PREFIX}{name} value `{}`: {}", value, err)
            }),
            None => Ok(None),
        }
    }

    fn flag(&self, name: &str) -> Result<bool> {
        match self.string(name)?.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("" | "0" | "false" | "no" | "off") => Ok(false),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some(other) => anyhow::bail!("parsing {ENV_PREFIX}{name} value `{}` as a flag", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_env(
        vars: &[(&str, &str)],
    ) -> impl Fn(&str) -> Result<String, env::VarError> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_apply_without_args_or_env() {
        let (cfg, migrate) = AppConfig::from_args(Args::default(), with_env(&[])).unwrap();
        assert!(!migrate);
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.backend, BackendKind::Sqlite);
        assert_eq!(cfg.request_timeout, Duration::from_secs(15));
        assert_eq!(cfg.container_policy, PlacementPolicy::default());
        assert_eq!(cfg.debug_level, "error");
        assert!(cfg.owner_is_unset());
        assert!(!cfg.read_only && !cfg.debug_stderr);
    }

    #[test]
    fn env_fills_in_and_args_win() {
        let owner = OwnerId::new();
        let env = with_env(&[
            ("BUCKET_FS_PORT", "9000"),
            ("BUCKET_FS_HOST", "10.0.0.1"),
            ("BUCKET_FS_BACKEND", "memory"),
            ("BUCKET_FS_OWNER", &owner.to_string()),
            ("BUCKET_FS_REQUEST_TIMEOUT", "3"),
            ("BUCKET_FS_READ_ONLY", "true"),
        ]);
        let args = Args {
            host: Some("127.0.0.1".into()),
            migrate: true,
            ..Default::default()
        };
        let (cfg, migrate) = AppConfig::from_args(args, env).unwrap();
        assert!(migrate);
        assert_eq!(cfg.addr(), "127.0.0.1:9000");
        assert_eq!(cfg.backend, BackendKind::Memory);
        assert_eq!(cfg.owner, owner);
        assert_eq!(cfg.request_timeout, Duration::from_secs(3));

        let settings = cfg.gateway_settings();
        assert!(settings.read_only);
        assert_eq!(settings.owner, owner);
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = AppConfig::from_args(Args::default(), with_env(&[("BUCKET_FS_PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("BUCKET_FS_PORT"));

        let err = AppConfig::from_args(Args::default(), with_env(&[("BUCKET_FS_READ_ONLY", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("BUCKET_FS_READ_ONLY"));

        let args = Args {
            owner: Some("not-a-uuid".into()),
            ..Default::default()
        };
        assert!(AppConfig::from_args(args, with_env(&[])).is_err());
    }

    #[test]
    fn cli_flags_parse() {
        let args = Args::try_parse_from(["bucket-fs-gateway", "-R", "-e", "-l", "debug", "--backend", "memory"])
            .unwrap();
        assert!(args.read_only && args.debug_stderr);
        assert_eq!(args.debug_level.as_deref(), Some("debug"));
        assert_eq!(args.backend, Some(BackendKind::Memory));
    }
}
