use anyhow::{Context, Result};
use clap::Parser;
use std::{env, path::PathBuf, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub assets_root: PathBuf,
    pub temp_dir: PathBuf,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub jwt_secret: String,
    pub ffprobe_bin: String,
    pub ffmpeg_bin: String,
    pub tool_timeout: Duration,
    pub public_base_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Video upload and publishing API")]
pub struct Args {
    /// Host to bind to (overrides TUBELY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TUBELY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides TUBELY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory served under /assets (overrides TUBELY_ASSETS_ROOT)
    #[arg(long)]
    pub assets_root: Option<PathBuf>,

    /// Scratch directory for staged uploads (overrides TUBELY_TEMP_DIR)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Private bucket receiving videos (overrides TUBELY_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Region of the bucket (overrides TUBELY_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom S3 endpoint, e.g. MinIO (overrides TUBELY_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// ffprobe executable (overrides TUBELY_FFPROBE_BIN)
    #[arg(long)]
    pub ffprobe_bin: Option<String>,

    /// ffmpeg executable (overrides TUBELY_FFMPEG_BIN)
    #[arg(long)]
    pub ffmpeg_bin: Option<String>,

    /// Upper bound on a single ffprobe/ffmpeg run (overrides TUBELY_TOOL_TIMEOUT_SECS)
    #[arg(long)]
    pub tool_timeout_secs: Option<u64>,

    /// Base URL used to build thumbnail links (overrides TUBELY_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge `args` over the variables visible through `lookup`.
    ///
    /// The JWT secret is only read from the environment so it never shows
    /// up in process listings.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let env_port = match lookup("TUBELY_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing TUBELY_PORT value `{}`", value))?,
            None => 8091,
        };
        let env_timeout = match lookup("TUBELY_TOOL_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing TUBELY_TOOL_TIMEOUT_SECS value `{}`", value))?,
            None => 300,
        };

        let s3_bucket = args
            .s3_bucket
            .or_else(|| lookup("TUBELY_S3_BUCKET"))
            .context("no bucket configured: set TUBELY_S3_BUCKET or --s3-bucket")?;
        let jwt_secret = lookup("TUBELY_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("TUBELY_JWT_SECRET must be set")?;

        let port = args.port.unwrap_or(env_port);
        let public_base_url = args
            .public_base_url
            .or_else(|| lookup("TUBELY_PUBLIC_BASE_URL"))
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        Ok(Self {
            host: args.host.unwrap_or_else(|| var("TUBELY_HOST", "0.0.0.0")),
            port,
            database_url: args
                .database_url
                .unwrap_or_else(|| var("TUBELY_DATABASE_URL", "sqlite://./data/tubely.db")),
            assets_root: args
                .assets_root
                .unwrap_or_else(|| var("TUBELY_ASSETS_ROOT", "./assets").into()),
            temp_dir: args
                .temp_dir
                .or_else(|| lookup("TUBELY_TEMP_DIR").map(PathBuf::from))
                .unwrap_or_else(env::temp_dir),
            s3_bucket,
            s3_region: args
                .s3_region
                .unwrap_or_else(|| var("TUBELY_S3_REGION", "us-east-1")),
            s3_endpoint: args.s3_endpoint.or_else(|| lookup("TUBELY_S3_ENDPOINT")),
            jwt_secret,
            ffprobe_bin: args
                .ffprobe_bin
                .unwrap_or_else(|| var("TUBELY_FFPROBE_BIN", "ffprobe")),
            ffmpeg_bin: args
                .ffmpeg_bin
                .unwrap_or_else(|| var("TUBELY_FFMPEG_BIN", "ffmpeg")),
            tool_timeout: Duration::from_secs(args.tool_timeout_secs.unwrap_or(env_timeout)),
            public_base_url,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("TUBELY_S3_BUCKET", "tubely-private"),
        ("TUBELY_JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_fill_everything_optional() {
        let cfg = AppConfig::resolve(Args::default(), env_of(REQUIRED)).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:8091");
        assert_eq!(cfg.s3_bucket, "tubely-private");
        assert_eq!(cfg.s3_region, "us-east-1");
        assert_eq!(cfg.s3_endpoint, None);
        assert_eq!(cfg.tool_timeout, Duration::from_secs(300));
        assert_eq!(cfg.public_base_url, "http://localhost:8091");
        assert_eq!(cfg.temp_dir, env::temp_dir());
    }

    #[test]
    fn args_override_environment() {
        let lookup = env_of(&[
            ("TUBELY_S3_BUCKET", "from-env"),
            ("TUBELY_JWT_SECRET", "secret"),
            ("TUBELY_PORT", "9000"),
            ("TUBELY_FFMPEG_BIN", "/opt/ffmpeg"),
        ]);
        let args = Args {
            s3_bucket: Some("from-args".into()),
            port: Some(9100),
            ..Args::default()
        };
        let cfg = AppConfig::resolve(args, lookup).unwrap();
        assert_eq!(cfg.s3_bucket, "from-args");
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.ffmpeg_bin, "/opt/ffmpeg");
        assert_eq!(cfg.public_base_url, "http://localhost:9100");
    }

    #[test]
    fn missing_secret_or_bucket_is_an_error() {
        assert!(AppConfig::resolve(Args::default(), env_of(&[("TUBELY_JWT_SECRET", "s")])).is_err());
        assert!(
            AppConfig::resolve(Args::default(), env_of(&[("TUBELY_S3_BUCKET", "b")])).is_err()
        );
    }

    #[test]
    fn bad_port_is_reported() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TUBELY_PORT", "http"));
        let err = AppConfig::resolve(Args::default(), env_of(&pairs)).unwrap_err();
        assert!(err.to_string().contains("TUBELY_PORT"));
    }
}
