use crate::layout::{SheetLayouts, SheetOverrides};
use crate::ops::OperationContext;
use crate::validate::{Vocabularies, VocabularyOverrides};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_VALIDATION_ROWS: u32 = 1_000;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub workbook: Option<PathBuf>,
    pub http_bind_address: SocketAddr,
    /// When set, server requests must carry a valid `X-Signature`.
    pub hmac_secret: Option<String>,
    pub lock_timeout: Duration,
    pub validation_rows: u32,
    pub layouts: SheetLayouts,
    pub vocabularies: Vocabularies,
    pub cloud_url: Option<String>,
    pub cloud_secret: Option<String>,
    pub publish_url: Option<String>,
    pub publish_token: Option<String>,
}

impl RegistryConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            workbook: cli_workbook,
            http_bind: cli_http_bind,
            hmac_secret: cli_hmac_secret,
            lock_timeout_ms: cli_lock_timeout_ms,
            validation_rows: cli_validation_rows,
            cloud_url: cli_cloud_url,
            cloud_secret: cli_cloud_secret,
            publish_url: cli_publish_url,
            publish_token: cli_publish_token,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            workbook: file_workbook,
            http_bind: file_http_bind,
            hmac_secret: file_hmac_secret,
            lock_timeout_ms: file_lock_timeout_ms,
            validation_rows: file_validation_rows,
            cloud_url: file_cloud_url,
            cloud_secret: file_cloud_secret,
            publish_url: file_publish_url,
            publish_token: file_publish_token,
            sheets: file_sheets,
            vocabularies: file_vocabularies,
        } = file_config;

        // Relative paths in a config file resolve against the file's directory.
        let config_dir = config
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let workbook = cli_workbook.or_else(|| {
            file_workbook.map(|p| if p.is_absolute() { p } else { config_dir.join(p) })
        });
        if let Some(path) = workbook.as_ref() {
            anyhow::ensure!(path.exists(), "configured workbook {:?} does not exist", path);
            anyhow::ensure!(path.is_file(), "configured workbook {:?} is not a file", path);
        }

        let http_bind_address = match cli_http_bind.or(file_http_bind) {
            Some(addr) => addr,
            None => DEFAULT_HTTP_BIND
                .parse()
                .context("invalid default bind address")?,
        };

        let lock_timeout_ms = cli_lock_timeout_ms
            .or(file_lock_timeout_ms)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT_MS);
        anyhow::ensure!(lock_timeout_ms > 0, "lock_timeout_ms must be greater than 0");

        let validation_rows = cli_validation_rows
            .or(file_validation_rows)
            .unwrap_or(DEFAULT_VALIDATION_ROWS);
        anyhow::ensure!(validation_rows > 0, "validation_rows must be greater than 0");

        let layouts = SheetLayouts::with_overrides(file_sheets.unwrap_or_default())
            .context("invalid sheets configuration")?;
        let vocabularies = Vocabularies::with_overrides(file_vocabularies.unwrap_or_default())
            .context("invalid vocabularies configuration")?;

        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            workbook,
            http_bind_address,
            hmac_secret: non_blank(cli_hmac_secret.or(file_hmac_secret)),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            validation_rows,
            layouts,
            vocabularies,
            cloud_url: non_blank(cli_cloud_url.or(file_cloud_url)),
            cloud_secret: non_blank(cli_cloud_secret.or(file_cloud_secret)),
            publish_url: non_blank(cli_publish_url.or(file_publish_url)),
            publish_token: non_blank(cli_publish_token.or(file_publish_token)),
        })
    }

    pub fn require_workbook(&self) -> Result<&Path> {
        self.workbook
            .as_deref()
            .context("no workbook configured; pass --workbook or set MM_REGISTRY_WORKBOOK")
    }

    pub fn operation_context(&self, dry_run: bool) -> OperationContext {
        OperationContext::new(self.layouts.clone(), self.vocabularies.clone()).dry_run(dry_run)
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "museum-registry",
    about = "Museum registry endpoint server",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "MM_REGISTRY_WORKBOOK",
        value_name = "FILE",
        help = "The registry workbook (.xlsx)",
        global = true
    )]
    pub workbook: Option<PathBuf>,

    #[arg(
        long,
        env = "MM_REGISTRY_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address for the endpoint server"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "MM_REGISTRY_HMAC_SECRET",
        value_name = "SECRET",
        help = "Shared secret requests to the endpoint server must be signed with",
        hide_env_values = true
    )]
    pub hmac_secret: Option<String>,

    #[arg(
        long,
        env = "MM_REGISTRY_LOCK_TIMEOUT_MS",
        value_name = "MS",
        help = "How long to wait for the document lock",
        value_parser = clap::value_parser!(u64),
        global = true
    )]
    pub lock_timeout_ms: Option<u64>,

    #[arg(
        long,
        env = "MM_REGISTRY_VALIDATION_ROWS",
        value_name = "N",
        help = "Number of data rows sheet validations cover",
        value_parser = clap::value_parser!(u32),
        global = true
    )]
    pub validation_rows: Option<u32>,

    #[arg(
        long,
        env = "MM_REGISTRY_CLOUD_URL",
        value_name = "URL",
        help = "Base URL of a remote endpoint server; workflow actions are proxied there",
        global = true
    )]
    pub cloud_url: Option<String>,

    #[arg(
        long,
        env = "MM_REGISTRY_CLOUD_SECRET",
        value_name = "SECRET",
        help = "Secret used to sign proxied requests",
        hide_env_values = true,
        global = true
    )]
    pub cloud_secret: Option<String>,

    #[arg(
        long,
        env = "MM_REGISTRY_PUBLISH_URL",
        value_name = "URL",
        help = "Publish endpoint URL",
        global = true
    )]
    pub publish_url: Option<String>,

    #[arg(
        long,
        env = "MM_REGISTRY_PUBLISH_TOKEN",
        value_name = "TOKEN",
        help = "Token sent as X-Publish-Token",
        hide_env_values = true,
        global = true
    )]
    pub publish_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    workbook: Option<PathBuf>,
    http_bind: Option<SocketAddr>,
    hmac_secret: Option<String>,
    lock_timeout_ms: Option<u64>,
    validation_rows: Option<u32>,
    cloud_url: Option<String>,
    cloud_secret: Option<String>,
    publish_url: Option<String>,
    publish_token: Option<String>,
    sheets: Option<SheetOverrides>,
    vocabularies: Option<VocabularyOverrides>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
