use crate::{
    capture_page, format_bytes, init_metrics, normalize_url, serve, CaptureError, CaptureFormat,
    CaptureService, Config,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "page-capture")]
#[command(about = "Render web pages in headless Chrome and download them as PNG or PDF")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long, global = true, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, env = "CHROME_PATH", help = "Chrome executable path")]
    pub chrome_path: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP capture server (default)
    Serve {
        #[arg(long, env = "CAPTURE_HOST", help = "Bind address")]
        host: Option<String>,

        #[arg(short, long, env = "CAPTURE_PORT", help = "Server port")]
        port: Option<u16>,

        #[arg(long, env = "CAPTURE_STATIC_DIR", help = "Single-page application bundle directory")]
        static_dir: Option<PathBuf>,

        #[arg(long, help = "Maximum simultaneous browser sessions")]
        max_concurrent: Option<usize>,
    },

    /// Capture a single page to a file
    Capture {
        #[arg(short, long, help = "URL to capture (https:// is assumed if no scheme)")]
        url: String,

        #[arg(short, long, help = "Output file path (default: timestamped name)")]
        output: Option<PathBuf>,

        #[arg(long, help = "Output format (png, pdf)")]
        format: Option<String>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve {
            host: None,
            port: None,
            static_dir: None,
            max_concurrent: None,
        }
    }
}

/// Read the optional JSON config file and apply command-line overrides.
pub async fn load_config(args: &Cli) -> Result<Config, CaptureError> {
    let mut config = if let Some(config_path) = &args.config {
        let config_content = fs::read_to_string(config_path).await?;
        serde_json::from_str(&config_content)
            .map_err(|e| CaptureError::Config(format!("{}: {e}", config_path.display())))?
    } else {
        Config::default()
    };

    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    if let Some(Commands::Serve {
        host,
        port,
        static_dir,
        max_concurrent,
    }) = &args.command
    {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(static_dir) = static_dir {
            config.server.static_dir = Some(static_dir.clone());
        }
        if let Some(max_concurrent) = max_concurrent {
            config.max_concurrent_captures = Some(*max_concurrent);
        }
    }

    config.validate()?;

    info!("Configuration loaded successfully");
    info!("Viewport: {}x{}", config.viewport.width, config.viewport.height);
    info!("Navigation policy: {:?}", config.navigation);

    Ok(config)
}

pub struct CliRunner {
    config: Config,
    service: Arc<CaptureService>,
}

impl CliRunner {
    pub fn new(config: Config) -> Self {
        let service = Arc::new(CaptureService::new(config.clone()));
        Self { config, service }
    }

    pub async fn run(&self, command: Commands) -> Result<(), CaptureError> {
        match command {
            Commands::Serve { .. } => self.run_server().await,
            Commands::Capture {
                url,
                output,
                format,
            } => self.run_capture(url, output, format).await,
        }
    }

    async fn run_server(&self) -> Result<(), CaptureError> {
        if self.config.metrics_enabled {
            init_metrics();
        }
        serve(&self.config, self.service.clone()).await
    }

    async fn run_capture(
        &self,
        url: String,
        output: Option<PathBuf>,
        format: Option<String>,
    ) -> Result<(), CaptureError> {
        let url = normalize_url(&url)
            .ok_or_else(|| CaptureError::Navigation(format!("Invalid URL: {url}")))?;
        let format = CaptureFormat::parse(format.as_deref());

        let capture = capture_page(self.service.as_ref(), url.as_str(), format).await?;

        let output = output.unwrap_or_else(|| PathBuf::from(&capture.filename));
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&output, &capture.data).await?;

        info!(
            "Saved {} ({}) to {}",
            capture.url,
            format_bytes(capture.data.len()),
            output.display()
        );
        Ok(())
    }
}

pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},tower_http={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["page-capture"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(Commands::default(), Commands::Serve { port: None, .. }));
    }

    #[test]
    fn test_parse_capture_command() {
        let cli = Cli::try_parse_from([
            "page-capture",
            "capture",
            "--url",
            "example.com",
            "--format",
            "pdf",
            "-o",
            "out.pdf",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Capture {
                url,
                output,
                format,
            }) => {
                assert_eq!(url, "example.com");
                assert_eq!(output, Some(PathBuf::from("out.pdf")));
                assert_eq!(format.as_deref(), Some("pdf"));
            }
            _ => panic!("expected capture command"),
        }
    }

    #[tokio::test]
    async fn test_load_config_applies_serve_overrides() {
        let cli = Cli::try_parse_from([
            "page-capture",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--max-concurrent",
            "2",
        ])
        .unwrap();

        let config = load_config(&cli).await.unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.max_concurrent_captures, Some(2));
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"navigation": {"settle_delay": {"secs": 1, "nanos": 0}}, "metrics_enabled": false}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from(["page-capture", "--config", path.to_str().unwrap()]).unwrap();
        let config = load_config(&cli).await.unwrap();

        assert_eq!(config.navigation.settle_delay, std::time::Duration::from_secs(1));
        assert!(!config.metrics_enabled);
        assert_eq!(config.server.port, 5001);
    }

    #[tokio::test]
    async fn test_load_config_rejects_invalid_values() {
        let cli = Cli::try_parse_from(["page-capture", "serve", "--max-concurrent", "0"]).unwrap();
        assert!(matches!(load_config(&cli).await, Err(CaptureError::Config(_))));
    }
}
