use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "tara-chat", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Base URL of the chat backend (terminal client)
    #[arg(long, env = "CHAT_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Upstream minimum wage directory URL
    #[arg(long, env = "MINIMUM_WAGE_API_URL", global = true)]
    pub wage_api_url: Option<String>,

    /// OpenAI-compatible LLM base URL (enables model answers)
    #[arg(long, env = "LLM_BASE_URL", global = true)]
    pub llm_base_url: Option<String>,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", global = true)]
    pub llm_model: Option<String>,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true, global = true)]
    pub llm_api_key: Option<String>,

    /// Directory exported PDF reports are written to
    #[arg(long, env = "EXPORT_DIR", global = true)]
    pub export_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Command {
    /// Run the chat backend
    #[default]
    Serve,
    /// Chat with a running backend from the terminal
    Chat,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub wages: WagesConfig,
    pub llm: LlmConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub request_timeout_secs: u64,
    /// Idle time after which a conversation is dropped.
    pub session_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WagesConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    pub timeout_secs: u64,
}

/// Optional model backend; answers fall back to keyword replies without it.
#[derive(Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WagesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Build the layered configuration: defaults, `./config.*`, the file named
    /// by `--config`, `TARA_`-prefixed environment, then CLI flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.session_timeout_secs", 30 * 60)?
            .set_default("client.endpoint", "http://127.0.0.1:5000")?
            .set_default("client.timeout_secs", 30)?
            .set_default("wages.timeout_secs", 15)?
            .set_default("llm.timeout_secs", 20)?
            .set_default("llm.temperature", 0.3)?
            .set_default("export.output_dir", "exports")?;

        builder = builder.add_source(File::with_name("config").required(false));
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        }

        // E.g. TARA_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("TARA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(endpoint) = &cli.endpoint {
            builder = builder.set_override("client.endpoint", endpoint.as_str())?;
        }
        if let Some(url) = &cli.wage_api_url {
            builder = builder.set_override("wages.api_url", url.as_str())?;
        }
        if let Some(url) = &cli.llm_base_url {
            builder = builder.set_override("llm.base_url", url.as_str())?;
        }
        if let Some(model) = &cli.llm_model {
            builder = builder.set_override("llm.model", model.as_str())?;
        }
        if let Some(key) = &cli.llm_api_key {
            builder = builder.set_override("llm.api_key", key.as_str())?;
        }
        if let Some(dir) = &cli.export_dir {
            builder = builder.set_override("export.output_dir", dir.to_string_lossy().into_owned())?;
        }

        builder.build()?.try_deserialize()
    }
}
