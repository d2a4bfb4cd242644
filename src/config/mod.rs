// Client configuration
// Built in code, loaded from a redis.conf style file, or parsed from a URL

mod parser;

pub use parser::{ConfigParser, Directive};

use crate::connection::DEFAULT_MAX_BUFFER_SIZE;
use anyhow::{bail, Context, Result};
use percent_encoding::percent_decode_str;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Connection and call settings for a client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Logical database selected on connect
    pub db: u32,
    /// Maximum open connections
    pub pool_size: usize,
    pub connect_timeout: Duration,
    /// Per-call deadline; `None` waits indefinitely
    pub command_timeout: Option<Duration>,
    pub max_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
            db: 0,
            pool_size: 8,
            connect_timeout: Duration::from_secs(5),
            command_timeout: None,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(mut self, username: Option<String>, password: impl Into<String>) -> Self {
        self.username = username;
        self.password = Some(password.into());
        self
    }

    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Get the server address as "host:port"
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Load settings from a file, starting from the defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        let mut config = Self::default();
        for directive in ConfigParser::new(&content).parse()? {
            config
                .apply(&directive.key, &directive.value)
                .with_context(|| format!("line {}: invalid '{}'", directive.line, directive.key))?;
        }
        Ok(config)
    }

    /// Set one directive by name. Timeouts are in milliseconds; a command
    /// timeout of 0 disables it.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "host" | "bind" => self.host = value.to_string(),
            "port" => self.port = value.parse().context("port must be 0-65535")?,
            "username" | "user" => self.username = Some(value.to_string()),
            "password" | "requirepass" => self.password = Some(value.to_string()),
            "db" | "database" => self.db = value.parse().context("db must be a non-negative integer")?,
            "pool-size" => {
                let size: usize = value.parse().context("pool-size must be a positive integer")?;
                if size == 0 {
                    bail!("pool-size must be at least 1");
                }
                self.pool_size = size;
            }
            "connect-timeout-ms" => {
                self.connect_timeout = Duration::from_millis(value.parse().context("expected milliseconds")?)
            }
            "command-timeout-ms" => {
                let ms: u64 = value.parse().context("expected milliseconds")?;
                self.command_timeout = (ms > 0).then(|| Duration::from_millis(ms));
            }
            "max-buffer-size" => {
                self.max_buffer_size = value.parse().context("max-buffer-size must be a byte count")?
            }
            other => bail!("unknown directive '{}'", other),
        }
        Ok(())
    }

    /// Parse `redis://[[username]:password@]host[:port][/db]`. Userinfo is
    /// percent-decoded.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).with_context(|| format!("invalid URL '{}'", url))?;
        if parsed.scheme() != "redis" {
            bail!("unsupported URL scheme in '{}'", url);
        }

        let mut config = Self::default();
        config.host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => bail!("missing host in URL '{}'", url),
        };
        config.port = parsed.port().unwrap_or(config.port);

        if let Some(password) = parsed.password() {
            config.password = Some(decode_userinfo(password)?);
            let user = parsed.username();
            config.username = (!user.is_empty()).then(|| decode_userinfo(user)).transpose()?;
        } else if !parsed.username().is_empty() {
            // a bare userinfo is the password, as with redis-cli
            config.password = Some(decode_userinfo(parsed.username())?);
        }

        let path = parsed.path().trim_start_matches('/');
        if !path.is_empty() {
            config.db = path
                .parse()
                .with_context(|| format!("invalid database '{}' in URL", path))?;
        }

        Ok(config)
    }
}

fn decode_userinfo(raw: &str) -> Result<String> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .context("credentials in URL are not valid UTF-8")?;
    Ok(decoded.into_owned())
}
