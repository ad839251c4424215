use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(2) }
    }
}

/// Where the key-value documents (accounts, session, ratings) live.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

/// A reviewed game as listed on the site.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GameEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// How many ratings a game card shows.
    #[serde(default = "default_recent_ratings")]
    pub recent_ratings: usize,
    #[serde(default = "default_notice_dismiss_ms")]
    pub notice_dismiss_ms: u64,
    #[serde(default = "default_games")]
    pub games: Vec<GameEntry>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            recent_ratings: default_recent_ratings(),
            notice_dismiss_ms: default_notice_dismiss_ms(),
            games: default_games(),
        }
    }
}

impl SiteConfig {
    pub fn game_name(&self, game_id: &str) -> Option<&str> {
        self.games.iter().find(|g| g.id == game_id).map(|g| g.name.as_str())
    }
}

/// Argon2 cost parameters for password hashing.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

fn default_data_dir() -> String { "data".into() }
fn default_static_dir() -> String { "frontend".into() }
fn default_recent_ratings() -> usize { 3 }
fn default_notice_dismiss_ms() -> u64 { 5000 }
// argon2 crate defaults (OWASP baseline)
fn default_argon2_memory_kib() -> u32 { 19 * 1024 }
fn default_argon2_iterations() -> u32 { 2 }
fn default_argon2_parallelism() -> u32 { 1 }

fn default_games() -> Vec<GameEntry> {
    vec![
        GameEntry { id: "cyberpunk".into(), name: "Cyberpunk 2077".into() },
        GameEntry { id: "zelda".into(), name: "The Legend of Zelda: Tears of the Kingdom".into() },
        GameEntry { id: "baldurs-gate".into(), name: "Baldur's Gate 3".into() },
    ]
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Like [`AppConfig::load_and_validate`], but a missing config file yields defaults.
    /// A file that exists and fails to parse is still an error.
    pub fn load_or_default() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env();
        self.server.normalize()?;
        self.storage.normalize_from_env();
        self.storage.validate()?;
        self.site.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() { self.host = host; }
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(2); }
        } else {
            self.worker_threads = Some(2);
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(dir) = std::env::var("DATA_DIR") {
            if !dir.trim().is_empty() { self.data_dir = dir; }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir is empty; set it in config.toml or via DATA_DIR"));
        }
        Ok(())
    }
}

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.recent_ratings == 0 {
            return Err(anyhow!("site.recent_ratings must be >= 1"));
        }
        let mut seen = std::collections::HashSet::new();
        for game in &self.games {
            if game.id.trim().is_empty() {
                return Err(anyhow!("site.games entries need a non-empty id"));
            }
            if !seen.insert(game.id.as_str()) {
                return Err(anyhow!("site.games has duplicate id `{}`", game.id));
            }
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.argon2_parallelism == 0 {
            return Err(anyhow!("auth.argon2_parallelism must be >= 1"));
        }
        if self.argon2_iterations == 0 {
            return Err(anyhow!("auth.argon2_iterations must be >= 1"));
        }
        // argon2 requires at least 8 KiB per lane
        if self.argon2_memory_kib < 8 * self.argon2_parallelism {
            return Err(anyhow!("auth.argon2_memory_kib must be >= 8 * argon2_parallelism"));
        }
        Ok(())
    }
}
