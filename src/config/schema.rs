use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::fs::File;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Gateway server configuration: host, port, bind policy (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Reply rules shared by every tenant (`[responder]`).
    #[serde(default)]
    pub responder: ResponderConfig,

    /// Tenant table keyed by the destination number the gateway assigned them (`[tenants."+15551112222"]`).
    #[serde(default)]
    pub tenants: TenantsConfig,
}

/// Tenant table as it appears in config.toml.
pub type TenantsConfig = HashMap<String, TenantConfig>;

// ── Gateway ─────────────────────────────────────────────────────

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayConfig {
    /// Gateway port (default: 5000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Allow binding to a non-loopback address (default: false).
    /// The messaging gateway must reach the webhook, so production deployments
    /// either sit behind a reverse proxy or set this explicitly.
    #[serde(default)]
    pub allow_public_bind: bool,
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
            allow_public_bind: false,
        }
    }
}

// ── Responder ───────────────────────────────────────────────────

/// Reply rules applied across tenants (`[responder]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponderConfig {
    /// Substrings that force the tenant's welcome message. Checked after the
    /// keyword scan, so a greeting overrides any keyword match.
    #[serde(default = "default_greetings")]
    pub greetings: Vec<String>,
    /// Reply sent when the destination number has no tenant profile.
    #[serde(default = "default_unavailable_message")]
    pub unavailable_message: String,
}

fn default_greetings() -> Vec<String> {
    vec!["hola".into(), "buenas".into(), "buenos".into()]
}

fn default_unavailable_message() -> String {
    "Lo sentimos, este servicio no está disponible en este momento. \
     Por favor, contacte al administrador."
        .into()
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            greetings: default_greetings(),
            unavailable_message: default_unavailable_message(),
        }
    }
}

// ── Tenants ─────────────────────────────────────────────────────

/// One tenant profile (`[tenants."<number>"]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TenantConfig {
    /// Display name used in logs and listings.
    pub name: String,
    /// Reply sent when the inbound message contains a greeting.
    pub welcome_message: String,
    /// Reply sent when nothing else matched.
    pub default_response: String,
    /// Keyword triggers, scanned in order; the first substring match wins.
    #[serde(default)]
    pub keywords: Vec<KeywordConfig>,
}

/// A single keyword trigger (`[[tenants."<number>".keywords]]`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeywordConfig {
    /// Substring to look for in the lowercased message. Matching is case-insensitive.
    pub keyword: String,
    /// Canned reply for this keyword.
    pub reply: String,
}

impl KeywordConfig {
    fn new(keyword: &str, reply: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            reply: reply.to_string(),
        }
    }
}

/// Demo tenants written into a freshly initialized config file.
fn default_tenants() -> TenantsConfig {
    let mut tenants = HashMap::new();

    tenants.insert(
        "+15551112222".to_string(),
        TenantConfig {
            name: "Pizzería Don Gato".into(),
            welcome_message: "¡Hola! 🍕 Bienvenido a Pizzería Don Gato. ¿En qué podemos ayudarte? Escribe:\n\
                              ➡️ 'MENU' para ver nuestras pizzas.\n\
                              ➡️ 'ESTADO' para ver tu pedido.\n\
                              ➡️ 'UBICACION' para saber dónde estamos."
                .into(),
            keywords: vec![
                KeywordConfig::new(
                    "menu",
                    "Claro, nuestro menú es:\n\
                     🍕 Pizza Margarita - $10\n\
                     🍕 Pizza Pepperoni - $12\n\
                     🍕 Pizza Hawaiana - $13\n\
                     ¿Cuál te gustaría ordenar?",
                ),
                KeywordConfig::new(
                    "estado",
                    "Por favor, para revisar el estado de tu pedido, indícanos tu número de orden.",
                ),
                KeywordConfig::new(
                    "ubicacion",
                    "Nos encontramos en la Calle Falsa 123, al lado de la tienda de resortes. ¡Te esperamos!",
                ),
                KeywordConfig::new("gracias", "¡A ti! Que disfrutes tu pizza. 😊"),
            ],
            default_response: "Lo siento, no entendí esa opción. Por favor, intenta con 'MENU', 'ESTADO' o 'UBICACION'."
                .into(),
        },
    );

    tenants.insert(
        "+15553334444".to_string(),
        TenantConfig {
            name: "Gimnasio FuerteFit".into(),
            welcome_message: "¡Hola! 💪 Bienvenido a FuerteFit. Te podemos ayudar con:\n\
                              ➡️ 'CLASES' para ver el horario semanal.\n\
                              ➡️ 'PRECIOS' para ver nuestras membresías.\n\
                              ➡️ 'CONTACTO' para hablar con un asesor."
                .into(),
            keywords: vec![
                KeywordConfig::new(
                    "clases",
                    "¡Con gusto! Nuestro horario es:\n\
                     Lunes - Yoga 8 AM\n\
                     Miércoles - Spinning 7 PM\n\
                     Viernes - Boxeo 6 PM\n\
                     ¡No necesitas reservar!",
                ),
                KeywordConfig::new(
                    "precios",
                    "Nuestra membresía mensual tiene un costo de $50 USD. ¡Incluye acceso ilimitado a todas las clases y áreas del gimnasio!",
                ),
                KeywordConfig::new(
                    "contacto",
                    "Puedes llamarnos al 987-654-321 o visitarnos directamente. Nuestro personal estará feliz de atenderte.",
                ),
                KeywordConfig::new("adios", "¡Gracias por contactarnos! Sigue entrenando duro."),
            ],
            default_response: "Opción no reconocida. Por favor, prueba con 'CLASES', 'PRECIOS' o 'CONTACTO'."
                .into(),
        },
    );

    tenants
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: default_config_dir()
                .unwrap_or_else(|_| PathBuf::from(".tenant-responder"))
                .join(CONFIG_FILE_NAME),
            gateway: GatewayConfig::default(),
            responder: ResponderConfig::default(),
            tenants: default_tenants(),
        }
    }
}

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".tenant-responder"))
}

/// Config directory: `TENANT_RESPONDER_CONFIG_DIR` when set, otherwise `~/.tenant-responder`.
fn resolve_config_dir() -> Result<PathBuf> {
    if let Ok(custom_config_dir) = std::env::var("TENANT_RESPONDER_CONFIG_DIR") {
        let custom_config_dir = custom_config_dir.trim();
        if !custom_config_dir.is_empty() {
            return Ok(PathBuf::from(custom_config_dir));
        }
    }
    default_config_dir()
}

fn config_dir_creation_error(path: &Path) -> String {
    format!(
        "Failed to create config directory: {}. \
         Set TENANT_RESPONDER_CONFIG_DIR or pass --config-dir to use another location.",
        path.display()
    )
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        let config_dir = resolve_config_dir()?;
        let mut config = Self::load_or_init_in(&config_dir).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from `config_dir`, writing the default config first
    /// when the file does not exist yet. Env overrides are not applied here.
    pub async fn load_or_init_in(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        fs::create_dir_all(config_dir)
            .await
            .with_context(|| config_dir_creation_error(config_dir))?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path;
            config.validate()?;
            tracing::info!(
                path = %config.config_path.display(),
                tenants = config.tenants.len(),
                initialized = false,
                "Config loaded"
            );
            Ok(config)
        } else {
            let config = Config {
                config_path,
                ..Config::default()
            };
            config.save().await?;
            tracing::info!(
                path = %config.config_path.display(),
                tenants = config.tenants.len(),
                initialized = true,
                "Config loaded"
            );
            Ok(config)
        }
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        // Gateway
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }

        // Responder
        for (i, greeting) in self.responder.greetings.iter().enumerate() {
            if greeting.trim().is_empty() {
                anyhow::bail!("responder.greetings[{i}] must not be empty");
            }
        }

        // Tenants
        for (number, tenant) in &self.tenants {
            if tenant.name.trim().is_empty() {
                anyhow::bail!("tenants.\"{number}\".name must not be empty");
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|key| std::env::var(key).ok());
    }

    fn apply_overrides_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Gateway port: TENANT_RESPONDER_GATEWAY_PORT or PORT
        if let Some(port_str) =
            lookup("TENANT_RESPONDER_GATEWAY_PORT").or_else(|| lookup("PORT"))
        {
            if let Ok(port) = port_str.parse::<u16>() {
                self.gateway.port = port;
            }
        }

        // Gateway host: prefixed name only, shells often export HOST as the machine hostname
        if let Some(host) = lookup("TENANT_RESPONDER_GATEWAY_HOST") {
            if !host.is_empty() {
                self.gateway.host = host;
            }
        }
    }

    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;

        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or(CONFIG_FILE_NAME);
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .await
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .await
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, &self.config_path).await {
            let _ = fs::remove_file(&temp_path).await;
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        sync_directory(parent_dir).await
    }
}

async fn sync_directory(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path)
            .await
            .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
        dir.sync_all()
            .await
            .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}
