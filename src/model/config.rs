use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const ENV_CONFIG_PATH: &str = "ENTITY_INTEL_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_GLEIF_BASE_URL: &str = "GLEIF_BASE_URL";
const GLEIF_API_BASE_URL: &str = "https://api.gleif.org/api/v1";

const ENV_WEB_SEARCH_API_KEY: &str = "WEB_SEARCH_API_KEY";
const ENV_WEB_SEARCH_BASE_URL: &str = "WEB_SEARCH_BASE_URL";
const WEB_SEARCH_API_BASE_URL: &str = "https://api.perplexity.ai";
const WEB_SEARCH_DEFAULT_MODEL: &str = "sonar";

/// Registry client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub page_size: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: GLEIF_API_BASE_URL.to_string(),
            timeout_secs: 30,
            page_size: 10,
        }
    }
}

/// Web-search fallback configuration
///
/// The API key only comes from the environment, never from the config file.
/// A missing key disables the fallback path entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            base_url: WEB_SEARCH_API_BASE_URL.to_string(),
            model: WEB_SEARCH_DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
            api_key: None,
        }
    }
}

/// Arbitration tuning knobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// Linear decay horizon for the registration-recency bias criterion
    pub recency_horizon_days: i64,
    /// Legal-form/name tokens indicating a subsidiary rather than an
    /// ultimate parent. Heuristic, deliberately configurable.
    pub subsidiary_form_tokens: Vec<String>,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            recency_horizon_days: 730,
            subsidiary_form_tokens: vec![
                "subsidiary".to_string(),
                "branch".to_string(),
                "division".to_string(),
            ],
        }
    }
}

/// Immutable lookup tables injected into the registry client and scorer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupTables {
    /// Country-code TLD → ISO 3166 country. Generic TLDs are deliberately
    /// absent; an unknown TLD scores as neutral, not as a mismatch.
    pub tld_jurisdictions: HashMap<String, String>,
    /// Well-known company-name fragments used by the prominence sub-score
    pub prominent_fragments: Vec<String>,
    /// Legal-suffix tokens stripped during dedup name comparison
    pub legal_suffixes: Vec<String>,
}

impl LookupTables {
    /// Jurisdiction implied by a domain's top-level suffix, if known.
    /// Handles multi-label suffixes ("example.co.uk" → GB) by taking the
    /// last label, and tolerates a leading scheme or "www." prefix.
    pub fn tld_jurisdiction(&self, domain: &str) -> Option<String> {
        let host = domain
            .trim()
            .trim_end_matches('/')
            .rsplit("://")
            .next()
            .unwrap_or(domain);
        let tld = host.rsplit('.').next()?.to_lowercase();
        self.tld_jurisdictions.get(&tld).cloned()
    }
}

impl Default for LookupTables {
    fn default() -> Self {
        let tld_jurisdictions = [
            ("us", "US"),
            ("uk", "GB"),
            ("de", "DE"),
            ("fr", "FR"),
            ("nl", "NL"),
            ("ch", "CH"),
            ("se", "SE"),
            ("es", "ES"),
            ("it", "IT"),
            ("jp", "JP"),
            ("cn", "CN"),
            ("in", "IN"),
            ("au", "AU"),
            ("ca", "CA"),
            ("br", "BR"),
            ("kr", "KR"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let prominent_fragments = [
            "apple", "microsoft", "google", "amazon", "meta", "netflix", "shell", "siemens",
            "toyota", "nestle", "samsung", "ibm", "oracle", "intel", "visa",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let legal_suffixes = [
            "inc",
            "incorporated",
            "corp",
            "corporation",
            "llc",
            "ltd",
            "limited",
            "plc",
            "gmbh",
            "ag",
            "sa",
            "nv",
            "bv",
            "co",
            "company",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            tld_jurisdictions,
            prominent_fragments,
            legal_suffixes,
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub registry: RegistryConfig,
    pub fallback: FallbackConfig,
    pub arbitration: ArbitrationConfig,
    pub lookup: LookupTables,
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub fallback: FallbackConfig,
    pub arbitration: ArbitrationConfig,
    pub lookup: LookupTables,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        let mut registry = file.registry;
        if let Ok(base) = std::env::var(ENV_GLEIF_BASE_URL) {
            registry.base_url = base;
        }

        let mut fallback = file.fallback;
        if let Ok(base) = std::env::var(ENV_WEB_SEARCH_BASE_URL) {
            fallback.base_url = base;
        }
        fallback.api_key = std::env::var(ENV_WEB_SEARCH_API_KEY).ok();

        Self {
            registry,
            fallback,
            arbitration: file.arbitration,
            lookup: file.lookup,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }
}
