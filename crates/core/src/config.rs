use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `AFFILIATE_DESK__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub claim: ClaimConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Normalized-edit-distance cutoff for fuzzy client matching (strict upper bound).
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    /// How many header keywords must appear in the first row before it is dropped.
    #[serde(default = "default_header_keyword_threshold")]
    pub header_keyword_threshold: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimConfig {
    /// Length of generated assignment codes, excluding the separator.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    #[serde(default = "default_display_currency")]
    pub display_currency: String,
}

fn default_match_threshold() -> f64 {
    0.3
}
fn default_header_keyword_threshold() -> usize {
    3
}
fn default_code_length() -> usize {
    8
}
fn default_display_currency() -> String {
    "CAD".to_string()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            header_keyword_threshold: default_header_keyword_threshold(),
        }
    }
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            display_currency: default_display_currency(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            import: ImportConfig::default(),
            claim: ClaimConfig::default(),
            reporting: ReportingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("AFFILIATE_DESK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
