//! Server configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `SCENED_`-prefixed environment variables (`__` separates nested keys, e.g.
//! `SCENED_WORKERS_AI__API_TOKEN`).

use std::net::SocketAddr;
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::images::CacheConfig;
use crate::scene::SceneConfig;
use crate::workers_ai::WorkersAiConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SCENED_";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Name reported by the health endpoint
    pub service_name: String,
    /// Image model identifier passed to the generator
    pub model: String,
    /// Public origin for generated links; defaults to `http://<Host>`
    pub public_url: Option<String>,
    /// Exact web origins allowed to read responses
    pub allowed_origins: Vec<String>,
    pub cache: CacheConfig,
    pub workers_ai: WorkersAiConfig,
    pub scene: SceneConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            service_name: "gothic-chronicle-images".to_string(),
            model: "@cf/leonardo/phoenix-1.0".to_string(),
            public_url: None,
            allowed_origins: vec!["https://richcande1-rca.github.io".to_string()],
            cache: CacheConfig::default(),
            workers_ai: WorkersAiConfig::default(),
            scene: SceneConfig::default(),
        }
    }
}

impl Config {
    /// Configuration sources, lowest precedence first
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration from all sources
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Public origin without a trailing slash
    pub fn public_origin(&self) -> Option<&str> {
        self.public_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use figment::Jail;

    use super::*;
    use crate::scene::Condition;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load(None)?;
            assert_eq!(config, Config::default());
            assert_eq!(config.model, "@cf/leonardo/phoenix-1.0");
            assert!(!config.workers_ai.is_configured());
            assert_eq!(config.scene.landmarks[0].room, "courtyard");
            Ok(())
        });
    }

    #[test]
    fn test_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "scened.toml",
                r#"
                bind_addr = "0.0.0.0:9000"
                public_url = "https://images.example.test/"
                allowed_origins = ["https://a.test", "https://b.test"]

                [cache]
                max_entries = 8

                [[scene.landmarks]]
                room = "courtyard"
                centerpiece = "central cracked stone fountain"
                features = ["weathered statues"]
                triggers = ["courtyard_ghost_seen"]

                [[scene.landmarks.overlays]]
                when = { kind = "flag", name = "courtyard_ghost_seen" }
                clause = "A pale apparition stands beside the {landmark}."
                "#,
            )?;

            let config = Config::load(Some(Path::new("scened.toml")))?;
            assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 9000)));
            assert_eq!(config.public_origin(), Some("https://images.example.test"));
            assert_eq!(config.allowed_origins.len(), 2);
            assert_eq!(config.cache.max_entries, 8);

            let landmark = &config.scene.landmarks[0];
            assert_eq!(
                landmark.triggers,
                BTreeSet::from(["courtyard_ghost_seen".to_string()])
            );
            assert_eq!(landmark.variant_tag, "variantB");
            assert_eq!(
                landmark.overlays[0].when,
                Condition::Flag("courtyard_ghost_seen".to_string())
            );
            // Untouched sections keep their defaults
            assert_eq!(config.scene.style, SceneConfig::default().style);
            assert_eq!(config.model, "@cf/leonardo/phoenix-1.0");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("scened.toml", r#"model = "from-file""#)?;
            jail.set_env("SCENED_MODEL", "from-env");
            jail.set_env("SCENED_WORKERS_AI__ACCOUNT_ID", "acct");
            jail.set_env("SCENED_WORKERS_AI__API_TOKEN", "secret");

            let config = Config::load(Some(Path::new("scened.toml")))?;
            assert_eq!(config.model, "from-env");
            assert!(config.workers_ai.is_configured());
            Ok(())
        });
    }

    #[test]
    fn test_public_origin_blank() {
        let config = Config {
            public_url: Some("/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.public_origin(), None);
    }
}
