use thiserror::Error;

use crate::permissions::PermissionRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
    #[error("Invalid permission rules: {0}")]
    Permissions(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub node: NodeConfig,
    pub forum: ForumConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    pub id: String,
    /// Directory of the page store
    pub page_store_path: String,
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// TCP port for inter-node cluster communication
    pub cluster_port: u16,
    pub discovery: DiscoveryConfig,
    pub election_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub peers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// DNS name to resolve for peer discovery (e.g., a Kubernetes headless service).
    pub dns_name: Option<String>,
    /// How often to poll for peer changes (seconds)
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ForumConfig {
    /// Install the metadata tables on open. Without them every listing is a title scan.
    pub metadata_tables: bool,
    pub permissions: PermissionRules,
    /// Base of the `url` field on created pages
    pub public_url: String,
    /// Upper bound for `limit` query parameters
    pub max_page_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dns_name: None,
            poll_interval_seconds: 5,
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_port: 9993,
            discovery: DiscoveryConfig::default(),
            election_timeout_ms: 3000,
            heartbeat_interval_ms: 300,
            peers: Vec::new(),
        }
    }
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            metadata_tables: true,
            permissions: PermissionRules::default(),
            public_url: "http://localhost:8080".to_string(),
            max_page_limit: 500,
        }
    }
}

impl ForumConfig {
    /// Public address of a page, by its prefixed document key.
    pub fn page_url(&self, prefixed_db_key: &str) -> String {
        format!("{}/wiki/{}", self.public_url.trim_end_matches('/'), prefixed_db_key)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let node_id = std::env::var("NODE_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let page_store_path =
            std::env::var("PAGE_STORE_PATH").unwrap_or_else(|_| "./pages".to_string());

        let peers: Vec<String> = std::env::var("PEERS")
            .map(|p| {
                p.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .filter(|s| !s.starts_with(&format!("{node_id}:")) && s != &node_id)
                    .collect()
            })
            .unwrap_or_default();

        let dns_name = std::env::var("DISCOVERY_DNS_NAME").ok();
        let poll_interval = std::env::var("DISCOVERY_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let cluster_port = std::env::var("CLUSTER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9993);

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let metadata_tables = std::env::var("FORUM_METADATA")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let public_url =
            std::env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let max_page_limit = std::env::var("MAX_PAGE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(500);

        let config = Config {
            node: NodeConfig {
                id: node_id,
                bind_address,
                data_dir,
                page_store_path,
            },
            cluster: ClusterConfig {
                cluster_port,
                peers,
                discovery: DiscoveryConfig {
                    dns_name,
                    poll_interval_seconds: poll_interval,
                },
                ..Default::default()
            },
            forum: ForumConfig {
                metadata_tables,
                permissions: load_permissions()?,
                public_url,
                max_page_limit,
            },
            test_mode,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.node.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "NODE_ID cannot be empty".to_string(),
            ));
        }

        if self.forum.max_page_limit == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_PAGE_LIMIT must be at least 1".to_string(),
            ));
        }

        let cluster_size = self.cluster.peers.len() + 1;
        if cluster_size > 1 && cluster_size.is_multiple_of(2) {
            tracing::warn!(
                "Cluster size {} is even. This may lead to split-brain scenarios. \
                 Consider using an odd number of nodes.",
                cluster_size
            );
        }

        Ok(())
    }

    /// Check if running in single-node mode.
    pub fn is_single_node(&self) -> bool {
        self.cluster.peers.is_empty() && self.cluster.discovery.dns_name.is_none()
    }
}

/// `FORUM_PERMISSIONS` inline, else `FORUM_PERMISSIONS_FILE`, else no rules.
fn load_permissions() -> Result<PermissionRules, ConfigError> {
    let json = match std::env::var("FORUM_PERMISSIONS") {
        Ok(json) => json,
        Err(_) => match std::env::var("FORUM_PERMISSIONS_FILE") {
            Ok(path) => std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Permissions(format!("{path}: {e}")))?,
            Err(_) => return Ok(PermissionRules::default()),
        },
    };

    PermissionRules::from_json(&json).map_err(|e| ConfigError::Permissions(e.to_string()))
}
