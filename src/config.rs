use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::{info, warn};

use crate::catalog::BoxCatalog;
use crate::orchestrator::Optimizer;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(&process_env)
    }

    /// Creates a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig::from_lookup(lookup),
            optimizer: OptimizerConfig::from_lookup(lookup),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 3000;
    const HOST_VAR: &'static str = "PACKAGING_API_HOST";
    const PORT_VAR: &'static str = "PACKAGING_API_PORT";

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let host_value = env_string(lookup, Self::HOST_VAR)
            .unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string(lookup, Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the packing optimizer.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    catalog: BoxCatalog,
    parallel_threshold: usize,
}

impl OptimizerConfig {
    const CATALOG_VAR: &'static str = "PACKAGING_BOX_CATALOG";
    const PARALLEL_THRESHOLD_VAR: &'static str = "PACKAGING_PARALLEL_THRESHOLD";

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let catalog = match env_string(lookup, Self::CATALOG_VAR) {
            Some(raw) => match BoxCatalog::from_json(&raw) {
                Ok(catalog) => {
                    info!(
                        "Using custom box catalog from {} ({} templates).",
                        Self::CATALOG_VAR,
                        catalog.len()
                    );
                    catalog
                }
                Err(err) => {
                    warn!(
                        "{} is invalid: {}. Using the default catalog.",
                        Self::CATALOG_VAR,
                        err
                    );
                    BoxCatalog::default()
                }
            },
            None => BoxCatalog::default(),
        };

        let parallel_threshold = load_usize_with_warning(
            lookup,
            Self::PARALLEL_THRESHOLD_VAR,
            Optimizer::DEFAULT_PARALLEL_THRESHOLD,
        );

        Self {
            catalog,
            parallel_threshold,
        }
    }

    /// Returns the configured box catalog.
    pub fn catalog(&self) -> &BoxCatalog {
        &self.catalog
    }

    /// Minimum batch size for parallel packing (`0` = never).
    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    /// Builds the optimizer shared by all request handlers.
    pub fn build_optimizer(&self) -> Optimizer {
        Optimizer::new(self.catalog.clone(), self.parallel_threshold)
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            catalog: BoxCatalog::default(),
            parallel_threshold: Optimizer::DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

fn process_env(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn env_string(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    let value = lookup(name)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn load_usize_with_warning(
    lookup: &dyn Fn(&str) -> Option<String>,
    var_name: &str,
    default: usize,
) -> usize {
    match env_string(lookup, var_name) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}
