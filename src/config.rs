use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::optimizer::CuttingConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
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
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "CUT_IT_NOW_API_HOST";
    const PORT_VAR: &'static str = "CUT_IT_NOW_API_PORT";

    fn from_env() -> Self {
        let (bind_ip, display_host) = env_string(Self::HOST_VAR)
            .and_then(|raw| parse_host(&raw, Self::HOST_VAR))
            .unwrap_or((
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                Self::DEFAULT_HOST.to_string(),
            ));

        let port = env_string(Self::PORT_VAR)
            .and_then(|raw| parse_port(&raw, Self::PORT_VAR))
            .unwrap_or(Self::DEFAULT_PORT);

        Self {
            bind_ip,
            display_host,
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

/// Configuration for the cutting optimizer.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    cutting: CuttingConfig,
}

impl OptimizerConfig {
    const ALLOW_ROTATION_VAR: &'static str = "CUT_IT_NOW_ALLOW_ROTATION";
    const BASELINE_EFFICIENCY_VAR: &'static str = "CUT_IT_NOW_BASELINE_EFFICIENCY";
    const MAX_ALTERNATIVES_VAR: &'static str = "CUT_IT_NOW_MAX_ALTERNATIVES";
    const REFINE_GENERATIONS_VAR: &'static str = "CUT_IT_NOW_REFINE_GENERATIONS";

    fn from_env() -> Self {
        let allow_rotation = env_string(Self::ALLOW_ROTATION_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ALLOW_ROTATION_VAR))
            .unwrap_or(CuttingConfig::DEFAULT_ALLOW_ROTATION);

        let baseline_efficiency = load_f64_with_warning(
            Self::BASELINE_EFFICIENCY_VAR,
            CuttingConfig::DEFAULT_BASELINE_EFFICIENCY,
            |value| value > 0.0 && value <= 1.0,
            "must be greater than 0 and at most 1",
            "Adjusted baseline efficiency changes the reported savings",
        );

        let max_alternatives = load_usize(
            Self::MAX_ALTERNATIVES_VAR,
            CuttingConfig::DEFAULT_MAX_ALTERNATIVES,
        );

        let refine_generations = load_usize(
            Self::REFINE_GENERATIONS_VAR,
            CuttingConfig::DEFAULT_REFINE_GENERATIONS,
        );

        let cutting = CuttingConfig::builder()
            .allow_rotation(allow_rotation)
            .baseline_efficiency(baseline_efficiency)
            .max_alternatives(max_alternatives)
            .refine_generations(refine_generations)
            .build();

        Self { cutting }
    }

    /// Returns the configured CuttingConfig.
    pub fn cutting_config(&self) -> CuttingConfig {
        self.cutting
    }
}

impl From<CuttingConfig> for OptimizerConfig {
    fn from(cutting: CuttingConfig) -> Self {
        Self { cutting }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            log::warn!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name,
                err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            log::warn!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn parse_host(raw: &str, var_name: &str) -> Option<(IpAddr, String)> {
    match raw.parse::<IpAddr>() {
        Ok(ip) => Some((ip, raw.to_owned())),
        Err(err) => {
            log::warn!(
                "⚠️ {} ('{}') is not an IP address: {}. Binding to all interfaces.",
                var_name,
                raw,
                err
            );
            None
        }
    }
}

fn parse_port(raw: &str, var_name: &str) -> Option<u16> {
    match raw.parse::<u16>() {
        Ok(0) => {
            log::warn!("⚠️ {} must not be 0. Using default port.", var_name);
            None
        }
        Ok(port) => Some(port),
        Err(err) => {
            log::warn!(
                "⚠️ {} ('{}') is not a valid port: {}. Using default port.",
                var_name,
                raw,
                err
            );
            None
        }
    }
}

fn parse_positive_usize(raw: &str, var_name: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        Ok(_) => {
            log::warn!("⚠️ {} must be at least 1. Using default value.", var_name);
            None
        }
        Err(err) => {
            log::warn!(
                "⚠️ Could not parse {} ('{}') as count: {}. Using default value.",
                var_name,
                raw,
                err
            );
            None
        }
    }
}

fn load_usize(var_name: &str, default: usize) -> usize {
    env_string(var_name)
        .and_then(|raw| parse_positive_usize(&raw, var_name))
        .unwrap_or(default)
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    log::warn!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name,
                        raw,
                        invalid_hint,
                        default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        log::info!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                log::warn!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name,
                    raw,
                    err,
                    default
                );
                default
            }
        },
        None => default,
    }
}
