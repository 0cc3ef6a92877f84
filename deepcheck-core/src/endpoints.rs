//! Endpoint resolution
//!
//! Turns `--ips` / `--ports` style lists into the ordered endpoint list the
//! run executes against:
//! - one port in the list: applies to every host
//! - several ports: one per host, positions map 1:1
//! - no ports: embedded `host:port` or the default port

use crate::error::ConfigError;
use crate::models::Endpoint;

pub const DEFAULT_PORT: u16 = 4370;

/// Resolve comma-separated host tokens and an optional comma-separated port
/// list. Output order follows the host list; duplicates are kept.
pub fn resolve_endpoints(hosts: &str, ports: &str) -> Result<Vec<Endpoint>, ConfigError> {
    let tokens = split_list(hosts);
    if tokens.is_empty() {
        return Err(ConfigError::NoHosts);
    }

    let parsed = tokens
        .iter()
        .map(|token| split_host_port(token))
        .collect::<Result<Vec<_>, _>>()?;

    let port_tokens = split_list(ports);
    let ports: Vec<u16> = match port_tokens.len() {
        0 => parsed
            .iter()
            .map(|(_, embedded)| embedded.unwrap_or(DEFAULT_PORT))
            .collect(),
        1 => vec![parse_port(port_tokens[0])?; parsed.len()],
        n if n != parsed.len() => {
            return Err(ConfigError::PortCountMismatch {
                ports: n,
                hosts: parsed.len(),
            })
        }
        _ => port_tokens
            .iter()
            .map(|p| parse_port(p))
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(parsed
        .into_iter()
        .zip(ports)
        .map(|((host, _), port)| Endpoint::new(host, port))
        .collect())
}

/// Parse a single `host` or `host:port` token (negative-check target).
pub fn parse_endpoint(token: &str) -> Result<Endpoint, ConfigError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ConfigError::NoHosts);
    }
    let (host, port) = split_host_port(token)?;
    Ok(Endpoint::new(host, port.unwrap_or(DEFAULT_PORT)))
}

fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
}

fn split_host_port(token: &str) -> Result<(String, Option<u16>), ConfigError> {
    let (host, port) = match token.rsplit_once(':') {
        Some((host, port)) => (host.trim(), Some(parse_port(port)?)),
        None => (token, None),
    };
    if host.is_empty() {
        return Err(ConfigError::EmptyHost(token.to_string()));
    }
    Ok((host.to_string(), port))
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.trim().to_string()))
}
