use std::{fs, ops::RangeInclusive};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

const DEFAULT_RUST_LOG: &str = "server=info,permit_server=info,tower_http=info";

#[derive(Parser, Debug, Clone, Deserialize)]
#[command(name = "server")]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    #[clap(long)]
    #[arg(short = 'c')]
    #[serde(default)]
    pub config: Option<String>,
    #[clap(long, env)]
    #[arg(default_value_t = String::from(DEFAULT_RUST_LOG))]
    #[serde(default = "default_rust_log")]
    pub rust_log: String,
    #[clap(long, env)]
    #[arg(value_parser = port_in_range, short = 'p', default_value_t = 4000)]
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base address of the policy decision point.
    #[clap(long, env)]
    #[arg(default_value_t = String::from("http://localhost:7766"))]
    #[serde(default = "default_pdp_url")]
    pub pdp_url: String,
    #[clap(long, env)]
    pub api_key: String,
    /// Seconds before a pdp call is abandoned.
    #[clap(long, env)]
    #[arg(default_value_t = 5)]
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[clap(long, env)]
    #[arg(default_value_t = String::from("user123"))]
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[clap(long, env)]
    pub first_name: String,
    #[clap(long, env)]
    pub last_name: String,
    #[clap(long, env)]
    pub email: String,
    #[clap(long, env)]
    pub action: String,
    /// `type` or `type:key`.
    #[clap(long, env)]
    pub resource: String,
    #[clap(long, env)]
    #[arg(default_value_t = String::from("default"))]
    #[serde(default = "default_tenant")]
    pub tenant: String,
}

fn default_rust_log() -> String {
    String::from(DEFAULT_RUST_LOG)
}

fn default_port() -> u16 {
    4000
}

fn default_pdp_url() -> String {
    String::from("http://localhost:7766")
}

fn default_timeout() -> u64 {
    5
}

fn default_user_id() -> String {
    String::from("user123")
}

fn default_tenant() -> String {
    String::from("default")
}

const PORT_RANGE: RangeInclusive<usize> = 1..=65535;

fn port_in_range(s: &str) -> Result<u16, String> {
    let port: usize = s
        .parse()
        .map_err(|_| format!("`{s}` isn't a port number"))?;
    if PORT_RANGE.contains(&port) {
        Ok(port as u16)
    } else {
        Err(format!(
            "port not in range {}-{}",
            PORT_RANGE.start(),
            PORT_RANGE.end()
        ))
    }
}

pub fn load(cfg: &str) -> Result<AppConfig> {
    let content =
        fs::read_to_string(cfg).context("could not read config file")?;
    parse(&content)
}

fn parse(content: &str) -> Result<AppConfig> {
    toml::from_str(content).context("could not parse config file")
}

#[cfg(test)]
pub(crate) fn sample() -> AppConfig {
    AppConfig {
        config: None,
        rust_log: default_rust_log(),
        port: default_port(),
        pdp_url: default_pdp_url(),
        api_key: "permit_key_test".to_owned(),
        timeout: default_timeout(),
        user_id: default_user_id(),
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
        email: "ada@example.com".to_owned(),
        action: "read".to_owned(),
        resource: "document".to_owned(),
        tenant: default_tenant(),
    }
}
