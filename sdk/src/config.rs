use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::pubkey::Pubkey;

use crate::submitter::{SubmitOptions, DEFAULT_POLL_INTERVAL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub url: String,
    pub label: Option<String>,
}

impl ClusterInfo {
    pub fn explorer_url(&self, signature: &str) -> Option<String> {
        self.label.as_ref().map(|label| {
            format!(
                "https://explorer.solana.com/tx/{}?cluster={}",
                signature, label
            )
        })
    }
}

/// File passed with `--config`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SssConfig {
    pub token: Option<TokenConfig>,
    pub extensions: Option<ExtensionsConfig>,
    pub network: Option<NetworkConfig>,
    pub client: Option<ClientConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: Option<u8>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionsConfig {
    pub permanent_delegate: Option<bool>,
    pub transfer_hook: Option<bool>,
    pub transfer_hook_program: Option<String>,
    pub default_account_frozen: Option<bool>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            permanent_delegate: Some(false),
            transfer_hook: Some(false),
            transfer_hook_program: None,
            default_account_frozen: Some(false),
        }
    }
}

impl ExtensionsConfig {
    /// `sss-1` is the minimal preset, `sss-2` adds the compliance extensions.
    pub fn from_preset(preset: &str) -> Result<Self> {
        let compliance = match preset.to_lowercase().as_str() {
            "sss-1" => false,
            "sss-2" => true,
            other => return Err(anyhow!("Invalid preset: {}", other)),
        };
        Ok(Self {
            permanent_delegate: Some(compliance),
            transfer_hook: Some(compliance),
            transfer_hook_program: None,
            default_account_frozen: Some(false),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    pub cluster: Option<String>,
    pub keypair_path: Option<String>,
    pub commitment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    pub program_id: Option<String>,
    pub confirm_timeout_secs: Option<u64>,
    pub skip_preflight: Option<bool>,
}

impl ClientConfig {
    pub fn program_id(&self) -> Result<Pubkey> {
        match self.program_id.as_deref() {
            Some(value) => parse_pubkey(value),
            None => Ok(crate::ID),
        }
    }

    /// A timeout of zero disables waiting for confirmation.
    pub fn submit_options(&self) -> SubmitOptions {
        let defaults = SubmitOptions::default();
        SubmitOptions {
            skip_preflight: self.skip_preflight.unwrap_or(defaults.skip_preflight),
            confirm_timeout: match self.confirm_timeout_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.confirm_timeout,
            },
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The subset of `~/.config/solana/cli/config.yml` we read.
#[derive(Debug, Clone, Deserialize)]
pub struct SolanaCliConfig {
    pub json_rpc_url: String,
    pub keypair_path: String,
    pub commitment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNetwork {
    pub cluster: ClusterInfo,
    pub keypair_path: PathBuf,
    pub commitment: CommitmentConfig,
}

/// Precedence: explicit flag, then the `[network]` table, then the Solana CLI
/// config, then defaults.
pub fn resolve_network(
    cluster_flag: Option<&str>,
    keypair_flag: Option<&str>,
    network_override: Option<&NetworkConfig>,
    solana_config: Option<&SolanaCliConfig>,
) -> Result<ResolvedNetwork> {
    let cluster_value = if let Some(value) = cluster_flag {
        value.to_string()
    } else if let Some(value) = network_override.and_then(|cfg| cfg.cluster.as_deref()) {
        value.to_string()
    } else if let Some(config) = solana_config {
        config.json_rpc_url.clone()
    } else {
        "devnet".to_string()
    };
    let cluster = resolve_cluster(&cluster_value)?;

    let keypair_value = if let Some(value) = keypair_flag {
        value.to_string()
    } else if let Some(value) = network_override.and_then(|cfg| cfg.keypair_path.as_deref()) {
        value.to_string()
    } else if let Some(config) = solana_config {
        config.keypair_path.clone()
    } else {
        return Err(anyhow!(
            "Missing keypair path. Use --keypair or Solana CLI config."
        ));
    };

    let commitment_value = network_override
        .and_then(|cfg| cfg.commitment.clone())
        .or_else(|| solana_config.and_then(|cfg| cfg.commitment.clone()));

    Ok(ResolvedNetwork {
        cluster,
        keypair_path: expand_tilde(&keypair_value),
        commitment: parse_commitment(commitment_value.as_deref()),
    })
}

pub fn load_sss_config(path: &str) -> Result<SssConfig> {
    let resolved = expand_tilde(path);
    let contents = fs::read_to_string(&resolved)
        .with_context(|| format!("Failed to read config: {}", resolved.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", resolved.display()))
}

pub fn load_solana_cli_config() -> Result<SolanaCliConfig> {
    load_solana_cli_config_from(&default_solana_config_path())
}

pub fn load_solana_cli_config_from(path: &Path) -> Result<SolanaCliConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read Solana config: {}", path.display()))?;
    serde_yaml::from_str(&contents).context("Failed to parse Solana config")
}

pub fn default_solana_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    [".config", "solana", "cli", "config.yml"]
        .iter()
        .fold(home, |path, part| path.join(part))
}

/// Monikers, RPC endpoint and explorer label of the public clusters.
const CLUSTERS: &[(&[&str], &str, Option<&str>)] = &[
    (&["devnet"], "https://api.devnet.solana.com", Some("devnet")),
    (&["testnet"], "https://api.testnet.solana.com", Some("testnet")),
    (
        &["mainnet", "mainnet-beta"],
        "https://api.mainnet-beta.solana.com",
        Some("mainnet-beta"),
    ),
    (&["localnet", "localhost"], "http://127.0.0.1:8899", None),
];

/// Accepts a moniker or a raw http(s) URL. A custom URL gets an explorer
/// label when its host names a public cluster.
pub fn resolve_cluster(input: &str) -> Result<ClusterInfo> {
    let moniker = input.to_lowercase();
    let known = CLUSTERS
        .iter()
        .find(|(names, _, _)| names.contains(&moniker.as_str()));
    if let Some((_, url, label)) = known {
        return Ok(ClusterInfo {
            url: url.to_string(),
            label: label.map(str::to_string),
        });
    }

    if !moniker.starts_with("http://") && !moniker.starts_with("https://") {
        return Err(anyhow!(
            "Unknown cluster: {} (expected devnet, testnet, mainnet, localnet or an RPC URL)",
            input
        ));
    }
    let label = CLUSTERS
        .iter()
        .find_map(|(names, _, label)| (*label).filter(|_| moniker.contains(names[0])));
    Ok(ClusterInfo {
        url: input.to_string(),
        label: label.map(str::to_string),
    })
}

/// Unknown or missing levels fall back to `confirmed`.
pub fn parse_commitment(value: Option<&str>) -> CommitmentConfig {
    value
        .and_then(|level| CommitmentLevel::from_str(level).ok())
        .map(|commitment| CommitmentConfig { commitment })
        .unwrap_or_else(CommitmentConfig::confirmed)
}

pub fn expand_tilde(path: &str) -> PathBuf {
    let path = Path::new(path);
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

pub fn parse_pubkey(value: &str) -> Result<Pubkey> {
    value
        .parse()
        .with_context(|| format!("Invalid pubkey: {}", value))
}
