use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use clap::Parser;
use serde::*;

use crate::fetch::FetchPolicy;

const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
const DEFAULT_UPSTREAM: &str = "https://blockstream.info/api";

#[derive(Parser, Clone, Deserialize, Debug, Default)]
#[serde(default)]
pub struct Args {
    #[clap(long)]
    /// address to serve the API on [default: 127.0.0.1:5000]
    listen: Option<SocketAddr>,

    #[clap(long)]
    /// root of the esplora API to aggregate [default: https://blockstream.info/api]
    upstream: Option<String>,

    #[clap(long, short)]
    /// CORS origins allowed to access the API [default: *]
    allowed_origins: Option<Vec<String>>,

    #[clap(long)]
    /// deadline for each upstream call, in seconds [default: 10]
    timeout_secs: Option<u64>,

    #[clap(long)]
    /// most history pages fetched per address [default: 200]
    max_pages: Option<usize>,

    #[serde(skip)]
    #[clap(long)]
    /// YAML file with defaults for any of the options above
    config: Option<PathBuf>,

    #[serde(skip)]
    #[clap(long)]
    /// print the effective configuration as YAML and exit
    pub output_config: bool,

    #[serde(skip)]
    #[clap(long)]
    /// load the configuration, then exit without serving
    pub dry_run: bool,
}

impl Args {
    /// Resolves the effective configuration. Command-line values win over the config file.
    pub fn into_config(self) -> anyhow::Result<Config> {
        match self.config.clone() {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read config file {:?}", path))?;
                let baseline: Args = serde_yaml::from_str(&raw)
                    .with_context(|| format!("invalid config file {:?}", path))?;
                Ok(Config::from((self, baseline)))
            }
            None => Ok(Config::from(self)),
        }
    }
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq)]
pub struct Config {
    pub listen: SocketAddr,
    pub upstream: String,
    pub allowed_origins: Vec<String>,
    pub timeout_secs: u64,
    pub max_pages: usize,
}

impl Config {
    fn new(
        listen: Option<SocketAddr>,
        upstream: Option<String>,
        allowed_origins: Option<Vec<String>>,
        timeout_secs: Option<u64>,
        max_pages: Option<usize>,
    ) -> Config {
        let defaults = FetchPolicy::default();
        Config {
            listen: listen.unwrap_or_else(|| {
                SocketAddr::from_str(DEFAULT_LISTEN).expect("default listen address is valid")
            }),
            upstream: upstream.unwrap_or_else(|| DEFAULT_UPSTREAM.into()),
            allowed_origins: allowed_origins.unwrap_or_else(|| vec!["*".into()]),
            timeout_secs: timeout_secs.unwrap_or_else(|| defaults.timeout.as_secs()),
            max_pages: max_pages.unwrap_or(defaults.max_pages),
        }
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            max_pages: self.max_pages,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config::new(
            args.listen,
            args.upstream,
            args.allowed_origins,
            args.timeout_secs,
            args.max_pages,
        )
    }
}

impl From<(Args, Args)> for Config {
    fn from(args: (Args, Args)) -> Self {
        let (preference, baseline) = args;
        Config::new(
            preference.listen.or(baseline.listen),
            preference.upstream.or(baseline.upstream),
            preference.allowed_origins.or(baseline.allowed_origins),
            preference.timeout_secs.or(baseline.timeout_secs),
            preference.max_pages.or(baseline.max_pages),
        )
    }
}
