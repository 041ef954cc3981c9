mod types;

#[cfg(test)]
pub mod mock;

pub use types::*;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single upstream call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed upstream response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot build upstream url: {0}")]
    InvalidUrl(String),
    #[error("upstream call timed out")]
    Timeout,
}

impl UpstreamError {
    /// Whether repeating the call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Transport(_) | UpstreamError::Timeout => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            UpstreamError::Decode(_) | UpstreamError::InvalidUrl(_) => false,
        }
    }
}

/// The explorer-side data sources the ledger is built from.
#[async_trait]
pub trait Explorer: Send + Sync + 'static {
    /// Funded/spent totals and tx counts for the address.
    async fn address_summary(&self, address: &str) -> Result<AddressSummary, UpstreamError>;

    /// One page of the address history. `after` is the txid of the last transaction of the previous page.
    async fn address_txs(
        &self,
        address: &str,
        after: Option<&str>,
    ) -> Result<Vec<RawTransaction>, UpstreamError>;

    /// Outputs currently unspent for the address.
    async fn address_utxos(&self, address: &str) -> Result<Vec<Utxo>, UpstreamError>;

    /// Consensus-serialized transaction as hex.
    async fn raw_tx_hex(&self, txid: &str) -> Result<String, UpstreamError>;
}

/// An `Explorer` talking to an esplora REST API (blockstream.info, mempool.space, ...).
#[derive(Clone)]
pub struct EsploraClient {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl EsploraClient {
    /// Creates a client against the given API root, e.g. `https://blockstream.info/api`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url: Url = base_url.parse().context("invalid upstream url")?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("upstream url {} cannot be a base", base_url);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("cannot build http client")?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_text(&self, url: Url) -> Result<String, UpstreamError> {
        let client = self.client.clone();
        smol::unblock(move || {
            log::trace!("GET {}", url);
            let response = client.get(url.clone()).send()?;
            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok(response.text()?)
        })
        .await
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, url: Url) -> Result<T, UpstreamError> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Explorer for EsploraClient {
    async fn address_summary(&self, address: &str) -> Result<AddressSummary, UpstreamError> {
        self.get_json(self.url(&["address", address])?).await
    }

    async fn address_txs(
        &self,
        address: &str,
        after: Option<&str>,
    ) -> Result<Vec<RawTransaction>, UpstreamError> {
        let url = match after {
            None => self.url(&["address", address, "txs"])?,
            Some(last_seen) => self.url(&["address", address, "txs", "chain", last_seen])?,
        };
        self.get_json(url).await
    }

    async fn address_utxos(&self, address: &str) -> Result<Vec<Utxo>, UpstreamError> {
        self.get_json(self.url(&["address", address, "utxo"])?).await
    }

    async fn raw_tx_hex(&self, txid: &str) -> Result<String, UpstreamError> {
        self.get_text(self.url(&["tx", txid, "hex"])?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_cursor_urls() {
        let client = EsploraClient::new("https://blockstream.info/api/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            client.url(&["address", "bc1qxyz", "txs", "chain", "ab"]).unwrap().as_str(),
            "https://blockstream.info/api/address/bc1qxyz/txs/chain/ab"
        );
        // path separators inside an address must not escape the segment
        assert_eq!(
            client.url(&["address", "a/b", "utxo"]).unwrap().as_str(),
            "https://blockstream.info/api/address/a%2Fb/utxo"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(EsploraClient::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    }
}
