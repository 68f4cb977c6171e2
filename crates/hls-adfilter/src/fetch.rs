//! Playlist retrieval used by the media-source path and the proxy.

use std::sync::OnceLock;

use async_trait::async_trait;
use m3u8_rs::{Playlist, parse_playlist_res};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::{FetchConfig, VariantSelectionPolicy};
use crate::error::{AdFilterError, Result};
use crate::line::LineKind;

/// A playlist body together with the URL it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPlaylist {
    pub url: String,
    pub body: String,
}

#[async_trait]
pub trait PlaylistFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPlaylist>;
}

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// [`PlaylistFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpPlaylistFetcher {
    client: Client,
}

impl HttpPlaylistFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        install_rustls_provider();

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .pool_max_idle_per_host(10)
            .redirect(reqwest::redirect::Policy::limited(10));
        if config.timeout_ms > 0 {
            builder = builder.timeout(config.timeout());
        }
        if config.connect_timeout_ms > 0 {
            builder = builder.connect_timeout(config.connect_timeout());
        }
        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                AdFilterError::configuration(format!("invalid proxy URL {proxy_url}: {e}"))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| AdFilterError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PlaylistFetcher for HttpPlaylistFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPlaylist> {
        let parsed = Url::parse(url).map_err(|e| AdFilterError::invalid_url(url, e.to_string()))?;
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdFilterError::http_status(status, url));
        }
        let final_url = response.url().to_string();
        let bytes = response.bytes().await?;
        let body = String::from_utf8(bytes.to_vec())
            .map_err(|e| AdFilterError::invalid_content(url, format!("body is not UTF-8: {e}")))?;
        debug!(url, final_url, len = body.len(), "Fetched playlist");
        Ok(FetchedPlaylist {
            url: final_url,
            body,
        })
    }
}

/// Pick the media playlist a player would follow from a master playlist.
pub fn select_variant(
    master: &str,
    master_url: &Url,
    policy: VariantSelectionPolicy,
) -> Result<Url> {
    let uri = match parse_playlist_res(master.as_bytes()) {
        Ok(Playlist::MasterPlaylist(pl)) => {
            let variants = pl.variants.iter().filter(|v| !v.is_i_frame);
            let chosen = match policy {
                VariantSelectionPolicy::First => variants.into_iter().next(),
                VariantSelectionPolicy::HighestBandwidth => variants.max_by_key(|v| v.bandwidth),
                VariantSelectionPolicy::LowestBandwidth => variants.min_by_key(|v| v.bandwidth),
            };
            chosen.map(|v| v.uri.clone())
        }
        Ok(Playlist::MediaPlaylist(_)) => {
            return Err(AdFilterError::playlist(
                "expected a master playlist, got a media playlist",
            ));
        }
        Err(e) => {
            warn!(error = %e, "Master playlist did not parse, using first URI line");
            None
        }
    };

    let uri = uri
        .or_else(|| first_uri_line(master).map(str::to_string))
        .ok_or_else(|| AdFilterError::playlist("master playlist has no variants"))?;
    master_url
        .join(&uri)
        .map_err(|e| AdFilterError::invalid_url(uri, e.to_string()))
}

fn first_uri_line(content: &str) -> Option<&str> {
    content
        .split('\n')
        .find(|line| LineKind::classify(line) == LineKind::Uri)
        .map(str::trim)
}
