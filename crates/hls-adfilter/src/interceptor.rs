//! The page-session service that sits between playlist producers and the player.
//!
//! [`AdFilter`] owns the per-URL result cache, the enable switch and the notifier. Every
//! interception point (response bodies, request objects, streaming-library loaders and
//! media element sources) funnels into [`AdFilter::process_playlist`], so a URL is
//! analyzed and reported at most once no matter how it was observed.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use moka::sync::Cache;
use tracing::{debug, warn};
use url::Url;

use crate::config::AdFilterConfig;
use crate::error::{AdFilterError, Result};
use crate::fetch::{PlaylistFetcher, select_variant};
use crate::line::{is_master_playlist, is_media_playlist};
use crate::notify::{Notifier, filtered_message};
use crate::pipeline::{AdFilterPipeline, PipelineOutcome};
use crate::rewrite::absolutize_ts_segments;

/// Capability implemented for adaptive-streaming client integrations: called with every
/// successfully loaded playlist before the library parses it.
pub trait PlaylistInterceptor: Send + Sync {
    fn on_load_success(&self, url: &str, body: String) -> String;
}

/// Whether a URL looks like an HLS playlist.
pub fn is_playlist_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains(".m3u8") || lower.contains("/hls/")
}

/// Identifies a player element for the media-source guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceState {
    Resolving(String),
    /// Resolution failed; the URL was handed back to the element unmodified.
    Passthrough(String),
}

/// What the element should be given after [`AdFilter::resolve_media_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Filtered media playlist text with absolute segment URIs.
    Playlist { url: String, content: String },
    /// Use the assigned URL directly.
    Original(String),
    /// Another call for this element is in flight or superseded this one; ignore.
    Stale,
}

pub struct AdFilter {
    config: AdFilterConfig,
    pipeline: AdFilterPipeline,
    enabled: AtomicBool,
    cache: Cache<String, Arc<str>>,
    notifier: Arc<dyn Notifier>,
    sources: DashMap<ElementId, SourceState>,
}

impl AdFilter {
    pub fn new(config: AdFilterConfig, notifier: Arc<dyn Notifier>) -> Self {
        let pipeline = AdFilterPipeline::new(config.scoring.clone(), config.max_removed_ratio);
        Self {
            enabled: AtomicBool::new(config.enabled),
            config,
            pipeline,
            // No capacity or expiry: an entry lives as long as the session.
            cache: Cache::builder().build(),
            notifier,
            sources: DashMap::new(),
        }
    }

    pub fn config(&self) -> &AdFilterConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &AdFilterPipeline {
        &self.pipeline
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Cached result for `url`, if it was processed before.
    pub fn cached(&self, url: &str) -> Option<Arc<str>> {
        self.cache.get(url)
    }

    /// Filter a media playlist fetched from `url`, memoized by URL.
    ///
    /// The first call for a URL runs the pipeline and, if ads were removed, notifies.
    /// Concurrent first calls for the same URL wait for a single computation. Later
    /// calls return the cached text and stay silent.
    pub fn process_playlist(&self, url: &str, content: &str) -> Arc<str> {
        if !self.is_enabled() {
            return Arc::from(content);
        }
        self.cache.get_with_by_ref(url, || {
            match self.pipeline.process(content, url) {
                PipelineOutcome::Filtered(report) => {
                    self.notifier
                        .notify(&filtered_message(report.removed_duration));
                    Arc::from(report.playlist)
                }
                outcome => {
                    debug!(url, ?outcome, "Playlist left unchanged");
                    Arc::from(content)
                }
            }
        })
    }

    /// Rewrite a response body if it is a media playlist served from a playlist-looking URL.
    pub fn intercept_response(&self, url: &str, body: String) -> String {
        if is_playlist_url(url) && is_media_playlist(&body) {
            self.process_playlist(url, &body).to_string()
        } else {
            body
        }
    }

    /// Start tracking a request whose body may be read several times.
    pub fn request(&self, url: impl Into<String>) -> InterceptedRequest<'_> {
        let url = url.into();
        InterceptedRequest {
            filter: self,
            is_playlist: is_playlist_url(&url),
            url,
            processed: OnceLock::new(),
        }
    }

    /// Resolve a playlist URL assigned to a player element.
    ///
    /// Master playlists are followed to one variant. The media playlist is filtered
    /// (cached under `url`) and its relative segment URIs are made absolute so the text
    /// can be loaded from anywhere. Failures fall back to [`MediaSource::Original`].
    pub async fn resolve_media_source<F>(
        &self,
        fetcher: &F,
        element: ElementId,
        url: &str,
    ) -> MediaSource
    where
        F: PlaylistFetcher + ?Sized,
    {
        match self.sources.get(&element).as_deref() {
            Some(SourceState::Resolving(current)) if current == url => return MediaSource::Stale,
            Some(SourceState::Passthrough(current)) if current == url => {
                return MediaSource::Original(url.to_string());
            }
            _ => {}
        }
        if !self.is_enabled() || !is_playlist_url(url) {
            // Still a new assignment: any resolve in flight for this element is superseded.
            self.sources.remove(&element);
            return MediaSource::Original(url.to_string());
        }
        self.sources
            .insert(element, SourceState::Resolving(url.to_string()));

        let result = self.load_media_source(fetcher, url).await;

        // Last writer wins: a newer assignment replaced our guard while we were fetching.
        let still_current = matches!(
            self.sources.get(&element).as_deref(),
            Some(SourceState::Resolving(current)) if current == url
        );
        if !still_current {
            debug!(url, ?element, "Discarding superseded media source");
            return MediaSource::Stale;
        }

        match result {
            Ok(Some(content)) => {
                self.sources.remove(&element);
                MediaSource::Playlist {
                    url: url.to_string(),
                    content,
                }
            }
            Ok(None) => {
                self.sources
                    .insert(element, SourceState::Passthrough(url.to_string()));
                MediaSource::Original(url.to_string())
            }
            Err(e) => {
                warn!(url, error = %e, "Media source interception failed, using original URL");
                self.sources
                    .insert(element, SourceState::Passthrough(url.to_string()));
                MediaSource::Original(url.to_string())
            }
        }
    }

    /// Forget the guard for an element, e.g. when it is removed from the page.
    pub fn release_element(&self, element: ElementId) {
        self.sources.remove(&element);
    }

    async fn load_media_source<F>(&self, fetcher: &F, url: &str) -> Result<Option<String>>
    where
        F: PlaylistFetcher + ?Sized,
    {
        let playlist_url = Url::parse(url).map_err(|e| AdFilterError::invalid_url(url, e.to_string()))?;
        let mut fetched = fetcher.fetch(url).await?;

        if is_master_playlist(&fetched.body) {
            let master_url = Url::parse(&fetched.url).unwrap_or_else(|_| playlist_url.clone());
            let variant = select_variant(
                &fetched.body,
                &master_url,
                self.config.fetch.variant_policy,
            )?;
            debug!(master = url, variant = %variant, "Following master playlist variant");
            fetched = fetcher.fetch(variant.as_str()).await?;
        }

        if !is_media_playlist(&fetched.body) {
            return Ok(None);
        }

        // Cached under the assigned URL, but segments are relative to the playlist that
        // actually listed them.
        let media_url = Url::parse(&fetched.url).unwrap_or(playlist_url);
        let filtered = self.process_playlist(url, &fetched.body);
        Ok(Some(absolutize_ts_segments(&filtered, &media_url)))
    }
}

impl PlaylistInterceptor for AdFilter {
    fn on_load_success(&self, url: &str, body: String) -> String {
        if is_media_playlist(&body) {
            self.process_playlist(url, &body).to_string()
        } else {
            body
        }
    }
}

/// A request whose body is filtered at most once, however many times it is read.
pub struct InterceptedRequest<'f> {
    filter: &'f AdFilter,
    url: String,
    is_playlist: bool,
    processed: OnceLock<String>,
}

impl InterceptedRequest<'_> {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The body the caller should see for `raw`.
    pub fn response_text(&self, raw: &str) -> String {
        if let Some(processed) = self.processed.get() {
            return processed.clone();
        }
        if self.is_playlist && is_media_playlist(raw) {
            return self
                .processed
                .get_or_init(|| self.filter.process_playlist(&self.url, raw).to_string())
                .clone();
        }
        raw.to_string()
    }
}
