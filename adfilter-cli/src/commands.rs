use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use hls_adfilter::{
    AdFilter, AdFilterConfig, AdFilterPipeline, AnalysisReport, HttpPlaylistFetcher,
    PlaylistFetcher, TracingNotifier, is_master_playlist, select_variant,
};
use tracing::{debug, info};
use url::Url;

use crate::cli::OutputFormat;
use crate::error::{AppError, Result};
use crate::server::{AppState, ProxyServer, ServerConfig};

/// A playlist read from a file, stdin or the network, with the URL it belongs to.
#[derive(Debug)]
pub struct LoadedPlaylist {
    pub base_url: String,
    pub content: String,
}

pub struct CommandExecutor {
    config: AdFilterConfig,
}

impl CommandExecutor {
    pub fn new(config: AdFilterConfig) -> Self {
        Self { config }
    }

    pub async fn filter(
        &self,
        input: &str,
        base_url: Option<&str>,
        output: Option<&Path>,
    ) -> Result<()> {
        let playlist = self.load(input, base_url).await?;
        let filter = AdFilter::new(self.config.clone(), Arc::new(TracingNotifier));
        let filtered = filter.process_playlist(&playlist.base_url, &playlist.content);

        match output {
            Some(path) => {
                tokio::fs::write(path, filtered.as_bytes()).await?;
                info!("Wrote filtered playlist to {}", path.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(filtered.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    pub async fn analyze(
        &self,
        input: &str,
        base_url: Option<&str>,
        format: OutputFormat,
    ) -> Result<()> {
        let playlist = self.load(input, base_url).await?;
        let pipeline = AdFilterPipeline::new(
            self.config.scoring.clone(),
            self.config.max_removed_ratio,
        );
        let report = pipeline.analyze(&playlist.content, &playlist.base_url);

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Pretty => print!("{}", render_report(&report)),
        }
        Ok(())
    }

    pub async fn serve(&self, server: ServerConfig) -> Result<()> {
        let state = AppState::new(&self.config)?;
        ProxyServer::new(server, state).run().await
    }

    /// Read `input` as a URL, `-` (stdin) or a file path.
    async fn load(&self, input: &str, base_url: Option<&str>) -> Result<LoadedPlaylist> {
        if input.starts_with("http://") || input.starts_with("https://") {
            let fetcher = HttpPlaylistFetcher::new(&self.config.fetch)?;
            return fetch_media_playlist(&fetcher, input, &self.config).await;
        }

        let content = if input == "-" {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        } else {
            tokio::fs::read_to_string(input).await?
        };
        Ok(LoadedPlaylist {
            base_url: base_url.unwrap_or_default().to_string(),
            content,
        })
    }
}

/// Fetch `url`, following a master playlist to the variant chosen by the configured policy.
pub async fn fetch_media_playlist<F>(
    fetcher: &F,
    url: &str,
    config: &AdFilterConfig,
) -> Result<LoadedPlaylist>
where
    F: PlaylistFetcher + ?Sized,
{
    let fetched = fetcher.fetch(url).await?;
    if !is_master_playlist(&fetched.body) {
        return Ok(LoadedPlaylist {
            base_url: fetched.url,
            content: fetched.body,
        });
    }

    let master_url = Url::parse(&fetched.url)
        .map_err(|e| AppError::InvalidInput(format!("invalid playlist URL {}: {e}", fetched.url)))?;
    let variant = select_variant(&fetched.body, &master_url, config.fetch.variant_policy)?;
    debug!(variant = %variant, "Following master playlist variant");
    let media = fetcher.fetch(variant.as_str()).await?;
    Ok(LoadedPlaylist {
        base_url: media.url,
        content: media.body,
    })
}

fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let host = if report.base_hostname.is_empty() {
        "-"
    } else {
        report.base_hostname.as_str()
    };
    out.push_str(&format!(
        "Host: {host}\nSegments: {}  Duration: {:.1}s\n",
        report.segment_count, report.total_duration
    ));
    if let Some(skipped) = report.skipped {
        out.push_str(&format!("Not analyzed: {skipped:?}\n"));
        return out;
    }

    for group in &report.groups {
        let last = group.first_segment + group.segment_count.saturating_sub(1);
        let reasons = group
            .reasons
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "#{:<3} segments {:>4}-{:<4} {:>7.1}s  score {:>4}  {:<9}  {}\n",
            group.index,
            group.first_segment,
            last,
            group.duration,
            group.score,
            group.kind.as_str(),
            reasons
        ));
    }
    out.push_str(&format!(
        "Ad duration: {:.1}s of {:.1}s\n",
        report.ad_duration(),
        report.total_duration
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hls_adfilter::{FetchedPlaylist, VariantSelectionPolicy};
    use hls_adfilter::error::AdFilterError;
    use std::collections::HashMap;

    struct FixtureFetcher(HashMap<&'static str, &'static str>);

    #[async_trait::async_trait]
    impl PlaylistFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> hls_adfilter::Result<FetchedPlaylist> {
            self.0
                .get(url)
                .map(|body| FetchedPlaylist {
                    url: url.to_string(),
                    body: body.to_string(),
                })
                .ok_or_else(|| AdFilterError::playlist(format!("no fixture for {url}")))
        }
    }

    #[tokio::test]
    async fn fetch_follows_selected_variant() {
        let fetcher = FixtureFetcher(HashMap::from([
            (
                "https://cdn.example.com/master.m3u8",
                "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1000\nlow.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=9000\nhigh.m3u8\n",
            ),
            ("https://cdn.example.com/high.m3u8", "#EXTM3U\n#EXTINF:4,\nh.ts\n"),
        ]));
        let mut config = AdFilterConfig::default();
        config.fetch.variant_policy = VariantSelectionPolicy::HighestBandwidth;

        let loaded = fetch_media_playlist(&fetcher, "https://cdn.example.com/master.m3u8", &config)
            .await
            .unwrap();
        assert_eq!(loaded.base_url, "https://cdn.example.com/high.m3u8");
        assert!(loaded.content.contains("h.ts"));
    }

    #[test]
    fn report_lists_groups() {
        let playlist = "#EXTM3U\n#EXTINF:10,\na1.ts\n#EXTINF:9,\na2.ts\n#EXT-X-DISCONTINUITY\n#EXT-X-CUE-OUT\n#EXTINF:4,\nad1.ts\n#EXTINF:4,\nad2.ts\n#EXT-X-CUE-IN\n#EXT-X-DISCONTINUITY\n#EXTINF:10,\na3.ts\n#EXTINF:8,\na4.ts\n";
        let report =
            AdFilterPipeline::default().analyze(playlist, "https://cdn.example.com/index.m3u8");
        let text = render_report(&report);
        assert!(text.starts_with("Host: cdn.example.com\nSegments: 6"));
        assert!(text.contains("strong_ad"));
        assert!(text.contains("SCTE-35"));
        assert!(text.ends_with("Ad duration: 8.0s of 45.0s\n"));
    }

    #[test]
    fn report_explains_skips() {
        let report = AdFilterPipeline::default().analyze("#EXTM3U\n#EXT-X-ENDLIST\n", "");
        assert!(render_report(&report).contains("Not analyzed: NoSegments"));
    }
}
