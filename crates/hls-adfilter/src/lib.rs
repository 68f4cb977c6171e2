//! Heuristic ad-break detection and removal for HLS media playlists.
//!
//! A media playlist is split into groups at `#EXT-X-DISCONTINUITY` markers, each group is
//! scored against a set of independent signals (SCTE-35 cues, ad `DATERANGE`s, foreign
//! hosts, duration shape, filename continuity, ad-ish paths), and groups that score as
//! strong ads are dropped from the text. If the ads would remove more than half of the
//! playlist, nothing is removed.
//!
//! ```no_run
//! use hls_adfilter::{AdFilterPipeline, PipelineOutcome};
//!
//! let playlist = std::fs::read_to_string("index.m3u8").unwrap();
//! let outcome = AdFilterPipeline::default().process(&playlist, "https://cdn.example.com/index.m3u8");
//! if let PipelineOutcome::Filtered(report) = &outcome {
//!     println!("removed {:.1}s", report.removed_duration);
//! }
//! let text = outcome.into_playlist(&playlist);
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod fetch;
pub mod grouper;
pub mod interceptor;
pub mod line;
pub mod naming;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod rebuilder;
pub mod rewrite;

pub use classifier::{ClassificationResult, GroupClassifier, GroupKind, Reason};
pub use config::{
    AdFilterConfig, FetchConfig, HeuristicThresholds, ScoringConfig, SignalWeights,
    VariantSelectionPolicy,
};
pub use error::{AdFilterError, Result};
pub use fetch::{FetchedPlaylist, HttpPlaylistFetcher, PlaylistFetcher, select_variant};
pub use grouper::{SegmentGroup, group_by_discontinuity};
pub use interceptor::{
    AdFilter, ElementId, InterceptedRequest, MediaSource, PlaylistInterceptor, is_playlist_url,
};
pub use line::{LineKind, is_master_playlist, is_media_playlist};
pub use notify::{
    Notifier, SilentNotifier, Toast, ToastSlot, TracingNotifier, filtered_message,
    format_duration,
};
pub use parser::{ParsedPlaylist, Segment, parse_media_playlist};
pub use pipeline::{
    AdFilterPipeline, AnalysisReport, FilterReport, GroupReport, PipelineOutcome, SkipReason,
};
pub use rebuilder::{normalize, rebuild_playlist};
pub use rewrite::{UriSite, absolutize_all, absolutize_ts_segments, rewrite_uris};
