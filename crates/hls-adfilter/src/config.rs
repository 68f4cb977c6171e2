use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdFilterError, Result};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// URL path fragments that mark a group as served from an ad inventory.
pub const DEFAULT_AD_PATH_KEYWORDS: &[&str] = &[
    "/ad/",
    "/ads/",
    "/advert/",
    "/preroll/",
    "/midroll/",
    "/promo/",
    "/commercial/",
    "/sponsor/",
];

// --- Top-Level Configuration ---
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdFilterConfig {
    /// Master switch. When disabled every interception point returns its input untouched.
    pub enabled: bool,
    pub scoring: ScoringConfig,
    /// Removal is abandoned when ad groups exceed this share of the playlist duration.
    pub max_removed_ratio: f64,
    /// How long a "filtered" notification stays visible.
    pub notification_timeout_ms: u64,
    pub fetch: FetchConfig,
}

impl Default for AdFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scoring: ScoringConfig::default(),
            max_removed_ratio: 0.5,
            notification_timeout_ms: 3000,
            fetch: FetchConfig::default(),
        }
    }
}

impl AdFilterConfig {
    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_removed_ratio) {
            return Err(AdFilterError::configuration(format!(
                "max_removed_ratio must be within [0, 1], got {}",
                self.max_removed_ratio
            )));
        }
        if self.scoring.suspect_score > self.scoring.strong_ad_score {
            return Err(AdFilterError::configuration(format!(
                "suspect_score ({}) must not exceed strong_ad_score ({})",
                self.scoring.suspect_score, self.scoring.strong_ad_score
            )));
        }
        if let Some(proxy) = &self.fetch.proxy
            && proxy.trim().is_empty()
        {
            return Err(AdFilterError::configuration("proxy URL is empty"));
        }
        Ok(())
    }
}

// --- Scoring Configuration ---
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: SignalWeights,
    pub thresholds: HeuristicThresholds,
    /// Groups scoring at or above this are removed.
    pub strong_ad_score: i32,
    /// Groups scoring at or above this (but below `strong_ad_score`) are only reported.
    pub suspect_score: i32,
    pub ad_path_keywords: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            thresholds: HeuristicThresholds::default(),
            strong_ad_score: 50,
            suspect_score: 25,
            ad_path_keywords: DEFAULT_AD_PATH_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

/// Score contributed by each signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub scte35: i32,
    pub ad_date_range: i32,
    pub ad_path: i32,
    pub high_precision_equal: i32,
    pub sequence_jump: i32,
    pub different_domain: i32,
    pub filename_jump: i32,
    pub fixed_duration: i32,
    pub uniform_short: i32,
    pub equal_duration: i32,
    pub filename_pattern: i32,
    pub consecutive_short: i32,
    pub prefix_anomaly: i32,
    pub very_short: i32,
    pub typical_ad_duration: i32,
    /// Subtracted from the first and last group of a playlist.
    pub edge_penalty: i32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            scte35: 70,
            ad_date_range: 65,
            ad_path: 60,
            high_precision_equal: 60,
            sequence_jump: 50,
            different_domain: 45,
            filename_jump: 45,
            fixed_duration: 40,
            uniform_short: 40,
            equal_duration: 35,
            filename_pattern: 35,
            consecutive_short: 35,
            prefix_anomaly: 35,
            very_short: 25,
            typical_ad_duration: 20,
            edge_penalty: 20,
        }
    }
}

/// Naming-convention thresholds for the neighbor comparisons.
///
/// These are empirical values, not derived from any model of how ad servers name
/// their segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicThresholds {
    /// Max numeric gap between the groups around a candidate for them to count as contiguous.
    pub sequence_neighbor_gap: u64,
    /// Min numeric gap between a candidate edge and its neighbor to count as a jump.
    pub sequence_jump_gap: u64,
    pub filename_jump_reconnect: usize,
    pub filename_jump_distance: usize,
    pub filename_pattern_reconnect: usize,
    pub filename_pattern_distance: usize,
}

impl Default for HeuristicThresholds {
    fn default() -> Self {
        Self {
            sequence_neighbor_gap: 10,
            sequence_jump_gap: 100,
            filename_jump_reconnect: 5,
            filename_jump_distance: 10,
            filename_pattern_reconnect: 8,
            filename_pattern_distance: 15,
        }
    }
}

// --- Fetch Configuration ---
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub user_agent: String,
    /// Optional upstream proxy (`http://`, `https://` or `socks5://`).
    pub proxy: Option<String>,
    pub variant_policy: VariantSelectionPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            connect_timeout_ms: 10_000,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            proxy: None,
            variant_policy: VariantSelectionPolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Which variant of a master playlist is followed when a player is handed one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantSelectionPolicy {
    /// The first variant listed, which is what players pick before bandwidth estimation.
    #[default]
    First,
    HighestBandwidth,
    LowestBandwidth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AdFilterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.ad_path_keywords.len(), 8);
        assert_eq!(config.notification_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AdFilterConfig = toml::from_str(
            r#"
            max_removed_ratio = 0.4

            [scoring.weights]
            scte35 = 90

            [fetch]
            variant_policy = "highest_bandwidth"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.max_removed_ratio, 0.4);
        assert_eq!(config.scoring.weights.scte35, 90);
        assert_eq!(config.scoring.weights.ad_date_range, 65);
        assert_eq!(config.scoring.strong_ad_score, 50);
        assert_eq!(
            config.fetch.variant_policy,
            VariantSelectionPolicy::HighestBandwidth
        );
    }

    #[test]
    fn rejects_inverted_score_thresholds() {
        let mut config = AdFilterConfig::default();
        config.scoring.suspect_score = 60;
        assert!(matches!(
            config.validate(),
            Err(AdFilterError::Configuration { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let config = AdFilterConfig {
            max_removed_ratio: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
