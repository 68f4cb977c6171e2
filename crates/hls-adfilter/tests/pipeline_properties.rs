use hls_adfilter::{
    AdFilterPipeline, GroupKind, PipelineOutcome, Reason, SkipReason, parse_media_playlist,
};

const BASE: &str = "https://vod.example.com/movie/index.m3u8";

const HEAD_DURATIONS: [f64; 8] = [10.010, 9.343, 10.677, 8.008, 10.010, 9.676, 11.011, 7.341];
const TAIL_DURATIONS: [f64; 7] = [10.344, 9.009, 10.010, 8.675, 11.345, 9.843, 6.006];

fn push_segments(out: &mut String, durations: &[f64], first_number: usize) {
    for (i, d) in durations.iter().enumerate() {
        out.push_str(&format!("#EXTINF:{d:.3},\nseg{:04}.ts\n", first_number + i));
    }
}

fn header() -> String {
    "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:12\n#EXT-X-MEDIA-SEQUENCE:0\n#EXT-X-PLAYLIST-TYPE:VOD\n"
        .to_string()
}

/// Content, an SCTE-35 bracketed break of four 4 second segments, content.
fn scte35_playlist() -> String {
    let mut out = header();
    push_segments(&mut out, &HEAD_DURATIONS, 1);
    out.push_str("#EXT-X-DISCONTINUITY\n#EXT-X-CUE-OUT:16\n");
    for i in 1..=4 {
        out.push_str(&format!("#EXTINF:4.000,\nbreak_{i}.ts\n"));
    }
    out.push_str("#EXT-X-CUE-IN\n#EXT-X-DISCONTINUITY\n");
    push_segments(&mut out, &TAIL_DURATIONS, 9);
    out.push_str("#EXT-X-ENDLIST\n");
    out
}

/// Twenty segments, five of them served from an ad host with identical durations.
fn foreign_host_playlist() -> String {
    let mut out = header();
    push_segments(&mut out, &HEAD_DURATIONS, 1);
    out.push_str("#EXT-X-DISCONTINUITY\n");
    for i in 1..=5 {
        out.push_str(&format!(
            "#EXTINF:6.00000,\nhttps://cdn.adserve.net/creative/spot_{i}.ts\n"
        ));
    }
    out.push_str("#EXT-X-DISCONTINUITY\n");
    push_segments(&mut out, &TAIL_DURATIONS, 9);
    out.push_str("#EXT-X-ENDLIST\n");
    out
}

/// A two segment intro of 30 second chunks followed by regular content.
fn long_intro_playlist() -> String {
    let mut out = header();
    out.push_str("#EXTINF:30.000,\nseg0001.ts\n#EXTINF:30.000,\nseg0002.ts\n");
    out.push_str("#EXT-X-DISCONTINUITY\n");
    push_segments(&mut out, &HEAD_DURATIONS, 3);
    out.push_str("#EXT-X-ENDLIST\n");
    out
}

fn extinf_count(text: &str) -> usize {
    text.lines().filter(|l| l.starts_with("#EXTINF:")).count()
}

fn filter(text: &str) -> String {
    AdFilterPipeline::default()
        .process(text, BASE)
        .into_playlist(text)
}

#[test]
fn scte35_break_is_removed() {
    let input = scte35_playlist();
    let pipeline = AdFilterPipeline::default();

    let report = pipeline.analyze(&input, BASE);
    let ad_group = &report.groups[1];
    assert_eq!(ad_group.kind, GroupKind::StrongAd);
    assert!(ad_group.score >= 110, "score was {}", ad_group.score);
    assert!(ad_group.reasons.contains(&Reason::Scte35));
    assert!(ad_group.reasons.contains(&Reason::FixedDuration));

    let PipelineOutcome::Filtered(result) = pipeline.process(&input, BASE) else {
        panic!("expected the break to be removed");
    };
    assert_eq!(extinf_count(&result.playlist), extinf_count(&input) - 4);
    assert!(!result.playlist.contains("break_"));
    assert_eq!(result.removed_segments, 4);
    assert_eq!(result.removed_duration, 16.0);
    assert!(result.playlist.ends_with("#EXT-X-ENDLIST\n"));
}

#[test]
fn foreign_host_group_is_removed() {
    let input = foreign_host_playlist();
    assert_eq!(extinf_count(&input), 20);

    let report = AdFilterPipeline::default().analyze(&input, BASE);
    let ad_group = &report.groups[1];
    assert_eq!(ad_group.segment_count, 5);
    assert!(ad_group.reasons.contains(&Reason::DifferentDomain));
    assert!(ad_group.reasons.contains(&Reason::HighPrecisionEqual));
    assert!(ad_group.score >= 105, "score was {}", ad_group.score);
    assert_eq!(report.groups[0].kind, GroupKind::Normal);
    assert_eq!(report.groups[2].kind, GroupKind::Normal);

    let output = filter(&input);
    assert_eq!(extinf_count(&output), 15);
    assert!(!output.contains("adserve"));
}

#[test]
fn long_intro_at_the_edge_is_kept() {
    let input = long_intro_playlist();
    let report = AdFilterPipeline::default().analyze(&input, BASE);
    let intro = &report.groups[0];
    assert_eq!(intro.kind, GroupKind::Normal);
    assert!(intro.score < 25);
    assert!(intro.reasons.contains(&Reason::EdgePosition));

    assert_eq!(
        AdFilterPipeline::default().process(&input, BASE),
        PipelineOutcome::NoAds
    );
}

#[test]
fn master_playlist_is_not_analyzed() {
    let master = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720\nmid/index.m3u8\n";
    assert_eq!(
        AdFilterPipeline::default().process(master, BASE),
        PipelineOutcome::Skipped(SkipReason::MasterPlaylist)
    );
    assert_eq!(filter(master), master);
}

#[test]
fn playlist_without_discontinuities_is_unchanged() {
    let mut input = header();
    push_segments(&mut input, &HEAD_DURATIONS, 1);
    input.push_str("#EXT-X-ENDLIST\n");
    assert_eq!(
        AdFilterPipeline::default().process(&input, BASE),
        PipelineOutcome::Skipped(SkipReason::SingleGroup)
    );
    assert_eq!(filter(&input), input);
}

#[test]
fn removal_larger_than_half_is_refused() {
    let mut input = header();
    input.push_str("#EXTINF:5.500,\nseg0001.ts\n#EXT-X-DISCONTINUITY\n#EXT-X-CUE-OUT:32\n");
    for i in 1..=8 {
        input.push_str(&format!("#EXTINF:4.000,\nbreak_{i}.ts\n"));
    }
    input.push_str("#EXT-X-CUE-IN\n#EXT-X-DISCONTINUITY\n#EXTINF:6.250,\nseg0002.ts\n#EXT-X-ENDLIST\n");

    let outcome = AdFilterPipeline::default().process(&input, BASE);
    let PipelineOutcome::SafetyValve {
        ad_duration,
        total_duration,
    } = outcome
    else {
        panic!("expected the safety valve, got {outcome:?}");
    };
    assert_eq!(ad_duration, 32.0);
    assert!(ad_duration > total_duration * 0.5);
    assert_eq!(filter(&input), input);
}

#[test]
fn groups_partition_the_segments() {
    for input in [scte35_playlist(), foreign_host_playlist(), long_intro_playlist()] {
        let report = AdFilterPipeline::default().analyze(&input, BASE);
        let grouped: usize = report.groups.iter().map(|g| g.segment_count).sum();
        assert_eq!(grouped, report.segment_count);

        let mut expected_first = 0;
        for group in &report.groups {
            assert_eq!(group.first_segment, expected_first);
            assert!(group.segment_count > 0);
            expected_first += group.segment_count;
        }
    }
}

#[test]
fn filtering_is_idempotent() {
    for input in [scte35_playlist(), foreign_host_playlist(), long_intro_playlist()] {
        let once = filter(&input);
        let twice = filter(&once);
        assert_eq!(once, twice);
    }
}

#[test]
fn rebuilt_output_parses_with_no_more_duration() {
    for input in [scte35_playlist(), foreign_host_playlist(), long_intro_playlist()] {
        let output = filter(&input);
        let before = parse_media_playlist(&input, BASE);
        let after = parse_media_playlist(&output, BASE);
        assert!(!after.segments.is_empty());
        assert!(after.total_duration() <= before.total_duration());
        assert!(!output.contains("#EXT-X-DISCONTINUITY\n#EXT-X-DISCONTINUITY\n"));
    }
}
