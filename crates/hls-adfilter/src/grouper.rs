use crate::parser::Segment;

/// A contiguous run of segments between discontinuity boundaries.
#[derive(Debug, Clone, Copy)]
pub struct SegmentGroup<'a> {
    segments: &'a [Segment],
}

impl<'a> SegmentGroup<'a> {
    pub fn segments(&self) -> &'a [Segment] {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&'a Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&'a Segment> {
        self.segments.last()
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn durations(&self) -> impl Iterator<Item = f64> + 'a {
        self.segments.iter().map(|s| s.duration)
    }
}

/// Split `segments` at every discontinuity that is not at the start of the current group.
///
/// The groups borrow consecutive, non-overlapping slices of `segments`, so they always
/// cover the input exactly and in order. Empty groups are never produced.
pub fn group_by_discontinuity(segments: &[Segment]) -> Vec<SegmentGroup<'_>> {
    let mut groups = Vec::new();
    let mut start = 0;

    for (i, segment) in segments.iter().enumerate() {
        if segment.discontinuity && i > start {
            groups.push(SegmentGroup {
                segments: &segments[start..i],
            });
            start = i;
        }
    }
    if start < segments.len() {
        groups.push(SegmentGroup {
            segments: &segments[start..],
        });
    }

    groups
}
