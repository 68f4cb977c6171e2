//! Segment filename heuristics: numeric tokens, shared prefixes and edit distance.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static DIGIT_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());
static TS_SUFFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+\.ts.*$").unwrap());

/// Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rolling rows are enough; filenames are short.
    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut curr = vec![0; a.len() + 1];
    for (j, cb) in b.iter().enumerate() {
        curr[0] = j + 1;
        for (i, ca) in a.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[i + 1] = (curr[i] + 1).min(prev[i + 1] + 1).min(prev[i] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[a.len()]
}

/// The longest run of ASCII digits in `filename`. Ties go to the earliest run.
pub fn longest_digit_run(filename: &str) -> Option<&str> {
    DIGIT_RUN_REGEX
        .find_iter(filename)
        .map(|m| m.as_str())
        .reduce(|best, run| if best.len() >= run.len() { best } else { run })
}

/// Numeric value of [`longest_digit_run`]. Runs too long to represent are ignored.
pub fn sequence_number(filename: &str) -> Option<i128> {
    longest_digit_run(filename).and_then(|run| run.parse().ok())
}

/// Filename with the trailing `<digits>.ts...` part stripped, e.g. `seg_00012.ts` → `seg_`.
///
/// Names that do not follow the `.ts` convention are returned unchanged.
pub fn filename_prefix(filename: &str) -> &str {
    match TS_SUFFIX_REGEX.find(filename) {
        Some(m) => &filename[..m.start()],
        None => filename,
    }
}

/// The prefix shared by most filenames in a playlist.
///
/// `None` with fewer than two names, or when the winner is empty (purely numeric names
/// such as `00001.ts` carry no pattern). Ties are resolved in favor of the prefix that
/// appears first.
pub fn dominant_prefix<'a, I>(filenames: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut total = 0;
    for (order, name) in filenames.into_iter().enumerate() {
        let entry = counts.entry(filename_prefix(name)).or_insert((0, order));
        entry.0 += 1;
        total += 1;
    }
    if total < 2 {
        return None;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(prefix, _)| prefix)
        .filter(|prefix| !prefix.is_empty())
}
