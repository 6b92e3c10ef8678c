//! Compact run-length encoding for sets of version numbers.
//!
//! Snapshot file names carry the versions they were taken for, so the set is
//! rendered as ascending segments joined with `_`, where every run of two or
//! more consecutive numbers collapses to `first-last`:
//!
//! ```
//! use version_pruner::range::encode_versions;
//!
//! assert_eq!(encode_versions(&[1, 2, 3, 4, 5, 7, 8, 9, 13]), "1-5_7-9_13");
//! ```

use std::collections::BTreeSet;

use thiserror::Error;

const SEGMENT_SEPARATOR: char = '_';
const RUN_SEPARATOR: char = '-';

/// Encode a set of version numbers.
///
/// Input order is not trusted and duplicates are ignored. An empty input
/// produces an empty string.
pub fn encode_versions(versions: &[u32]) -> String {
    let ordered: BTreeSet<u32> = versions.iter().copied().collect();
    let mut segments: Vec<String> = Vec::new();
    let mut iter = ordered.into_iter();

    let Some(first) = iter.next() else {
        return String::new();
    };

    let mut start = first;
    let mut end = first;
    for current in iter {
        if current == end + 1 {
            end = current;
            continue;
        }
        segments.push(render_segment(start, end));
        start = current;
        end = current;
    }
    segments.push(render_segment(start, end));

    segments.join(&SEGMENT_SEPARATOR.to_string())
}

fn render_segment(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}{RUN_SEPARATOR}{end}")
    }
}

/// Errors produced when decoding a range string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeParseError {
    #[error("Invalid number in segment '{0}'")]
    InvalidNumber(String),

    #[error("Descending run in segment '{0}'")]
    DescendingRun(String),

    #[error("Range expands to more than {} versions", MAX_DECODED_VERSIONS)]
    TooManyVersions,
}

/// Upper bound on the number of versions [`decode_versions`] will expand.
pub const MAX_DECODED_VERSIONS: usize = 100_000;

/// Decode a string produced by [`encode_versions`] back into ascending
/// version numbers.
pub fn decode_versions(encoded: &str) -> Result<Vec<u32>, RangeParseError> {
    let mut versions = BTreeSet::new();
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    for segment in encoded.split(SEGMENT_SEPARATOR) {
        let parse = |s: &str| {
            s.parse::<u32>()
                .map_err(|_| RangeParseError::InvalidNumber(segment.to_string()))
        };

        match segment.split_once(RUN_SEPARATOR) {
            Some((first, last)) => {
                let (first, last) = (parse(first)?, parse(last)?);
                if last < first {
                    return Err(RangeParseError::DescendingRun(segment.to_string()));
                }
                let run = ((last - first) as usize).saturating_add(1);
                if versions.len().saturating_add(run) > MAX_DECODED_VERSIONS {
                    return Err(RangeParseError::TooManyVersions);
                }
                versions.extend(first..=last);
            }
            None => {
                if versions.len() >= MAX_DECODED_VERSIONS {
                    return Err(RangeParseError::TooManyVersions);
                }
                versions.insert(parse(segment)?);
            }
        }
    }

    Ok(versions.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::mixed(&[1, 2, 3, 4, 5, 7, 8, 9, 13], "1-5_7-9_13")]
    #[case::single(&[5], "5")]
    #[case::pair(&[1, 2], "1-2")]
    #[case::gaps(&[1, 3, 5], "1_3_5")]
    #[case::trailing_run(&[2, 9, 10, 11], "2_9-11")]
    #[case::empty(&[], "")]
    fn test_encode_versions(#[case] input: &[u32], #[case] expected: &str) {
        assert_eq!(encode_versions(input), expected);
    }

    #[test]
    fn test_encode_sorts_and_dedups_input() {
        assert_eq!(encode_versions(&[13, 3, 1, 2, 2, 9, 8, 7]), "1-3_7-9_13");
    }

    #[test]
    fn test_decode_reproduces_encoded_sets() {
        let sets: [&[u32]; 5] = [
            &[1, 2, 3, 4, 5, 7, 8, 9, 13],
            &[5],
            &[1, 2],
            &[1, 3, 5],
            &[4, 5, 6, 100, 101, 250],
        ];
        for set in sets {
            let encoded = encode_versions(set);
            assert_eq!(decode_versions(&encoded).unwrap(), set.to_vec(), "{encoded}");
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(
            decode_versions("1-x"),
            Err(RangeParseError::InvalidNumber("1-x".to_string()))
        );
        assert_eq!(
            decode_versions("9-3"),
            Err(RangeParseError::DescendingRun("9-3".to_string()))
        );
    }

    #[test]
    fn test_decode_caps_expansion() {
        assert_eq!(
            decode_versions("1-4294967295"),
            Err(RangeParseError::TooManyVersions)
        );
        assert_eq!(
            decode_versions("1-60000_100000-160000"),
            Err(RangeParseError::TooManyVersions)
        );

        let at_limit = format!("1-{}", MAX_DECODED_VERSIONS);
        assert_eq!(decode_versions(&at_limit).unwrap().len(), MAX_DECODED_VERSIONS);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_versions("").unwrap().is_empty());
    }
}
