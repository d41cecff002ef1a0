use percent_encoding::percent_decode_str;
use std::borrow::Cow;

/// One non-empty segment of a request path: its percent-decoded value and its byte span in the raw path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathSegment<'p> {
    pub(crate) value: Cow<'p, str>,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

/// Percent-decodes `raw`, replacing invalid UTF-8.
pub(crate) fn decode(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}

/// Iterates over the non-empty segments of a request path, so `/users//42/` yields `users` and `42`.
pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = PathSegment<'_>> {
    let mut start = 0;
    path.split('/').filter_map(move |raw| {
        let seg_start = start;
        start += raw.len() + 1;
        if raw.is_empty() {
            None
        } else {
            Some(PathSegment {
                value: decode(raw),
                start: seg_start,
                end: seg_start + raw.len(),
            })
        }
    })
}

/// Splits a request path into percent-decoded segments. Empty segments are skipped.
pub(crate) fn decoded_segments(path: &str) -> Vec<PathSegment<'_>> {
    path_segments(path).collect()
}

/// Splits a route pattern or prefix into raw segments.
pub(crate) fn pattern_segments(pattern: &str) -> impl Iterator<Item = &str> {
    pattern.split('/').filter(|seg| !seg.is_empty())
}

/// Normalizes a group prefix to `""` (root) or `/seg/seg` without a trailing slash.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let mut normalized = String::with_capacity(prefix.len() + 1);
    for seg in pattern_segments(prefix) {
        normalized.push('/');
        normalized.push_str(seg);
    }
    normalized
}

/// Returns the raw part of `path` below `prefix` if `prefix` matches whole leading segments of `path`.
///
/// `prefix` must already be normalized. Path segments are percent-decoded and empty segments skipped before
/// they are compared, the same way route lookup treats them. `/api` matches `/api`, `/api/`, `/a%70i/users`
/// and `/api/users` but not `/apis`.
pub(crate) fn strip_group_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    if prefix.is_empty() {
        return Some(path);
    }

    let mut segments = path_segments(path);
    let mut end = 0;
    for expected in pattern_segments(prefix) {
        let seg = segments.next()?;
        if seg.value != expected {
            return None;
        }
        end = seg.end;
    }

    let rest = &path[end..];
    if rest.is_empty() {
        Some("/")
    } else {
        Some(rest)
    }
}
