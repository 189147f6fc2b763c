//! Path normalization for mirrored routes.
//!
//! Every component keys its tables by the normalized form produced here.
//! The legacy site's own capture tooling was inconsistent about percent
//! encoding, so lookups against user-supplied or scraped paths must try
//! all `variants` of a path and prefer the first exact match.

use std::borrow::Cow;

/// Canonicalize a raw request or source path.
///
/// Rules: empty input becomes `/`; a leading `/` is prepended if absent;
/// the query string (everything from the first `?`) is preserved verbatim;
/// trailing slashes are stripped from the path portion except for the root.
/// Idempotent: `normalize(normalize(p)) == normalize(p)`.
pub fn normalize(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "/".to_string();
    }

    let prefixed: Cow<'_, str> = if raw.starts_with('/') {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(format!("/{raw}"))
    };

    let (path, query) = match prefixed.find('?') {
        Some(idx) => (&prefixed[..idx], Some(&prefixed[idx..])),
        None => (prefixed.as_ref(), None),
    };

    let mut path = path.trim_end_matches('/').to_string();
    if path.is_empty() {
        path.push('/');
    }

    match query {
        Some(q) => format!("{path}{q}"),
        None => path,
    }
}

/// Enumerate encoding variants of a path for lookup robustness.
///
/// Produces the normalized input plus its percent-decoded and re-encoded
/// forms (query preserved on each), deduplicated in order. Falls back to
/// the original when decoding fails.
pub fn variants(path: &str) -> Vec<String> {
    let normalized = normalize(path);
    let (pathname, query) = split_query(&normalized);

    let mut out = vec![normalized.clone()];

    let decoded = match urlencoding::decode(pathname) {
        Ok(d) => d.into_owned(),
        Err(_) => pathname.to_string(),
    };
    push_unique(&mut out, rejoin(&decoded, query));
    push_unique(&mut out, rejoin(&encode_pathname(&decoded), query));

    out
}

/// Case- and decoding-insensitive grouping key used for alias detection.
pub fn fold_key(path: &str) -> String {
    let normalized = normalize(path);
    let (pathname, query) = split_query(&normalized);
    let decoded = match urlencoding::decode(pathname) {
        Ok(d) => d.into_owned(),
        Err(_) => pathname.to_string(),
    };
    rejoin(&decoded.to_lowercase(), query)
}

/// Filesystem-safe slug for a path, used in document file names.
///
/// `/kosher-posts/Tags/Bakery` becomes `kosher-posts-tags-bakery`;
/// the root path maps to `index`.
pub fn slug(path: &str) -> String {
    let normalized = normalize(path);
    let (pathname, _) = split_query(&normalized);
    let decoded = match urlencoding::decode(pathname) {
        Ok(d) => d.into_owned(),
        Err(_) => pathname.to_string(),
    };

    let mut out = String::new();
    let mut last_dash = true;
    for ch in decoded.trim_matches('/').to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let out = out.trim_matches('-').to_string();
    if out.is_empty() {
        "index".to_string()
    } else {
        out
    }
}

/// Sanitize a filename for use inside a blob key.
///
/// Keeps alphanumerics plus `.`, `-` and `_`; everything else collapses to
/// a single dash. Bounded length so keys stay usable as object names.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::new();
    let mut last_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || ch == '-' {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        return "file".to_string();
    }
    trimmed.chars().take(80).collect()
}

/// Lowercased file extension of a path, query ignored.
///
/// Returns `None` for extension-less paths and for implausibly long
/// "extensions" (dots inside ordinary route segments).
pub fn file_extension(path: &str) -> Option<String> {
    let (pathname, _) = split_query(path);
    let last_segment = pathname.rsplit('/').next()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Split a normalized path into pathname and optional `?`-prefixed query.
pub fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.find('?') {
        Some(idx) => (&path[..idx], Some(&path[idx..])),
        None => (path, None),
    }
}

fn rejoin(pathname: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{pathname}{q}"),
        None => pathname.to_string(),
    }
}

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !out.contains(&candidate) {
        out.push(candidate);
    }
}

/// Percent-encode a decoded pathname the way `encodeURI` would: multi-byte
/// and unsafe characters are escaped, URI structure characters are kept.
fn encode_pathname(pathname: &str) -> String {
    const KEEP: &[u8] = b"-_.!~*'();/?:@&=+$,#";
    let mut out = String::with_capacity(pathname.len());
    for &byte in pathname.as_bytes() {
        if byte.is_ascii_alphanumeric() || KEEP.contains(&byte) || byte == b'%' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
