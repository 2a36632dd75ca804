// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RFC 3986 URI parsing and normalization
//!
//! A [`Uri`] is parsed once and stored normalized: the scheme is lowercased,
//! dot segments are resolved, non-ASCII input is percent-encoded as UTF-8
//! octets for the wire form, and percent sequences that do not encode
//! reserved characters are decoded back for the display form. Cloning is
//! cheap (copy-on-write); `dir_up` is the only mutator.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

const UNRESERVED: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_.~";
const RESERVED: &str = "!*'();:@&=+$,/?%#[]";
const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[derive(Clone, Debug, Default, PartialEq)]
struct UriData {
    full: String,
    scheme: String,
    username: String,
    password: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
    has_authority: bool,
    valid: bool,
}

/// A URI as defined by RFC 3986.
#[derive(Clone, Debug, Default)]
pub struct Uri {
    data: Arc<UriData>,
}

impl Uri {
    /// Parse `input` into a normalized URI. Parsing never fails outright;
    /// malformed input yields a URI with `is_valid() == false` that keeps
    /// the raw text.
    pub fn parse(input: &str) -> Uri {
        Uri { data: Arc::new(parse_uri(input)) }
    }

    /// Build a URI from a directory part and a file name, inserting the
    /// separator only when needed.
    pub fn with_filename(path: &str, filename: &str) -> Uri {
        if path.is_empty() {
            Uri::parse(filename)
        } else if filename.is_empty() {
            Uri::parse(path)
        } else if path.ends_with('/') {
            Uri::parse(&format!("{path}{filename}"))
        } else {
            Uri::parse(&format!("{path}/{filename}"))
        }
    }

    /// The scheme, lowercased. Empty if none was given.
    pub fn scheme(&self) -> &str {
        &self.data.scheme
    }

    pub fn username(&self) -> &str {
        &self.data.username
    }

    pub fn password(&self) -> &str {
        &self.data.password
    }

    /// The userinfo component (`user` or `user:password`).
    pub fn user_info(&self) -> String {
        if self.data.password.is_empty() {
            self.data.username.clone()
        } else {
            format!("{}:{}", self.data.username, self.data.password)
        }
    }

    pub fn host(&self) -> &str {
        &self.data.host
    }

    /// The port, if one was given.
    pub fn port(&self) -> Option<u16> {
        self.data.port
    }

    /// The normalized path. Always begins with `/` when an authority is
    /// present or the input was absolute.
    pub fn path(&self) -> &str {
        &self.data.path
    }

    /// The path component after the last slash; empty for directories.
    pub fn filename(&self) -> &str {
        match self.data.path.rfind('/') {
            Some(pos) if pos + 1 < self.data.path.len() => &self.data.path[pos + 1..],
            _ => "",
        }
    }

    pub fn query(&self) -> &str {
        &self.data.query
    }

    pub fn fragment(&self) -> &str {
        &self.data.fragment
    }

    /// The full normalized URI string.
    pub fn uri(&self) -> &str {
        &self.data.full
    }

    pub fn is_valid(&self) -> bool {
        self.data.valid
    }

    pub fn is_empty(&self) -> bool {
        self.data.full.is_empty()
    }

    /// Whether this URI's path contains `other`'s path as a prefix.
    pub fn contains(&self, other: &Uri) -> bool {
        self.data.path.starts_with(&other.data.path)
    }

    /// Go up one directory (or clear the file name, if one is set).
    /// A no-op on the root path, on empty URIs, and on slash-less
    /// relative references. Any query or fragment is dropped.
    pub fn dir_up(&mut self) -> &mut Uri {
        let path = &self.data.path;
        if path.is_empty() || path == "/" || !path.contains('/') {
            return self;
        }
        let d = Arc::make_mut(&mut self.data);
        if d.path.ends_with('/') {
            d.path.pop();
        }
        if let Some(pos) = d.path.rfind('/') {
            d.path.truncate(pos + 1);
        }
        d.query.clear();
        d.fragment.clear();
        d.full = rebuild_full(d);
        self
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Uri) -> bool {
        Arc::ptr_eq(&self.data, &other.data) || self.data.full == other.data.full
    }
}

impl Eq for Uri {}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data.full)
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Uri {
        Uri::parse(s)
    }
}

impl From<String> for Uri {
    fn from(s: String) -> Uri {
        Uri::parse(&s)
    }
}

impl Serialize for Uri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.data.full)
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Uri, D::Error> {
        let s = String::deserialize(deserializer)?;
        let uri = Uri::parse(&s);
        if s.is_empty() || uri.is_valid() {
            Ok(uri)
        } else {
            Err(D::Error::custom(format!("invalid URI: {s}")))
        }
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Percent-encode everything outside the unreserved and reserved sets,
/// expanding non-ASCII code points to UTF-8 octet sequences. Existing
/// percent sequences survive because `%` itself is reserved.
fn encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii() && (UNRESERVED.contains(c) || RESERVED.contains(c)) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).as_bytes() {
                out.push('%');
                out.push(HEX[(b >> 4) as usize] as char);
                out.push(HEX[(b & 0xf) as usize] as char);
            }
        }
    }
    out
}

/// Decode percent sequences for the display form. Sequences that encode
/// reserved characters are kept escaped so re-parsing the display form
/// cannot change the URI structure.
fn decode_display(input: &str) -> String {
    if !input.contains('%') {
        return input.to_string();
    }
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                let value = hi * 16 + lo;
                if value < 0x80 && RESERVED.contains(value as char) {
                    out.extend_from_slice(&bytes[i..i + 3]);
                } else {
                    out.push(value);
                }
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(out) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// RFC 3986 section 5.2.4.
fn remove_dot_segments(path: &str) -> String {
    let mut input = path.to_string();
    let mut output = String::with_capacity(path.len());
    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest.to_string();
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest.to_string();
        } else if let Some(rest) = input.strip_prefix("/./") {
            input = format!("/{rest}");
        } else if input == "/." {
            input = "/".to_string();
        } else if let Some(rest) = input.strip_prefix("/../") {
            input = format!("/{rest}");
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/".to_string();
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input.clear();
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..].find('/').map(|i| i + start).unwrap_or(input.len());
            output.push_str(&input[..end]);
            input.drain(..end);
        }
    }
    output
}

fn pop_segment(output: &mut String) {
    if let Some(pos) = output.rfind('/') {
        output.truncate(pos);
    } else {
        output.clear();
    }
}

fn split_once_at(s: &str, sep: char) -> (&str, Option<&str>) {
    match s.find(sep) {
        Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
        None => (s, None),
    }
}

fn split_scheme(s: &str) -> (Option<&str>, &str) {
    if let Some(pos) = s.find(':') {
        let candidate = &s[..pos];
        let mut chars = candidate.chars();
        let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic());
        let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if head_ok && tail_ok {
            return (Some(candidate), &s[pos + 1..]);
        }
    }
    (None, s)
}

fn valid_userinfo(s: &str) -> bool {
    s.chars().all(|c| {
        UNRESERVED.contains(c)
            || matches!(c, '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=')
            || matches!(c, ':' | '%')
    })
}

fn valid_host(s: &str) -> bool {
    s.chars().all(|c| {
        UNRESERVED.contains(c)
            || matches!(c, '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=')
            || c == '%'
    })
}

struct Authority {
    username: String,
    password: String,
    host: String,
    port: Option<u16>,
}

fn parse_authority(text: &str) -> Option<Authority> {
    let (userinfo, host_port) = match text.rfind('@') {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => ("", text),
    };
    if !valid_userinfo(userinfo) {
        return None;
    }
    let (username, password) = match split_once_at(userinfo, ':') {
        (user, Some(pass)) => (user, pass),
        (user, None) => (user, ""),
    };
    let (host, port_text) = if let Some(rest) = host_port.strip_prefix('[') {
        let close = rest.find(']')?;
        let after = &rest[close + 1..];
        let port_text = match after {
            "" => None,
            _ => Some(after.strip_prefix(':')?),
        };
        (&rest[..close], port_text)
    } else {
        match host_port.rfind(':') {
            Some(pos) => (&host_port[..pos], Some(&host_port[pos + 1..])),
            None => (host_port, None),
        }
    };
    if !host_port.starts_with('[') && !valid_host(host) {
        return None;
    }
    // Userinfo or a port on an empty host makes no sense
    if host.is_empty() && (!userinfo.is_empty() || port_text.is_some()) {
        return None;
    }
    let port = match port_text {
        Some(text) => Some(text.parse::<u16>().ok()?),
        None => None,
    };
    Some(Authority {
        username: decode_display(username),
        password: decode_display(password),
        host: decode_display(host).to_ascii_lowercase(),
        port,
    })
}

fn parse_uri(raw: &str) -> UriData {
    if raw.is_empty() {
        return UriData::default();
    }
    let invalid = || UriData { full: raw.to_string(), ..UriData::default() };

    let encoded = encode(raw);
    let (before_fragment, fragment) = split_once_at(&encoded, '#');
    let (before_query, query) = split_once_at(before_fragment, '?');
    let (scheme, after_scheme) = split_scheme(before_query);
    let scheme = scheme.map(str::to_ascii_lowercase).unwrap_or_default();

    let mut authority = None;
    let raw_path;
    if let Some(rest) = after_scheme.strip_prefix("//") {
        let end = rest.find('/').unwrap_or(rest.len());
        let auth_text = &rest[..end];
        if auth_text.is_empty() {
            authority = Some(Authority {
                username: String::new(),
                password: String::new(),
                host: String::new(),
                port: None,
            });
        } else {
            match parse_authority(auth_text) {
                Some(auth) => authority = Some(auth),
                None => return invalid(),
            }
        }
        raw_path = &rest[end..];
    } else {
        raw_path = after_scheme;
    }

    // Normalize: resolve dot segments on absolute paths. A path that ends
    // in a bare dot segment loses the trailing slash the resolution leaves
    // behind (except at the root).
    let mut path = if raw_path.starts_with('/') {
        let resolved = remove_dot_segments(raw_path);
        let ended_in_dot_segment = raw_path.ends_with("/.") || raw_path.ends_with("/..");
        if ended_in_dot_segment && resolved.len() > 1 && resolved.ends_with('/') {
            resolved[..resolved.len() - 1].to_string()
        } else {
            resolved
        }
    } else {
        raw_path.to_string()
    };
    if authority.is_some() && path.is_empty() {
        path = "/".to_string();
    }
    let path = decode_display(&path);

    let auth = authority.as_ref();
    let mut data = UriData {
        full: String::new(),
        scheme,
        username: auth.map(|a| a.username.clone()).unwrap_or_default(),
        password: auth.map(|a| a.password.clone()).unwrap_or_default(),
        host: auth.map(|a| a.host.clone()).unwrap_or_default(),
        port: auth.and_then(|a| a.port),
        path,
        query: query.unwrap_or_default().to_string(),
        fragment: fragment.unwrap_or_default().to_string(),
        has_authority: authority.is_some(),
        valid: true,
    };
    data.full = rebuild_full(&data);
    data
}

/// Reassemble the normalized display string.
fn rebuild_full(d: &UriData) -> String {
    let mut full = String::new();
    if !d.scheme.is_empty() {
        full.push_str(&d.scheme);
        full.push(':');
    }
    if !d.has_authority {
        full.push_str(&d.path);
        if !d.query.is_empty() {
            full.push('?');
            full.push_str(&d.query);
        }
        if !d.fragment.is_empty() {
            full.push('#');
            full.push_str(&d.fragment);
        }
        return full;
    }
    full.push_str("//");
    if !d.username.is_empty() {
        full.push_str(&d.username);
        if !d.password.is_empty() {
            full.push(':');
            full.push_str(&d.password);
        }
        full.push('@');
    }
    full.push_str(&d.host);
    if let Some(port) = d.port {
        full.push(':');
        full.push_str(&port.to_string());
    }
    full.push_str(&d.path);
    if !d.query.is_empty() {
        full.push('?');
        full.push_str(&d.query);
    }
    if !d.fragment.is_empty() {
        full.push('#');
        full.push_str(&d.fragment);
    }
    full
}

#[cfg(test)]
#[path = "uri_tests.rs"]
mod tests;
