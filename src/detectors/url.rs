//! Canonical URL reconstruction.
//!
//! Crawlers following the AJAX crawling scheme rewrite
//! `http://host/path?a=1#!/hash?b=2` into
//! `http://host/path?a=1&_escaped_fragment_=%2Fhash%3Fb%3D2` before sending
//! the request. The functions here undo that rewrite so the snapshot service
//! renders the page a browser would see, and so route patterns are matched
//! against human-readable text.

use crate::error::{PrerenderError, Result};
use crate::request::InboundRequest;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Query parameter carrying the rewritten hash fragment.
pub const ESCAPED_FRAGMENT: &str = "_escaped_fragment_";

/// Characters left untouched when encoding a URI component.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Query string and hash fragment recovered from an escaped-fragment request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalUrlParts {
    /// `?key=value&...`, or empty when no other parameters remain
    pub query_string: String,
    /// `#!...`, or empty when the escaped fragment was empty
    pub hash_fragment: String,
}

/// Whether the raw target uses the escaped-fragment form.
pub fn has_escaped_fragment(target: &str) -> bool {
    target.contains(ESCAPED_FRAGMENT)
}

/// Reverse the escaped-fragment rewrite on a raw query string.
///
/// Remaining parameters keep their order. With `encode` they are
/// percent-encoded for the outbound URL; without it they are left readable.
/// The fragment is never re-encoded.
pub fn escaped_fragment_parts(query: Option<&str>, encode: bool) -> CanonicalUrlParts {
    let mut fragment: Option<String> = None;
    let mut params = Vec::new();

    for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        if key == ESCAPED_FRAGMENT {
            fragment.get_or_insert_with(|| value.into_owned());
            continue;
        }

        if encode {
            params.push(format!("{}={}", encode_component(&key), encode_component(&value)));
        } else {
            params.push(format!("{key}={value}"));
        }
    }

    let query_string = if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    };

    let hash_fragment = match fragment {
        Some(hash) if !hash.is_empty() => format!("#!{hash}"),
        _ => String::new(),
    };

    CanonicalUrlParts {
        query_string,
        hash_fragment,
    }
}

/// Path used for route and extension matching.
pub fn decoded_path(request: &InboundRequest) -> Result<String> {
    if has_escaped_fragment(&request.target) {
        let parts = escaped_fragment_parts(request.raw_query(), false);
        let path = decode_component(request.raw_path())?;
        Ok(format!("{path}{}{}", parts.query_string, parts.hash_fragment))
    } else {
        decode_component(&request.target)
    }
}

/// Absolute URL handed to the snapshot service.
pub fn encoded_url(request: &InboundRequest, trusted_proxy: bool) -> String {
    let protocol = protocol(request, trusted_proxy);
    let host = host(request, trusted_proxy);

    if has_escaped_fragment(&request.target) {
        let parts = escaped_fragment_parts(request.raw_query(), true);
        format!(
            "{protocol}://{host}{}{}{}",
            request.raw_path(),
            parts.query_string,
            parts.hash_fragment
        )
    } else {
        format!("{protocol}://{host}{}", request.target)
    }
}

/// `https` for TLS connections, `http` otherwise.
///
/// Behind a trusted proxy the first `X-Forwarded-Proto` value wins.
pub fn protocol(request: &InboundRequest, trusted_proxy: bool) -> String {
    if trusted_proxy {
        if let Some(proto) = first_forwarded(request, "x-forwarded-proto") {
            return proto.to_lowercase();
        }
    }

    if request.encrypted {
        "https".to_string()
    } else {
        "http".to_string()
    }
}

/// `Host` header, or `X-Forwarded-Host` behind a trusted proxy. Empty if neither is present.
pub fn host(request: &InboundRequest, trusted_proxy: bool) -> String {
    if trusted_proxy {
        if let Some(host) = first_forwarded(request, "x-forwarded-host") {
            return host.to_string();
        }
    }

    request.header("host").unwrap_or("").to_string()
}

fn first_forwarded<'a>(request: &'a InboundRequest, header: &str) -> Option<&'a str> {
    request
        .header(header)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Percent-encode a query key or value.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Strictly percent-decode text. Malformed escapes and invalid UTF-8 are errors.
pub fn decode_component(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'%' {
            continue;
        }
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(PrerenderError::Decode(format!(
                "malformed percent escape at byte {i} in `{input}`"
            )));
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| PrerenderError::Decode(format!("invalid UTF-8 in `{input}`: {e}")))
}
