//! SiteId canonicalization: URL/host → registrable-domain (eTLD+1) in punycode (§4.2).
//!
//! Strategy implemented here is the PSL path (see DESIGN.md / SPEC_FULL.md §4
//! "Open Questions"); it falls back to the last-two-labels heuristic only if
//! the PSL lookup itself fails to parse the input as a domain at all.

use psl::{Psl, List};

fn extract_host(input: &str) -> &str {
    let trimmed = input.trim();
    if let Some(idx) = trimmed.find("://") {
        let rest = &trimmed[idx + 3..];
        let end = rest
            .find(['/', '?', '#'])
            .unwrap_or(rest.len());
        let authority = &rest[..end];
        // Strip userinfo and port if present.
        let host_port = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
        host_port.split(':').next().unwrap_or(host_port)
    } else {
        trimmed
    }
}

fn to_punycode(host: &str) -> String {
    match idna::domain_to_ascii(host) {
        Ok(ascii) => ascii.to_lowercase(),
        Err(_) => host.to_lowercase(),
    }
}

fn two_label_fallback(host: &str) -> String {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2..].join(".").to_lowercase()
    } else {
        host.to_lowercase()
    }
}

/// Reduce a host or URL to its stable `site_id`: lowercase punycode eTLD+1.
pub fn normalize_site_id(input: &str) -> String {
    let host = extract_host(input).to_lowercase();
    let ascii_host = to_punycode(&host);
    let trimmed = ascii_host.trim_matches('.');
    if trimmed.is_empty() {
        return trimmed.to_string();
    }

    let list = List::new();
    let registrable = match list.domain(trimmed.as_bytes()) {
        Some(domain) => String::from_utf8_lossy(domain.as_bytes()).into_owned(),
        None => two_label_fallback(trimmed),
    };
    registrable.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_port_and_path() {
        assert_eq!(
            normalize_site_id("https://Login.Example.com:443/path"),
            "example.com"
        );
    }

    #[test]
    fn lowercases_bare_host() {
        assert_eq!(normalize_site_id("A.Example.COM"), "example.com");
    }

    #[test]
    fn idempotent() {
        let once = normalize_site_id("https://a.example.com/x");
        let twice = normalize_site_id(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn idn_host_becomes_punycode() {
        assert_eq!(normalize_site_id("müller.de"), "xn--mller-kva.de");
    }
}
