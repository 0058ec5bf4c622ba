use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tokio::net::lookup_host;
use url::Url;

#[derive(Debug, Clone)]
pub enum UrlCheck {
    Safe { parsed_url: String, resolved_ip: String },
    Unsafe { reason: String },
}

impl UrlCheck {
    pub fn is_safe(&self) -> bool {
        matches!(self, UrlCheck::Safe { .. })
    }
}

/// `validateUrl` (§4.1). DNS resolves before the blocklist check so a
/// hostname whose first answer lands in a private range is rejected just
/// like an IP literal would be.
pub async fn validate_url(raw_url: &str) -> UrlCheck {
    let parsed = match Url::parse(raw_url) {
        Ok(u) => u,
        Err(e) => {
            return UrlCheck::Unsafe {
                reason: format!("malformed URL: {e}"),
            }
        }
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return UrlCheck::Unsafe {
            reason: format!("protocol '{}' is not allowed", parsed.scheme()),
        };
    }

    let host = match parsed.host_str() {
        Some(h) => h,
        None => {
            return UrlCheck::Unsafe {
                reason: "URL has no host".to_string(),
            }
        }
    };

    if let Ok(ip) = host.parse::<IpAddr>() {
        return if is_blocked_ip(ip) {
            UrlCheck::Unsafe {
                reason: format!("'{ip}' is in a blocked private/loopback/link-local range"),
            }
        } else {
            UrlCheck::Safe {
                parsed_url: parsed.to_string(),
                resolved_ip: ip.to_string(),
            }
        };
    }

    let port = parsed.port_or_known_default().unwrap_or(80);
    let lookup_target = format!("{host}:{port}");
    let resolved = match lookup_host(lookup_target).await {
        Ok(mut addrs) => addrs.next(),
        Err(e) => {
            return UrlCheck::Unsafe {
                reason: format!("DNS resolution failed: {e}"),
            }
        }
    };

    match resolved {
        Some(addr) => {
            let ip = addr.ip();
            if is_blocked_ip(ip) {
                UrlCheck::Unsafe {
                    reason: format!("'{host}' resolves to '{ip}', a blocked private/loopback/link-local range"),
                }
            } else {
                UrlCheck::Safe {
                    parsed_url: parsed.to_string(),
                    resolved_ip: ip.to_string(),
                }
            }
        }
        None => UrlCheck::Unsafe {
            reason: format!("DNS resolution for '{host}' returned no addresses"),
        },
    }
}

/// Blocklist covering both address families, built once from a fixed list of
/// ranges: loopback, RFC1918, link-local, unique-local, and null/unspecified.
/// IPv4-mapped IPv6 addresses (`::ffff:0:0/96`) are unwrapped and checked
/// against the IPv4 rules, matching the declared boundary behavior.
fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_blocked_v4(mapped);
            }
            is_blocked_v6(v6)
        }
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified() || ip.is_broadcast()
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    // Unique local (fc00::/7)
    let first_byte = ip.segments()[0] >> 8;
    if (0xfc..=0xfd).contains(&first_byte) {
        return true;
    }
    // Link-local unicast (fe80::/10)
    let seg0 = ip.segments()[0];
    if seg0 & 0xffc0 == 0xfe80 {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_ipv4_private_ranges() {
        assert!(is_blocked_v4("10.0.0.5".parse().unwrap()));
        assert!(is_blocked_v4("192.168.1.1".parse().unwrap()));
        assert!(is_blocked_v4("127.0.0.1".parse().unwrap()));
        assert!(is_blocked_v4("169.254.1.1".parse().unwrap()));
    }

    #[test]
    fn allows_public_v4() {
        assert!(!is_blocked_v4("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn blocks_ipv6_unique_local_and_link_local() {
        assert!(is_blocked_v6("fc00::1".parse().unwrap()));
        assert!(is_blocked_v6("fe80::1".parse().unwrap()));
        assert!(is_blocked_v6("::1".parse().unwrap()));
    }

    #[test]
    fn ipv4_mapped_ipv6_boundary_is_consistent_with_v4_rules() {
        let mapped: Ipv6Addr = "::ffff:10.0.0.5".parse().unwrap();
        assert!(is_blocked_ip(IpAddr::V6(mapped)));
        let mapped_public: Ipv6Addr = "::ffff:8.8.8.8".parse().unwrap();
        assert!(!is_blocked_ip(IpAddr::V6(mapped_public)));
    }

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        let r = validate_url("ftp://example.com/file").await;
        assert!(!r.is_safe());
    }

    #[tokio::test]
    async fn rejects_ip_literal_in_private_range() {
        let r = validate_url("http://192.168.1.1/").await;
        assert!(!r.is_safe());
    }
}
