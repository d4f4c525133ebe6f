use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

// Key used when a request carries nothing that identifies the client
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derives the per-client rate limit key for a request.
///
/// Forwarding headers are only honoured when the gateway sits behind a
/// trusted proxy; otherwise any client could pick its own key.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(headers) {
            return ip.to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // only the last hop was written by the trusted proxy, earlier ones
    // come from the client and can be anything
    let from_xff = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.rsplit(',').next())
        .and_then(|last| last.trim().parse().ok());

    from_xff.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:51234".parse().unwrap())
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn uses_peer_ip_without_port() {
        assert_eq!(client_key(&HeaderMap::new(), peer(), false), "10.0.0.7");
    }

    #[test]
    fn ignores_forwarding_headers_unless_trusted() {
        let h = headers(&[("x-forwarded-for", "203.0.113.9")]);
        assert_eq!(client_key(&h, peer(), false), "10.0.0.7");
        assert_eq!(client_key(&h, peer(), true), "203.0.113.9");
    }

    #[test]
    fn takes_hop_appended_by_the_proxy() {
        let h = headers(&[("x-forwarded-for", " 198.51.100.1 , 10.1.1.1 ")]);
        assert_eq!(client_key(&h, peer(), true), "10.1.1.1");
    }

    #[test]
    fn client_supplied_hops_do_not_change_the_key() {
        let keys: Vec<String> = ["1.1.1.1, 198.51.100.7", "2.2.2.2, 198.51.100.7", "3.3.3.3, 198.51.100.7"]
            .into_iter()
            .map(|xff| {
                let mut h = HeaderMap::new();
                h.insert("x-forwarded-for", HeaderValue::from_static(xff));
                client_key(&h, peer(), true)
            })
            .collect();
        assert_eq!(keys, ["198.51.100.7"; 3]);
    }

    #[test]
    fn falls_back_to_real_ip_then_peer() {
        let h = headers(&[("x-forwarded-for", "garbage"), ("x-real-ip", "2001:db8::1")]);
        assert_eq!(client_key(&h, peer(), true), "2001:db8::1");

        let h = headers(&[("x-real-ip", "not-an-ip")]);
        assert_eq!(client_key(&h, peer(), true), "10.0.0.7");
    }

    #[test]
    fn unknown_when_nothing_identifies_the_client() {
        assert_eq!(client_key(&HeaderMap::new(), None, true), UNKNOWN_CLIENT);
    }
}
