//! RFC 6454 origin extraction, used to scope VAPID's `aud` claim and the
//! token cache key to a subscriber's push-service origin.

use http::Uri;

/// Computes the RFC 6454 origin string for an endpoint URL. Only `http` and
/// `https` schemes are recognized; anything else is the literal `"null"`.
pub fn origin(endpoint: &Uri) -> String {
    let scheme = match endpoint.scheme_str() {
        Some(s) => s,
        None => return "null".to_string(),
    };

    if scheme != "http" && scheme != "https" {
        return "null".to_string();
    }

    let Some(host) = endpoint.host() else {
        return "null".to_string();
    };

    let default_port = if scheme == "https" { 443 } else { 80 };

    match endpoint.port_u16() {
        Some(port) if port != default_port => format!("{scheme}://{host}:{port}"),
        _ => format!("{scheme}://{host}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_default_https_port() {
        let uri: Uri = "https://host:443/wpush/v1/abc".parse().unwrap();
        assert_eq!(origin(&uri), "https://host");
    }

    #[test]
    fn strips_default_http_port() {
        let uri: Uri = "http://host:80/wpush/v1/abc".parse().unwrap();
        assert_eq!(origin(&uri), "http://host");
    }

    #[test]
    fn keeps_non_default_port() {
        let uri: Uri = "https://host:8443/abc".parse().unwrap();
        assert_eq!(origin(&uri), "https://host:8443");
    }

    #[test]
    fn non_http_scheme_is_null() {
        let uri: Uri = "ftp://host/abc".parse().unwrap();
        assert_eq!(origin(&uri), "null");
    }

    #[test]
    fn implicit_default_port_is_stripped() {
        let uri: Uri = "https://push.example.net/abc".parse().unwrap();
        assert_eq!(origin(&uri), "https://push.example.net");
    }
}
