//! HTTP to HTTPS redirection.
//!
//! Applied as the outermost layer of the plain HTTP listener when an HTTPS
//! listener is also active. Every request short-circuits into a permanent
//! redirect; the wrapped handler is never reached over plain HTTP.

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Redirect;
use axum::Router;
use axum_extra::extract::Host;
use http::Uri;

/// Wrap `handler` so that all plain-HTTP traffic is redirected to the HTTPS
/// listener on `https_port`.
pub fn wrap(handler: Router, https_port: u16) -> Router {
    handler.layer(middleware::from_fn(
        move |Host(host): Host, req: Request, _next: Next| async move {
            let location = https_location(&host, req.uri(), https_port);
            tracing::debug!(from = %req.uri(), to = %location, "Redirecting HTTP to HTTPS");
            Redirect::permanent(&location)
        },
    ))
}

/// Build the HTTPS URL for a redirect, stripping any port from the incoming
/// Host header and eliding the default HTTPS port.
fn https_location(host: &str, uri: &Uri, https_port: u16) -> String {
    let host = host.split(':').next().unwrap_or(host);
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    if https_port == 443 {
        format!("https://{}{}", host, path)
    } else {
        format!("https://{}:{}{}", host, https_port, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_location_strips_host_port() {
        let uri: Uri = "/path".parse().unwrap();
        assert_eq!(
            https_location("example.com:8080", &uri, 8443),
            "https://example.com:8443/path"
        );
    }

    #[test]
    fn test_https_location_elides_default_port() {
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(https_location("example.com", &uri, 443), "https://example.com/");
    }

    #[test]
    fn test_https_location_preserves_query() {
        let uri: Uri = "/search?q=rust&page=2".parse().unwrap();
        assert_eq!(
            https_location("example.com", &uri, 8443),
            "https://example.com:8443/search?q=rust&page=2"
        );
    }
}
