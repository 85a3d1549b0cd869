//! Connection URLs derived from resource metadata.

use crate::types::Metadata;

/// HTTP and HTTPS URLs for a component. Empty until the resource is healthy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub http: String,
    pub https: String,
}

/// Build `http://host:port` / `https://host:port` from a hostname and ports.
///
/// A missing hostname or port yields an empty URL instead of an error.
pub fn derive(hostname: &str, http_port: Option<u16>, https_port: Option<u16>) -> Endpoints {
    if hostname.is_empty() {
        return Endpoints::default();
    }

    Endpoints {
        http: http_port
            .map(|port| format!("http://{hostname}:{port}"))
            .unwrap_or_default(),
        https: https_port
            .map(|port| format!("https://{hostname}:{port}"))
            .unwrap_or_default(),
    }
}

/// Endpoints for optional metadata; absent metadata means "not known yet".
pub fn from_metadata(metadata: Option<&Metadata>) -> Endpoints {
    match metadata {
        Some(meta) => {
            let ports = meta.ports.unwrap_or_default();
            derive(&meta.endpoint, ports.http, ports.https)
        }
        None => Endpoints::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ports;

    #[test]
    fn test_derive_both_ports() {
        let endpoints = derive("h.cloud.example", Some(9200), Some(9243));
        assert_eq!(endpoints.http, "http://h.cloud.example:9200");
        assert_eq!(endpoints.https, "https://h.cloud.example:9243");
    }

    #[test]
    fn test_derive_missing_port() {
        let endpoints = derive("h.cloud.example", None, Some(443));
        assert!(endpoints.http.is_empty());
        assert_eq!(endpoints.https, "https://h.cloud.example:443");
    }

    #[test]
    fn test_derive_empty_hostname() {
        assert_eq!(derive("", Some(9200), Some(9243)), Endpoints::default());
    }

    #[test]
    fn test_from_metadata_absent() {
        assert_eq!(from_metadata(None), Endpoints::default());
    }

    #[test]
    fn test_from_metadata_without_ports() {
        let meta = Metadata {
            endpoint: "h.cloud.example".to_string(),
            ports: None,
        };
        assert_eq!(from_metadata(Some(&meta)), Endpoints::default());

        let meta = Metadata {
            endpoint: "h.cloud.example".to_string(),
            ports: Some(Ports {
                http: Some(80),
                https: None,
            }),
        };
        assert_eq!(from_metadata(Some(&meta)).http, "http://h.cloud.example:80");
    }
}
