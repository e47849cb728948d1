use http::header::{AUTHORIZATION, COOKIE, HOST, PROXY_AUTHORIZATION};
use http::{HeaderMap, HeaderName};

/// Headers that carry credentials and never leave the original host.
pub const SENSITIVE_HEADERS: [HeaderName; 3] = [AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION];

/// Remove every `Content-*` header; used when the body is not resent.
pub fn remove_body_headers(headers: &mut HeaderMap) {
    let names: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with("content-"))
        .cloned()
        .collect();
    for name in names {
        headers.remove(name);
    }
}

/// Remove the `Host` header, returning its value.
pub fn remove_host_header(headers: &mut HeaderMap) -> Option<String> {
    headers
        .remove(HOST)
        .and_then(|value| value.to_str().ok().map(str::to_owned))
}

/// Remove authorization, cookie and proxy-authorization headers.
pub fn drop_sensitive_headers(headers: &mut HeaderMap) {
    for name in SENSITIVE_HEADERS.iter() {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_remove_body_headers() {
        let mut map = headers(&[
            ("content-type", "application/json"),
            ("content-length", "12"),
            ("content-encoding", "gzip"),
            ("x-keep", "1"),
            ("accept", "*/*"),
        ]);
        remove_body_headers(&mut map);
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("x-keep"));
        assert!(map.contains_key("accept"));
    }

    #[test]
    fn test_remove_host_header() {
        let mut map = headers(&[("host", "localhost:3600"), ("x-keep", "1")]);
        assert_eq!(remove_host_header(&mut map).as_deref(), Some("localhost:3600"));
        assert!(!map.contains_key("host"));
        assert_eq!(remove_host_header(&mut map), None);
    }

    #[test]
    fn test_drop_sensitive_headers() {
        let mut map = headers(&[
            ("authorization", "bearer foo"),
            ("cookie", "a=1"),
            ("cookie", "b=2"),
            ("proxy-authorization", "basic bar"),
            ("x-keep", "1"),
        ]);
        drop_sensitive_headers(&mut map);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("x-keep"));
    }
}
