use http::header::HOST;
use url::Url;

use crate::error::RedirectError;
use crate::options::{RequestOptions, Scheme};

/// `host[:port]` of a parsed URL; the port is omitted when it is the default.
pub fn host_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// The host the current hop was addressed to.
///
/// An explicit `Host` header wins over the connection target, so that a
/// request sent to an IP with `Host: example.com` resolves relative
/// Locations and compares credentials against `example.com`.
pub fn effective_host(options: &RequestOptions) -> String {
    if let Some(host) = options
        .headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
    {
        return host.to_string();
    }
    let scheme = options.scheme_or(Scheme::Http);
    match options.port {
        Some(port) if port != scheme.default_port() => format!("{}:{}", options.hostname, port),
        _ => options.hostname.clone(),
    }
}

/// Absolute URL of the hop described by `options`, fragment included.
pub fn format_url(options: &RequestOptions) -> String {
    let scheme = options.scheme_or(Scheme::Http);
    let mut url = format!("{}://{}", scheme.as_str(), options.hostname);
    if let Some(port) = options.port.filter(|port| *port != scheme.default_port()) {
        url.push(':');
        url.push_str(&port.to_string());
    }
    if !options.path.starts_with('/') {
        url.push('/');
    }
    url.push_str(&options.path);
    if let Some(hash) = &options.hash {
        url.push('#');
        url.push_str(hash);
    }
    url
}

/// Resolve a Location header against the current hop.
///
/// Relative references are resolved against the effective host of the hop;
/// absolute ones replace it.
pub fn resolve_location(options: &RequestOptions, location: &str) -> Result<Url, RedirectError> {
    let scheme = options.scheme_or(Scheme::Http);
    let base = format!(
        "{}://{}{}",
        scheme.as_str(),
        effective_host(options),
        options.path
    );
    let base = Url::parse(&base)
        .or_else(|_| Url::parse(&format_url(options)))
        .map_err(|_| RedirectError::invalid_url(format_url(options)))?;
    base.join(location)
        .map_err(|_| RedirectError::invalid_url(location))
}

/// Point `options` at `url`, replacing every URL component.
pub fn apply_url(options: &mut RequestOptions, url: &Url) -> Result<(), RedirectError> {
    let scheme: Scheme = url.scheme().parse()?;
    let hostname = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| RedirectError::invalid_url(url.as_str()))?;

    options.protocol = Some(scheme);
    options.hostname = hostname.to_string();
    options.port = url.port();
    options.path = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    options.hash = url.fragment().map(str::to_owned);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(url: &str) -> RequestOptions {
        RequestOptions::parse(url).unwrap()
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of(&Url::parse("http://a.com/x").unwrap()), "a.com");
        assert_eq!(host_of(&Url::parse("http://a.com:80/x").unwrap()), "a.com");
        assert_eq!(host_of(&Url::parse("http://a.com:81/x").unwrap()), "a.com:81");
        assert_eq!(host_of(&Url::parse("https://[::1]:8443/").unwrap()), "[::1]:8443");
    }

    #[test]
    fn test_effective_host_prefers_host_header() {
        let opts = options("http://127.0.0.1:3600/a");
        assert_eq!(effective_host(&opts), "127.0.0.1:3600");

        let opts = opts.header("host", "localhost");
        assert_eq!(effective_host(&opts), "localhost");
    }

    #[test]
    fn test_format_url_without_protocol() {
        let opts = RequestOptions::new().hostname("example.com").path("/x");
        assert_eq!(format_url(&opts), "http://example.com/x");
    }

    #[test]
    fn test_resolve_relative() {
        let opts = options("http://localhost:3600/a/b?q=1");
        let url = resolve_location(&opts, "c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3600/a/c");

        let url = resolve_location(&opts, "/d").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3600/d");
    }

    #[test]
    fn test_resolve_relative_against_host_header() {
        let opts = options("http://127.0.0.1:3600/a").header("host", "localhost:3600");
        let url = resolve_location(&opts, "/b").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3600/b");
    }

    #[test]
    fn test_resolve_absolute() {
        let opts = options("https://localhost:3601/a");
        let url = resolve_location(&opts, "http://localhost:3600/b").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3600/b");
    }

    #[test]
    fn test_resolve_keeps_location_fragment() {
        let opts = options("http://localhost/a#original");
        let url = resolve_location(&opts, "/b#fragment").unwrap();
        assert_eq!(url.fragment(), Some("fragment"));

        let url = resolve_location(&opts, "/c").unwrap();
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_resolve_invalid() {
        let opts = options("http://localhost/a");
        let err = resolve_location(&opts, "http://[not-an-ip/").unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_URL");
    }

    #[test]
    fn test_apply_url() {
        let mut opts = options("http://localhost:3600/a");
        let target = Url::parse("https://example.com/b?x=1#top").unwrap();
        apply_url(&mut opts, &target).unwrap();
        assert_eq!(opts.protocol, Some(Scheme::Https));
        assert_eq!(opts.hostname, "example.com");
        assert_eq!(opts.port, None);
        assert_eq!(opts.path, "/b?x=1");
        assert_eq!(opts.hash.as_deref(), Some("top"));
        assert_eq!(opts.url(), "https://example.com/b?x=1#top");
    }

    #[test]
    fn test_apply_url_unsupported_scheme() {
        let mut opts = options("http://localhost/a");
        let target = Url::parse("about:blank").unwrap();
        let err = apply_url(&mut opts, &target).unwrap_err();
        assert_eq!(err.code(), "ERR_UNSUPPORTED_PROTOCOL");
        assert_eq!(opts.path, "/a");
    }
}
