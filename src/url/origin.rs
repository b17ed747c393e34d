use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the origin (scheme + host + port) from a URL
///
/// Origins scope both robots.txt decisions and rate-limit state. The port is
/// always spelled out, so `http://example.com` and `http://example.com:80`
/// share one origin.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_sift::url::origin_of;
///
/// let url = Url::parse("https://Example.com/path?q=1").unwrap();
/// assert_eq!(origin_of(&url).unwrap(), "https://example.com:443");
/// ```
pub fn origin_of(url: &Url) -> UrlResult<String> {
    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingHost)?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| UrlError::InvalidScheme(url.scheme().to_string()))?;
    Ok(format!("{}://{}:{}", url.scheme(), host, port))
}

/// Builds the robots.txt location for the origin of `url`
pub fn robots_url(url: &Url) -> UrlResult<Url> {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    if robots.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }
    Ok(robots)
}

/// Parses a user-supplied URL and checks it is absolute HTTP(S)
pub fn parse_http_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }
    Ok(url)
}
