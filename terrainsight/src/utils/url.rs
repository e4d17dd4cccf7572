//! URL helpers.

use url::Url;

/// Marker logged in place of endpoints that cannot be parsed.
pub const INVALID_URL_MARKER: &str = "[invalid-url]";

/// Validates a webhook destination.
///
/// Accepts only absolute `http`/`https` URLs with a host. The error string is
/// safe to show to callers: it never contains the URL itself.
pub fn validate_webhook_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Webhook URL is empty".to_string());
    }

    let url = Url::parse(trimmed).map_err(|e| format!("Webhook URL is invalid: {}", e))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "Webhook URL must use http or https (got '{}')",
            url.scheme()
        ));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err("Webhook URL is invalid: missing host".to_string());
    }

    Ok(url)
}

/// Renders an endpoint for logs: scheme and `host[:port]` are kept, path and
/// query are replaced by `***`.
///
/// Webhook paths frequently embed secret tokens, so this is the only form of
/// an endpoint that may be logged or returned to a browser.
pub fn mask_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) => mask_parsed(&url),
        Err(_) => INVALID_URL_MARKER.to_string(),
    }
}

/// Same as [`mask_url`] for an already parsed URL.
pub fn mask_parsed(url: &Url) -> String {
    match url.host_str() {
        Some(host) if !host.is_empty() => match url.port() {
            Some(port) => format!("{}://{}:{}/***", url.scheme(), host, port),
            None => format!("{}://{}/***", url.scheme(), host),
        },
        _ => INVALID_URL_MARKER.to_string(),
    }
}
