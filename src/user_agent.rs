//! Shared User-Agent string for the download HTTP client.
//!
//! Single source for project URL and UA format so every HTTP request stays
//! consistent and easy to update (good citizenship; RFC 9308).

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/example/downloader";

/// Default User-Agent for download requests (identifies the tool).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("downloader/{version} (batch-download-tool; +{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ua_contains_project_url_and_version() {
        let ua = default_download_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL");
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("downloader/")
                .and_then(|s| s.split(' ').next())
                .unwrap_or_default(),
            "UA must contain crate version"
        );
    }

    #[test]
    fn test_ua_format_keyword() {
        let ua = default_download_user_agent();
        assert!(
            ua.contains("batch-download-tool"),
            "UA must identify as batch-download-tool: {ua}"
        );
    }
}
