//! User-Agent sniffing into the three-way split the orchestrator's state
//! machine needs (spec.md §4.5): chrome, firefox, safari, or `all` when the
//! header is absent or unrecognised (static-session default, never a
//! request-time rejection — spec.md §4.10 notwithstanding, out-of-scope
//! clients are best-effort, not rejected).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    All,
}

impl Browser {
    pub fn from_user_agent(ua: &str) -> Self {
        let lower = ua.to_ascii_lowercase();
        // Order matters: Chrome's UA also contains "safari"; real Safari
        // never mentions "chrome" or "crios".
        if lower.contains("edg/") || lower.contains("chrome") || lower.contains("crios") {
            Browser::Chrome
        } else if lower.contains("firefox") || lower.contains("fxios") {
            Browser::Firefox
        } else if lower.contains("safari") {
            Browser::Safari
        } else {
            Browser::All
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
            Browser::All => "all",
        }
    }

    /// Parses an explicit `browser` setting (CLI/env default or `/static`
    /// query param). Unlike [`Browser::from_user_agent`]'s best-effort
    /// sniffing, this is operator/caller-supplied input and unrecognised
    /// values are rejected rather than silently mapped to `All` (spec.md
    /// §7's unsupported-browser rule).
    pub fn parse_setting(value: &str) -> Option<Self> {
        match value {
            "chrome" => Some(Browser::Chrome),
            "firefox" => Some(Browser::Firefox),
            "safari" => Some(Browser::Safari),
            "all" => Some(Browser::All),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_chrome_before_safari() {
        let ua = "Mozilla/5.0 (Macintosh) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
        assert_eq!(Browser::from_user_agent(ua), Browser::Chrome);
    }

    #[test]
    fn detects_real_safari() {
        let ua = "Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";
        assert_eq!(Browser::from_user_agent(ua), Browser::Safari);
    }

    #[test]
    fn detects_firefox() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
        assert_eq!(Browser::from_user_agent(ua), Browser::Firefox);
    }

    #[test]
    fn unrecognised_user_agent_falls_back_to_all() {
        assert_eq!(Browser::from_user_agent("curl/8.4.0"), Browser::All);
    }

    #[test]
    fn parse_setting_accepts_all_four_known_values() {
        assert_eq!(Browser::parse_setting("chrome"), Some(Browser::Chrome));
        assert_eq!(Browser::parse_setting("firefox"), Some(Browser::Firefox));
        assert_eq!(Browser::parse_setting("safari"), Some(Browser::Safari));
        assert_eq!(Browser::parse_setting("all"), Some(Browser::All));
    }

    #[test]
    fn parse_setting_rejects_unrecognized_values() {
        assert_eq!(Browser::parse_setting("Chrome"), None);
        assert_eq!(Browser::parse_setting("ie11"), None);
        assert_eq!(Browser::parse_setting(""), None);
    }
}
