//! Loads and validates the server's ambient settings: `HOST`/`HOST_LEAK`
//! (spec.md §6.3's absolute-URL rule), the default leak-setup fields
//! (`SELECTOR`, `PARENT`, `ALPHABET`, `ATTR`, `TIMEOUT`, `LENGTH`,
//! `BROWSER`), and `FASTAPI_LOGGING` (kept under its original name for
//! operational familiarity — it now gates `tower_http::trace` logging).
//!
//! Environment variables provide the defaults; `clap` CLI flags override
//! them, mirroring the teacher's `CommandLineArguments` pattern.

use std::time::Duration;

use clap::Parser;

use crate::error::ApiError;

fn default_alphabet() -> String {
    // string.printable minus whitespace, except space — the same set
    // AlphabetModel::normalise accepts.
    (0x20u8..=0x7E).map(|b| b as char).collect()
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Fontleak leak orchestration server", long_about = None)]
pub struct CliArgs {
    /// Base URL where the application is accessible.
    #[arg(long, env = "HOST", default_value = "http://localhost:4242")]
    pub host: String,

    /// Base URL leak probes are sent to (kept separate from `host` so the
    /// probe's connection never shares the victim's main connection pool).
    #[arg(long, env = "HOST_LEAK", default_value = "http://127.0.0.1:4242")]
    pub host_leak: String,

    /// CSS selector for the target element.
    #[arg(long, env = "SELECTOR", default_value = "script:first-of-type")]
    pub selector: String,

    /// Parent element the staging stylesheet is installed under.
    #[arg(long, env = "PARENT", default_value = "body")]
    pub parent: String,

    /// Attribute to exfiltrate from the target element.
    #[arg(long, env = "ATTR", default_value = "textContent")]
    pub attr: String,

    /// Alphabet the leak chain is built over.
    #[arg(long, env = "ALPHABET", default_value_t = default_alphabet())]
    pub alphabet: String,

    /// Seconds a `GET /` long-poll waits before returning empty CSS.
    #[arg(long, env = "TIMEOUT", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Default reconstruction length for static sessions.
    #[arg(long, env = "LENGTH", default_value_t = 100)]
    pub length: usize,

    /// Default browser compatibility mode for static sessions.
    #[arg(long, env = "BROWSER", default_value = "all")]
    pub browser: String,

    /// Enables `tower_http::trace` request logging.
    #[arg(long, env = "FASTAPI_LOGGING", default_value_t = true)]
    pub fastapi_logging: bool,

    /// Address the HTTP listener binds to.
    #[arg(long, default_value = "0.0.0.0:4242")]
    pub listen: String,
}

/// Validated settings, derived from [`CliArgs`]. `host`/`host_leak` have
/// their trailing slash stripped and are guaranteed absolute.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub host_leak: String,
    pub selector: String,
    pub parent: String,
    pub alphabet: String,
    pub attr: String,
    pub timeout: Duration,
    pub length: usize,
    pub browser: String,
    pub fastapi_logging: bool,
    pub listen: String,
}

impl Settings {
    pub fn from_args(args: CliArgs) -> Result<Self, ApiError> {
        let host = validate_host(&args.host)?;
        let host_leak = validate_host(&args.host_leak)?;
        validate_parent(&args.parent)?;

        Ok(Self {
            host,
            host_leak,
            selector: args.selector,
            parent: args.parent,
            alphabet: args.alphabet,
            attr: args.attr,
            timeout: Duration::from_secs(args.timeout_secs),
            length: args.length,
            browser: args.browser,
            fastapi_logging: args.fastapi_logging,
            listen: args.listen,
        })
    }
}

/// Strips a trailing slash and checks the result parses as an absolute URL
/// with a network location (spec.md §6.3, mirroring the original
/// `Settings.validate_host` Pydantic validator).
fn validate_host(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim_end_matches('/');
    let has_scheme = trimmed.contains("://");
    if !has_scheme && !trimmed.starts_with("//") {
        return Err(ApiError::InvalidConfig(format!(
            "relative URL {trimmed:?} is not allowed"
        )));
    }
    let authority = trimmed.splitn(2, "://").nth(1).unwrap_or(trimmed);
    if authority.trim_start_matches('/').is_empty() {
        return Err(ApiError::InvalidConfig(format!(
            "URL {trimmed:?} must contain a network location"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_parent(parent: &str) -> Result<(), ApiError> {
    if parent != "body" && parent != "head" {
        return Err(ApiError::InvalidConfig(format!(
            "parent must be either 'body' or 'head', got {parent:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CliArgs {
        CliArgs {
            host: "http://localhost:4242".into(),
            host_leak: "http://127.0.0.1:4242".into(),
            selector: "script:first-of-type".into(),
            parent: "body".into(),
            attr: "textContent".into(),
            alphabet: default_alphabet(),
            timeout_secs: 10,
            length: 100,
            browser: "all".into(),
            fastapi_logging: true,
            listen: "0.0.0.0:4242".into(),
        }
    }

    #[test]
    fn strips_trailing_slash() {
        let mut a = args();
        a.host = "http://localhost:4242/".into();
        let settings = Settings::from_args(a).unwrap();
        assert_eq!(settings.host, "http://localhost:4242");
    }

    #[test]
    fn rejects_relative_host() {
        let mut a = args();
        a.host = "localhost:4242".into();
        assert!(matches!(
            Settings::from_args(a),
            Err(ApiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_host_without_network_location() {
        let mut a = args();
        a.host = "http://".into();
        assert!(matches!(
            Settings::from_args(a),
            Err(ApiError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_invalid_parent() {
        let mut a = args();
        a.parent = "footer".into();
        assert!(matches!(
            Settings::from_args(a),
            Err(ApiError::InvalidConfig(_))
        ));
    }
}
