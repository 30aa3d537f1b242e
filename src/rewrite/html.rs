//! Relative-to-absolute link rewriting for HTML documents.
//!
//! The document is run through lol_html's tolerant HTML tokenizer in
//! non-strict mode, so malformed markup never fails the transform. Only the
//! `href`/`src` attributes of `a`, `link`, `img` and `script` elements are
//! touched; everything else is emitted byte for byte.
//!
//! lol_html exposes attribute values as written in the source, character
//! references included. Values are decoded before resolution and the
//! resolved URL is escaped again when written back.

use axum::body::Bytes;
use lol_html::errors::RewritingError;
use lol_html::html_content::Element;
use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use lol_html::{element, HandlerResult, HtmlRewriter, MemorySettings, Settings};
use thiserror::Error;
use url::Url;

use super::resolve::resolve_reference;
use crate::observability::metrics;

/// Attributes resolved on every selected element, in this order.
pub const LINK_ATTRIBUTES: [&str; 2] = ["src", "href"];

const PREALLOCATED_PARSER_BYTES: usize = 1024;

/// Failure inside the HTML transform.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("HTML rewriting failed: {0}")]
    Rewriting(#[from] RewritingError),
}

/// Per-response rewrite state: the URL relative links are resolved against
/// and the parser's memory bound.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    base: Url,
    memory_limit: usize,
}

impl RewriteContext {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            memory_limit: usize::MAX,
        }
    }

    /// Fail the rewrite once the parser buffers more than `bytes`.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Rewrite `html`, returning the serialized document.
    pub fn rewrite(&self, html: &[u8]) -> Result<Vec<u8>, RewriteError> {
        let base = &self.base;
        let mut output = Vec::with_capacity(html.len());

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![
                    element!("a[href]", |el| absolutize(el, base)),
                    element!("link[href]", |el| absolutize(el, base)),
                    element!("img[src]", |el| absolutize(el, base)),
                    element!("script[src]", |el| absolutize(el, base)),
                ],
                strict: false,
                memory_settings: MemorySettings {
                    preallocated_parsing_buffer_size: PREALLOCATED_PARSER_BYTES.min(self.memory_limit),
                    max_allowed_memory_usage: self.memory_limit,
                },
                ..Settings::default()
            },
            |chunk: &[u8]| output.extend_from_slice(chunk),
        );

        rewriter.write(html)?;
        rewriter.end()?;

        Ok(output)
    }

    /// Rewrite `html`, falling back to the original bytes if the transform fails.
    pub fn rewrite_or_passthrough(&self, html: Bytes) -> Bytes {
        match self.rewrite(&html) {
            Ok(rewritten) => {
                metrics::record_rewrite("rewritten");
                Bytes::from(rewritten)
            }
            Err(e) => {
                tracing::warn!(base = %self.base, error = %e, "HTML rewrite failed, passing original body through");
                metrics::record_rewrite("fallback");
                html
            }
        }
    }
}

/// Rewrite `html` against `base`.
pub fn rewrite(html: &[u8], base: &Url) -> Result<Vec<u8>, RewriteError> {
    RewriteContext::new(base.clone()).rewrite(html)
}

fn absolutize(el: &mut Element<'_, '_>, base: &Url) -> HandlerResult {
    for name in LINK_ATTRIBUTES {
        let Some(raw) = el.get_attribute(name) else {
            continue;
        };
        let value = decode_html_entities(&raw);

        match resolve_reference(base, &value) {
            Some(resolved) if resolved != value => {
                el.set_attribute(name, &encode_double_quoted_attribute(&resolved))?
            }
            Some(_) => {}
            None => {
                tracing::debug!(attribute = name, value = %value, "Leaving unresolvable link untouched");
            }
        }
    }
    Ok(())
}
