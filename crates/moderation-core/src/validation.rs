//! Rule-based validation
//!
//! Cheap, deterministic checks that run before the inference call. A file that
//! fails here never reaches the model. The validator does no I/O and never
//! errors: every input maps to a [`RuleOutcome`].

use crate::config::RuleConfig;
use crate::models::{FetchedContent, RuleOutcome};

pub const REASON_EMPTY_FILE: &str = "empty_file";
pub const REASON_FILE_TOO_LARGE: &str = "file_too_large";
pub const REASON_CONTENT_TYPE_UNKNOWN: &str = "content_type_unknown";
pub const REASON_CONTENT_TYPE_NOT_ALLOWED: &str = "content_type_not_allowed";
pub const REASON_INVALID_UTF8: &str = "invalid_utf8";

/// Deterministic pre-filter for fetched content.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    config: RuleConfig,
}

impl RuleValidator {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    /// Validator with no checks configured; accepts everything.
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn validate(&self, content: &FetchedContent) -> RuleOutcome {
        if let Err(reason) = self.check(content) {
            tracing::debug!(
                reason = reason,
                size_bytes = content.len(),
                content_type = ?content.declared_content_type,
                "Rule validation rejected content"
            );
            return RuleOutcome::reject(reason);
        }
        RuleOutcome::pass()
    }

    fn check(&self, content: &FetchedContent) -> Result<(), &'static str> {
        self.check_size(content.len())?;
        self.check_content_type(content.declared_content_type.as_deref())?;
        self.check_structure(content)?;
        Ok(())
    }

    fn check_size(&self, size: usize) -> Result<(), &'static str> {
        if size == 0 && self.config.reject_empty {
            return Err(REASON_EMPTY_FILE);
        }
        match self.config.max_size_bytes {
            Some(max) if size > max => Err(REASON_FILE_TOO_LARGE),
            _ => Ok(()),
        }
    }

    fn check_content_type(&self, content_type: Option<&str>) -> Result<(), &'static str> {
        if self.config.allowed_content_types.is_empty() {
            return Ok(());
        }
        let Some(content_type) = content_type else {
            return Err(REASON_CONTENT_TYPE_UNKNOWN);
        };
        let normalized = essence(content_type);
        if self
            .config
            .allowed_content_types
            .iter()
            .any(|allowed| type_matches(allowed, &normalized))
        {
            Ok(())
        } else {
            Err(REASON_CONTENT_TYPE_NOT_ALLOWED)
        }
    }

    fn check_structure(&self, content: &FetchedContent) -> Result<(), &'static str> {
        if !self.config.require_utf8_text {
            return Ok(());
        }
        let is_text = content
            .declared_content_type
            .as_deref()
            .map(|ct| {
                let ct = essence(ct);
                ct == "text" || ct.starts_with("text/")
            })
            .unwrap_or(false);
        if is_text && std::str::from_utf8(&content.bytes).is_err() {
            return Err(REASON_INVALID_UTF8);
        }
        Ok(())
    }
}

/// Lower-cased MIME type without parameters (`Text/Plain; charset=utf-8` -> `text/plain`).
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn type_matches(allowed: &str, content_type: &str) -> bool {
    match allowed.strip_suffix("/*") {
        Some(family) => content_type
            .split('/')
            .next()
            .map(|top| top == family)
            .unwrap_or(false),
        None => allowed == content_type,
    }
}
