//! Token-budgeted response shaping.

use crate::{Error, Result};
use std::sync::RwLock;
use tiktoken_rs::CoreBPE;

/// Appended to every truncated response.
pub const TRUNCATION_NOTICE: &str = "\n\n[Response truncated due to length]";

/// Characters per token assumed once the tokenizer is released.
const CHARS_PER_TOKEN: usize = 4;

/// Outcome of [`TokenBudgeter::truncate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budgeted {
    /// Text to send, notice included when truncated.
    pub text: String,
    /// Whether the text was cut.
    pub truncated: bool,
    /// Token count of the input.
    pub original_tokens: usize,
    /// Token count of `text`.
    pub final_tokens: usize,
}

/// Counts and truncates text against a token ceiling.
///
/// Uses the `cl100k_base` encoding. After [`release`](Self::release) it
/// falls back to a character estimate so late callers still get an answer.
pub struct TokenBudgeter {
    max_tokens: usize,
    bpe: RwLock<Option<CoreBPE>>,
}

impl TokenBudgeter {
    /// Creates a budgeter backed by `cl100k_base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding cannot be loaded.
    pub fn new(max_tokens: usize) -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| Error::operation("load_tokenizer", e))?;
        Ok(Self {
            max_tokens,
            bpe: RwLock::new(Some(bpe)),
        })
    }

    /// Creates a budgeter that only estimates.
    #[must_use]
    pub const fn estimating(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            bpe: RwLock::new(None),
        }
    }

    /// Returns the configured ceiling.
    #[must_use]
    pub const fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Whether the tokenizer is still loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.bpe.read().is_ok_and(|guard| guard.is_some())
    }

    /// Drops the tokenizer. Later calls estimate.
    pub fn release(&self) {
        if let Ok(mut guard) = self.bpe.write() {
            if guard.take().is_some() {
                tracing::debug!("Released tokenizer");
            }
        }
    }

    /// Counts tokens in `text`.
    #[must_use]
    pub fn count(&self, text: &str) -> usize {
        match self.bpe.read() {
            Ok(guard) => guard
                .as_ref()
                .map_or_else(|| estimate_tokens(text), |bpe| bpe.encode_ordinary(text).len()),
            Err(_) => estimate_tokens(text),
        }
    }

    /// Cuts `text` so that it plus the notice fits the ceiling.
    #[must_use]
    pub fn truncate(&self, text: &str) -> Budgeted {
        let guard = self.bpe.read().ok();
        let bpe = guard.as_ref().and_then(|g| g.as_ref());

        let budgeted = match bpe {
            Some(bpe) => truncate_with_bpe(bpe, text, self.max_tokens),
            None => truncate_estimated(text, self.max_tokens),
        };

        if budgeted.truncated {
            tracing::debug!(
                original_tokens = budgeted.original_tokens,
                final_tokens = budgeted.final_tokens,
                max_tokens = self.max_tokens,
                "Truncated response"
            );
        }
        budgeted
    }
}

fn truncate_with_bpe(bpe: &CoreBPE, text: &str, max_tokens: usize) -> Budgeted {
    let tokens = bpe.encode_ordinary(text);
    let original_tokens = tokens.len();
    if original_tokens <= max_tokens {
        return Budgeted {
            text: text.to_string(),
            truncated: false,
            original_tokens,
            final_tokens: original_tokens,
        };
    }

    let notice_tokens = bpe.encode_ordinary(TRUNCATION_NOTICE).len();
    let mut keep = max_tokens.saturating_sub(notice_tokens).min(tokens.len());

    loop {
        // A cut inside a multi-byte character does not decode; back off.
        let Ok(prefix) = bpe.decode(tokens[..keep].to_vec()) else {
            keep = keep.saturating_sub(1);
            continue;
        };
        let candidate = format!("{prefix}{TRUNCATION_NOTICE}");
        let final_tokens = bpe.encode_ordinary(&candidate).len();
        if final_tokens <= max_tokens || keep == 0 {
            return Budgeted {
                text: candidate,
                truncated: true,
                original_tokens,
                final_tokens,
            };
        }
        keep = keep.saturating_sub((final_tokens - max_tokens).max(1));
    }
}

fn truncate_estimated(text: &str, max_tokens: usize) -> Budgeted {
    let original_tokens = estimate_tokens(text);
    if original_tokens <= max_tokens {
        return Budgeted {
            text: text.to_string(),
            truncated: false,
            original_tokens,
            final_tokens: original_tokens,
        };
    }

    let keep_chars =
        max_tokens.saturating_sub(estimate_tokens(TRUNCATION_NOTICE)) * CHARS_PER_TOKEN;
    let prefix: String = text.chars().take(keep_chars).collect();
    let candidate = format!("{prefix}{TRUNCATION_NOTICE}");
    let final_tokens = estimate_tokens(&candidate);
    Budgeted {
        text: candidate,
        truncated: true,
        original_tokens,
        final_tokens,
    }
}

/// Estimates tokens at four characters per token, rounding up.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}
