// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and loads the word-level vocabulary of a fold.
//
// The vocabulary is counted from the fold's training text and
// written as a HuggingFace tokenizer JSON (BertNormalizer +
// Whitespace pre-tokenizer + WordLevel model) next to the
// checkpoint, so a kept checkpoint is always paired with the
// exact token ids it was trained on.
//
//   id 0  [PAD]
//   id 1  [UNK]   every word outside the vocabulary
//   id 2… words by descending count, ties in lexical order
//
// Words are counted with the same normaliser and pre-tokenizer
// that later encodes the rows: a vocabulary-less tokenizer splits
// each text, and its offsets cut the words out of the original.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PAD_TOKEN:      &str = "[PAD]";
pub const UNK_TOKEN:      &str = "[UNK]";
const SPECIAL_TOKENS:     usize = 2;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Count the words of `texts`, keep the `vocab_size - 2` most
    /// frequent, write tokenizer.json and load it back.
    pub fn build_and_save<'a>(
        &self,
        texts:      impl IntoIterator<Item = &'a str>,
        vocab_size: usize,
    ) -> Result<Tokenizer> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: Count words with the tokenizer's own splitting ────────────
        let splitter = Tokenizer::from_str(&tokenizer_json(serde_json::Map::new()).to_string())
            .map_err(|e| anyhow::anyhow!("Cannot build word splitter: {e}"))?;

        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            let enc = splitter
                .encode(text, false)
                .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
            for &(start, end) in enc.get_offsets() {
                if let Some(word) = text.get(start..end) {
                    *freq.entry(word.to_lowercase()).or_insert(0) += 1;
                }
            }
        }

        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS));

        // ── Step 2: Vocabulary JSON ──────────────────────────────────────────
        let mut vocab = serde_json::Map::new();
        for (id, (word, _)) in words.into_iter().enumerate() {
            vocab.insert(word, serde_json::json!(id + SPECIAL_TOKENS));
        }
        let size = vocab.len() + SPECIAL_TOKENS;

        // ── Step 3: Save and reload ──────────────────────────────────────────
        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json(vocab))?)
            .with_context(|| format!("Cannot write tokenizer to '{}'", path.display()))?;
        tracing::info!("Tokenizer built with {} tokens, saved to '{}'", size, path.display());

        self.load()
    }

    /// Load a previously saved tokenizer
    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer(&self.path())
    }
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

/// Tokenizer JSON in the HuggingFace format `Tokenizer::from_file`
/// expects. The special tokens are added to `words` here.
fn tokenizer_json(mut words: serde_json::Map<String, serde_json::Value>) -> serde_json::Value {
    words.insert(PAD_TOKEN.into(), serde_json::json!(0));
    words.insert(UNK_TOKEN.into(), serde_json::json!(1));

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": PAD_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 1, "content": UNK_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": false,
            "lowercase": true
        },
        "pre_tokenizer": {
            "type": "Whitespace"
        },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": words,
            "unk_token": UNK_TOKEN
        }
    })
}
