//! Row content tokenizer - jieba-rs segmentation inside tantivy / 行内容分词器
//!
//! Supports / 支持：
//! - Chinese word segmentation (jieba, search mode) / 中文分词
//! - English words, lowercased / 英文分词
//! - Whitespace and punctuation dropped, very long tokens dropped / 过滤空白与过长词元

use jieba_rs::{Jieba, TokenizeMode};
use once_cell::sync::Lazy;
use tantivy::tokenizer::{
    LowerCaser, PreTokenizedStream, PreTokenizedString, RemoveLongFilter, TextAnalyzer, Token,
    Tokenizer,
};
use tantivy::Index;

/// Global jieba tokenizer instance / 全局 jieba 分词器实例
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Analyzer name used by the `content` field / content 字段使用的分析器名
pub const CONTENT_TOKENIZER: &str = "row_content";

/// Tokens longer than this many bytes are not indexed
const MAX_TOKEN_LEN: usize = 255;

/// Register the analyzers the schema refers to / 注册分析器
///
/// Must run on every `Index` handle before writing or parsing queries.
pub fn register_tokenizers(index: &Index) {
    index.tokenizers().register(CONTENT_TOKENIZER, content_analyzer());
}

pub fn content_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(JiebaTokenizer)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .build()
}

/// jieba search-mode segmentation as a tantivy tokenizer / jieba 分词器
#[derive(Clone, Default)]
pub struct JiebaTokenizer;

impl Tokenizer for JiebaTokenizer {
    type TokenStream<'a> = PreTokenizedStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> PreTokenizedStream {
        PreTokenizedStream::from(PreTokenizedString {
            text: text.to_string(),
            tokens: segment(text),
        })
    }
}

/// Segment `text`; jieba reports char offsets, tantivy wants byte offsets.
fn segment(text: &str) -> Vec<Token> {
    let byte_at: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let to_byte = |chars: usize| byte_at.get(chars).copied().unwrap_or(text.len());

    JIEBA
        .tokenize(text, TokenizeMode::Search, true)
        .into_iter()
        .filter(|word| word.word.chars().any(char::is_alphanumeric))
        .enumerate()
        .map(|(position, word)| Token {
            offset_from: to_byte(word.start),
            offset_to: to_byte(word.end),
            position,
            text: word.word.to_string(),
            position_length: 1,
        })
        .collect()
}
