//! Domain logic for hot-topic news aggregation.
//!
//! - `news` - core data model (§3)
//! - `url` - per-platform URL canonicalizer (§4.1)
//! - `time` - timezone-aware date utilities and date-range resolution (§4.2)
//! - `keywords` - keyword rule grammar and title matcher (§4.3)
//! - `weight` - composite weight formula and keyword-group analysis (§4.7)
//! - `similarity` - character-bigram cosine similarity (§4.8)
//! - `sentiment` - lexicon-based sentiment classifier (§4.8)
//! - `tokenize` - n-gram auto-extraction for ungrouped trend discovery (§4.8)
//! - `entity` - small entity gazetteer backing `search_news`'s entity mode (§4.8)

pub mod entity;
pub mod keywords;
pub mod news;
pub mod sentiment;
pub mod similarity;
pub mod time;
pub mod tokenize;
pub mod url;
pub mod weight;
