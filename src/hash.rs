//! Content hashing for cache keys.
//!
//! The cache key over a batch of articles is a rolling integer hash of the
//! ordered (title, summary) pairs. It is deterministic and order-sensitive
//! but NOT collision-resistant; a collision only yields a stale cache hit,
//! never corruption, so the cheap hash is kept on purpose.

use crate::article::Article;

/// Stable key for an ordered list of (title, summary) pairs.
/// Reordering the same articles produces a different key.
pub fn batch_key(articles: &[&Article]) -> String {
    let mut h: i32 = 0;
    for a in articles {
        h = fold_str(h, &a.title);
        h = h.wrapping_mul(31).wrapping_add(b'|' as i32);
        h = fold_str(h, &a.summary);
        h = h.wrapping_mul(31).wrapping_add(b'\n' as i32);
    }
    format!("{:08x}", h as u32)
}

/// Key for a single article's content; the per-item cache uses this.
pub fn article_key(article: &Article) -> String {
    batch_key(&[article])
}

fn fold_str(mut h: i32, s: &str) -> i32 {
    for c in s.chars() {
        h = h.wrapping_mul(31).wrapping_add(c as i32);
    }
    h
}

/// Short anonymized id for log lines; raw titles are never logged.
pub fn anon_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(id: &str, title: &str, summary: &str) -> Article {
        Article::new(id, title, summary, "Reuters", 0)
    }

    #[test]
    fn identical_input_hashes_identically() {
        let a = art("1", "Dow rallies", "Industrials lead gains.");
        let b = art("2", "Fed holds", "Rates unchanged this meeting.");
        let k1 = batch_key(&[&a, &b]);
        let k2 = batch_key(&[&a, &b]);
        assert_eq!(k1, k2);
    }

    #[test]
    fn permuting_articles_changes_the_key() {
        let a = art("1", "Dow rallies", "Industrials lead gains.");
        let b = art("2", "Fed holds", "Rates unchanged this meeting.");
        assert_ne!(batch_key(&[&a, &b]), batch_key(&[&b, &a]));
    }

    #[test]
    fn content_change_changes_the_key() {
        let a = art("1", "Dow rallies", "Industrials lead gains.");
        let mut b = a.clone();
        b.summary = "Industrials lead losses.".into();
        assert_ne!(article_key(&a), article_key(&b));
    }

    #[test]
    fn article_id_does_not_affect_the_key() {
        // Keys are content-addressed: same text under a different id must hit.
        let a = art("1", "Dow rallies", "Industrials lead gains.");
        let b = art("other", "Dow rallies", "Industrials lead gains.");
        assert_eq!(article_key(&a), article_key(&b));
    }

    #[test]
    fn anon_id_is_short_and_stable() {
        let x = anon_id("Dow rallies");
        assert_eq!(x.len(), 12);
        assert_eq!(x, anon_id("Dow rallies"));
        assert_ne!(x, anon_id("Dow slides"));
    }
}
