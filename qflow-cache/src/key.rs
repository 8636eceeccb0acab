use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest, Sha256};

/// Normalizes SQL for the query-result cache key (spec §6): lowercases keywords,
/// collapses whitespace, strips trailing semicolons. This is intentionally
/// conservative — it does not reparse the query, only canonicalizes formatting so
/// that equivalent-looking queries produce the same key.
pub fn normalize_sql(sql: &str) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_end_matches(';').trim();
    trimmed.to_lowercase()
}

/// Schema cache key: `sha256("schema|" + dataSourceId)` truncated to 32 hex chars.
pub fn schema_key(data_source_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("schema|{data_source_id}"));
    let digest = hasher.finalize();
    hex::encode(digest)[..32].to_string()
}

/// Query-result cache key: `sha256("q|" + dataSourceId + "|" + normalized(sql))`.
pub fn query_key(data_source_id: &str, sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("q|{data_source_id}|{}", normalize_sql(sql)));
    let digest = hasher.finalize();
    hex::encode(digest)[..32].to_string()
}

/// AI-response cache key: `md5(prompt + ":" + contextFingerprint + ":" + conversationId)`.
pub fn ai_key(prompt: &str, context_fingerprint: &str, conversation_id: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{prompt}:{context_fingerprint}:{conversation_id}"));
    hex::encode(hasher.finalize())
}
