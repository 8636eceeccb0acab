/// Process-wide configuration, loaded once at startup and injected by `Arc<Config>`
/// into every other component's constructor (spec §9: "ambient environment-variable
/// reads scattered across code -> load once into a Config struct and pass
/// explicitly"). Recognized options are enumerated in SPEC_FULL.md §6.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_schema_tokens: usize,
    pub default_timeout_sec: u64,
    pub default_max_rows: usize,
    pub retry_budget_per_stage: u32,
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
    pub requests_per_day: u32,
    pub burst_limit: u32,
    pub cache_ttl_schema_hours: i64,
    pub cache_ttl_query_hours: i64,
    pub cache_ttl_ai_hours: i64,
    pub enable_streaming: bool,
    pub enable_ai_response_cache: bool,
    pub enable_function_calling: bool,
    pub service_name: String,
    pub otlp_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_schema_tokens: 4000,
            default_timeout_sec: 30,
            default_max_rows: 1000,
            retry_budget_per_stage: 2,
            requests_per_minute: 60,
            requests_per_hour: 1000,
            requests_per_day: 10_000,
            burst_limit: 100,
            cache_ttl_schema_hours: 24,
            cache_ttl_query_hours: 1,
            cache_ttl_ai_hours: 1,
            enable_streaming: true,
            enable_ai_response_cache: true,
            enable_function_calling: true,
            service_name: "qflow-surface".to_string(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// [`Default::default`] for anything unset. Every recognized variable is read
    /// exactly once, here — no other crate in the workspace touches `std::env`
    /// directly for a behavior-affecting knob.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_schema_tokens: env_usize("MAX_SCHEMA_TOKENS", defaults.max_schema_tokens),
            default_timeout_sec: env_u64("DEFAULT_TIMEOUT_SEC", defaults.default_timeout_sec),
            default_max_rows: env_usize("DEFAULT_MAX_ROWS", defaults.default_max_rows),
            retry_budget_per_stage: env_u32("RETRY_BUDGET_PER_STAGE", defaults.retry_budget_per_stage),
            requests_per_minute: env_u32("RATE_LIMIT_PER_MINUTE", defaults.requests_per_minute),
            requests_per_hour: env_u32("RATE_LIMIT_PER_HOUR", defaults.requests_per_hour),
            requests_per_day: env_u32("RATE_LIMIT_PER_DAY", defaults.requests_per_day),
            burst_limit: env_u32("RATE_LIMIT_BURST", defaults.burst_limit),
            cache_ttl_schema_hours: env_i64("CACHE_TTL_SCHEMA_HOURS", defaults.cache_ttl_schema_hours),
            cache_ttl_query_hours: env_i64("CACHE_TTL_QUERY_HOURS", defaults.cache_ttl_query_hours),
            cache_ttl_ai_hours: env_i64("CACHE_TTL_AI_HOURS", defaults.cache_ttl_ai_hours),
            enable_streaming: env_bool("ENABLE_STREAMING", defaults.enable_streaming),
            enable_ai_response_cache: env_bool(
                "ENABLE_AI_RESPONSE_CACHE",
                defaults.enable_ai_response_cache,
            ),
            enable_function_calling: env_bool(
                "ENABLE_FUNCTION_CALLING",
                defaults.enable_function_calling,
            ),
            service_name: std::env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            otlp_endpoint: std::env::var("OTLP_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).ok().map(|v| v == "true" || v == "1").unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_section_6() {
        let c = Config::default();
        assert_eq!(c.max_schema_tokens, 4000);
        assert_eq!(c.default_timeout_sec, 30);
        assert_eq!(c.default_max_rows, 1000);
        assert_eq!(c.retry_budget_per_stage, 2);
        assert_eq!(c.requests_per_minute, 60);
        assert_eq!(c.requests_per_day, 10_000);
        assert_eq!(c.burst_limit, 100);
        assert_eq!(c.cache_ttl_schema_hours, 24);
    }
}
