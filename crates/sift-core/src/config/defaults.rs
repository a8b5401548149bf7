//! Default values for Sift configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Provider Defaults
// ============================================================================

/// Default active provider.
pub const DEFAULT_PROVIDER: &str = "google";

/// Gemini API base URL.
pub const DEFAULT_GOOGLE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model for query generation and reflection.
pub const DEFAULT_GOOGLE_FAST_MODEL: &str = "models/gemini-2.5-flash";

/// Default Gemini model for the final answer.
pub const DEFAULT_GOOGLE_ANSWER_MODEL: &str = "models/gemini-2.5-pro";

/// OpenRouter API base URL.
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

/// Default OpenRouter model for every role.
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-3.5-sonnet";

/// Local inference server base URL (llama.cpp server, vLLM, ...).
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:8080/v1";

/// Default model name reported by local inference servers.
pub const DEFAULT_LOCAL_MODEL: &str = "gpt-3.5-turbo";

/// Exa search API base URL.
pub const DEFAULT_EXA_URL: &str = "https://api.exa.ai";

// ============================================================================
// Research Defaults
// ============================================================================

/// Number of search queries generated for the first wave.
pub const DEFAULT_INITIAL_QUERIES: usize = 3;

/// Maximum number of reflection cycles before the answer is forced.
pub const DEFAULT_MAX_RESEARCH_LOOPS: usize = 2;

/// Number of results requested from the external search index per query.
pub const DEFAULT_SEARCH_RESULTS: usize = 5;

/// Maximum characters of page text kept per search result.
pub const DEFAULT_RESULT_CONTENT_CHARS: usize = 2000;

// ============================================================================
// HTTP Defaults
// ============================================================================

/// Per-request timeout for LLM and search calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Retries after the first attempt for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Backoff before the first retry.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Upper bound for a single backoff delay.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 8000;

// ============================================================================
// Citation Defaults
// ============================================================================

/// Short URL prefix for sources found through native grounded search.
pub const GROUNDED_SHORT_URL_BASE: &str = "https://vertexaisearch.cloud.google.com/id";

/// Short URL prefix for sources found through the external search index.
pub const INDEX_SHORT_URL_BASE: &str = "https://exa.ai/search/id";

// ============================================================================
// File Names
// ============================================================================

/// Project-local TOML config file.
pub const CONFIG_FILE_TOML: &str = "sift.toml";

/// Project-local YAML config file.
pub const CONFIG_FILE_YAML: &str = "config.yaml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "sift";
