pub mod network {
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const TIMEOUT_LLM_REQUEST_MS: u64 = 60_000;
    pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const USER_AGENT: &str = "openplugin/0.3";
}

pub mod limits {
    pub const RESPONSE_EXCERPT_BYTES: usize = 100;
}

/// Target API calls: two attempts, random exponential wait between 1s and 60s.
pub mod retry {
    pub const MAX_ATTEMPTS: usize = 2;
    pub const MIN_DELAY_MS: u64 = 1_000;
    pub const MAX_DELAY_MS: u64 = 60_000;
}

pub mod llm_retry {
    pub const MAX_ATTEMPTS: usize = 6;
    pub const MIN_DELAY_MS: u64 = 1_000;
    pub const MAX_DELAY_MS: u64 = 20_000;
    pub const STATUS_CODES: &[u16] = &[408, 429, 500, 502, 503, 504];
}

pub mod llm {
    pub const DEFAULT_MODEL_NAME: &str = "gpt-3.5-turbo-0613";
    pub const INPUT_JSON_MARKER: &str = "#INPUT_JSON";
    pub const CLARIFYING_QUESTION_PROMPT: &str = "#INPUT_JSON\n This is a json describing what is missing in the API call. Write a clarifying question asking user to provide missing informations. Make sure you prettify the parameter name. Don't mention about JSON or API call.";
    pub const SUMMARY_PROMPT_PREFIX: &str = "Use a random way to rewrite the #PROMPT to indicate that it has finished either successfully or unsuccessfully based on the #RESPONSE \n\n#RESPONSE\n";
    pub const FAILED_PREFIX: &str = "Failed: ";
}

pub mod markers {
    pub const SERVER_ERROR_MESSAGE: &str = "Internal Server Error";
    pub const ACTION: &str = "Action";
    pub const ACTION_INPUT: &str = "Action Input";
    pub const NONE_INPUT: &str = "none";
    /// Narrow rewrite for text parameters whose closing paren gets glued to a link.
    pub const CONTENT_PARAM: &str = "content";
    pub const CONTENT_REWRITES: &[(&str, &str)] = &[("/edit)", "/edit )"), (".txt)", ".txt )")];
}
