use serde::Deserialize;
use ustr::Ustr;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const ENV_PREFIX: &str = "TAKEDOWN_";

#[derive(Debug, Clone)]
pub struct BusinessConfig {
    pub api_base_url: String,
    /// Bearer token from the session, if one was handed over at startup.
    pub token: Option<String>,
}

/// Environment shape, read from `TAKEDOWN_*` variables.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    api_base_url: Option<String>,
    token: Option<String>,
}

impl BusinessConfig {
    pub fn new(base_url: String) -> Self {
        Self {
            api_base_url: base_url,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Reads `TAKEDOWN_API_BASE_URL` and `TAKEDOWN_TOKEN`, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, serde_env::Error> {
        Self::from_vars(std::env::vars())
    }

    fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, serde_env::Error> {
        let scoped = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|key| (key.to_owned(), value))
            })
            .collect::<Vec<_>>();
        let raw: RawConfig = serde_env::from_iter(scoped)?;

        let defaults = Self::default();
        Ok(Self {
            api_base_url: raw
                .api_base_url
                .filter(|url| !url.is_empty())
                .unwrap_or(defaults.api_base_url),
            token: raw.token.filter(|token| !token.is_empty()),
        })
    }

    pub fn api_url(&self) -> Ustr {
        let base = self.api_base_url.trim_end_matches('/');
        if base.is_empty() {
            Ustr::from("/api")
        } else {
            Ustr::from(&format!("{base}/api"))
        }
    }
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL.to_owned())
    }
}
