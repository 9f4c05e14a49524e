use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::errors::GatewayError;

pub const PRIMARY_KEY_ENV: &str = "GEMINI_API_KEY";
pub const SECONDARY_KEY_ENV: &str = "API_KEY";

const INJECTED_SOURCE_NAME: &str = "runtime_injected";

const PLACEHOLDER_LITERALS: &[&str] = &[
    "placeholder",
    "placeholder_api_key",
    "your_api_key",
    "your-api-key",
    "your_api_key_here",
    "your-gemini-api-key",
    "changeme",
    "undefined",
    "null",
    "none",
    "xxx",
];

/// Provider credential. Never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Server,
    Browser,
}

impl ExecutionContext {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Browser => "browser",
        }
    }
}

impl FromStr for ExecutionContext {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "browser" | "client" => Ok(Self::Browser),
            other => Err(format!("unknown execution context '{other}'")),
        }
    }
}

#[derive(Clone)]
pub enum KeySource {
    Injected(Option<String>),
    Env(String),
    File(PathBuf),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Injected(value) => f
                .debug_tuple("Injected")
                .field(&value.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Env(var) => f.debug_tuple("Env").field(var).finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyCandidate {
    name: String,
    source: KeySource,
}

impl KeyCandidate {
    pub fn injected(value: Option<String>) -> Self {
        Self {
            name: INJECTED_SOURCE_NAME.to_string(),
            source: KeySource::Injected(value),
        }
    }

    pub fn env(var: impl Into<String>) -> Self {
        let var = var.into();
        Self {
            name: format!("env:{var}"),
            source: KeySource::Env(var),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("file:{}", path.display()),
            source: KeySource::File(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    fn read(&self) -> Option<String> {
        match &self.source {
            KeySource::Injected(value) => value.clone(),
            KeySource::Env(var) => env::var(var).ok(),
            KeySource::File(path) => match fs::read_to_string(path) {
                Ok(contents) => Some(contents),
                Err(err) if err.kind() == io::ErrorKind::NotFound => None,
                Err(err) => {
                    warn!(
                        source = %self.name,
                        error_kind = ?err.kind(),
                        "credential override file is unreadable; skipping"
                    );
                    None
                }
            },
        }
    }
}

#[derive(Clone, Default)]
pub struct KeySourcesConfig {
    pub injected_key: Option<String>,
    pub override_path: Option<PathBuf>,
}

impl fmt::Debug for KeySourcesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySourcesConfig")
            .field(
                "injected_key",
                &self.injected_key.as_ref().map(|_| "<redacted>"),
            )
            .field("override_path", &self.override_path)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct KeyCandidateSet {
    candidates: Vec<KeyCandidate>,
}

impl KeyCandidateSet {
    pub fn new(candidates: Vec<KeyCandidate>) -> Self {
        Self { candidates }
    }

    /// Server processes trust their own environment first; browser-style
    /// deployments prefer the value injected into the runtime.
    pub fn for_context(context: ExecutionContext, sources: &KeySourcesConfig) -> Self {
        let mut candidates = match context {
            ExecutionContext::Server => vec![
                KeyCandidate::env(PRIMARY_KEY_ENV),
                KeyCandidate::env(SECONDARY_KEY_ENV),
            ],
            ExecutionContext::Browser => vec![
                KeyCandidate::injected(sources.injected_key.clone()),
                KeyCandidate::env(PRIMARY_KEY_ENV),
            ],
        };
        if let Some(path) = sources.override_path.as_ref() {
            candidates.push(KeyCandidate::file(path.clone()));
        }
        Self { candidates }
    }

    pub fn candidates(&self) -> &[KeyCandidate] {
        &self.candidates
    }

    fn first_valid(&self) -> Option<(&KeyCandidate, ApiKey)> {
        self.candidates.iter().find_map(|candidate| {
            let raw = candidate.read()?;
            let trimmed = raw.trim();
            if trimmed.is_empty() || is_placeholder(trimmed) {
                return None;
            }
            Some((candidate, ApiKey(trimmed.to_string())))
        })
    }

    fn source_names(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|candidate| candidate.name.clone())
            .collect()
    }
}

#[derive(Debug)]
pub struct KeyResolver {
    candidates: KeyCandidateSet,
    memoize: bool,
    memo: Mutex<Option<ApiKey>>,
}

impl KeyResolver {
    pub fn new(candidates: KeyCandidateSet) -> Self {
        Self {
            candidates,
            memoize: false,
            memo: Mutex::new(None),
        }
    }

    pub fn memoized(candidates: KeyCandidateSet) -> Self {
        Self {
            memoize: true,
            ..Self::new(candidates)
        }
    }

    pub fn resolve(&self) -> Result<ApiKey, GatewayError> {
        if self.memoize
            && let Some(key) = self.lock_memo().clone()
        {
            return Ok(key);
        }

        let Some((candidate, key)) = self.candidates.first_valid() else {
            return Err(GatewayError::Configuration {
                tried_sources: self.candidates.source_names(),
            });
        };
        debug!(source = %candidate.name(), "resolved provider credential");

        if self.memoize {
            *self.lock_memo() = Some(key.clone());
        }
        Ok(key)
    }

    /// Drops the memoized key so the next `resolve` re-reads every source.
    pub fn invalidate(&self) {
        if self.lock_memo().take().is_some() {
            debug!("provider credential memo invalidated");
        }
    }

    fn lock_memo(&self) -> MutexGuard<'_, Option<ApiKey>> {
        match self.memo.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub fn is_placeholder(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    PLACEHOLDER_LITERALS.contains(&normalized.as_str())
        || normalized.contains("placeholder")
        || (normalized.starts_with('<') && normalized.ends_with('>'))
        || (normalized.starts_with("${") && normalized.ends_with('}'))
}
