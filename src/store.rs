use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

const TOKENS_FILE: &str = "tokens.json";
const STATE_VERSION: u32 = 1;

/// The two credentials the client persists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub const ALL: [TokenKey; 2] = [TokenKey::Access, TokenKey::Refresh];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKey::Access => "access_token",
            TokenKey::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key/value storage for bearer credentials. No business logic lives here.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Result<Option<String>>;
    fn set(&self, key: TokenKey, value: &str) -> Result<()>;
    fn clear(&self, key: TokenKey) -> Result<()>;

    fn clear_all(&self) -> Result<()> {
        for key in TokenKey::ALL {
            self.clear(key)?;
        }
        Ok(())
    }
}

/// Reads a token, treating an unavailable store as "no credentials".
pub(crate) fn read_token(store: &dyn TokenStore, key: TokenKey) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(err) => {
            warn!(key = %key, error = %format!("{err:#}"), "token store unavailable");
            None
        }
    }
}

pub(crate) fn write_token(store: &dyn TokenStore, key: TokenKey, value: &str) {
    if let Err(err) = store.set(key, value) {
        warn!(key = %key, error = %format!("{err:#}"), "failed to persist token");
    }
}

pub(crate) fn clear_tokens(store: &dyn TokenStore) {
    if let Err(err) = store.clear_all() {
        warn!(error = %format!("{err:#}"), "failed to clear stored tokens");
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct TokenState {
    version: u32,

    #[serde(default)]
    tokens: HashMap<String, String>,
}

/// Token store backed by `tokens.json` in the client state directory.
pub struct FileTokenStore {
    root: PathBuf,
    // Single writer: every read-modify-write cycle holds this.
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn open(state_dir: &Path) -> Result<Self> {
        fs::create_dir_all(state_dir)
            .with_context(|| format!("create state dir {}", state_dir.display()))?;
        Ok(Self {
            root: state_dir.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(TOKENS_FILE)
    }

    fn read_state(&self) -> Result<TokenState> {
        let path = self.path();
        if !path.exists() {
            return Ok(TokenState {
                version: STATE_VERSION,
                tokens: HashMap::new(),
            });
        }
        let bytes = fs::read(&path).context("read tokens.json")?;
        let st: TokenState = serde_json::from_slice(&bytes).context("parse tokens.json")?;
        if st.version != STATE_VERSION {
            anyhow::bail!("unsupported token state version {}", st.version);
        }
        Ok(st)
    }

    fn write_state(&self, st: &TokenState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(st).context("serialize token state")?;
        write_atomic(&self.path(), &bytes).context("write tokens.json")?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut TokenState)) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut st = self.read_state()?;
        f(&mut st);
        self.write_state(&st)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let st = self.read_state()?;
        Ok(st.tokens.get(key.as_str()).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.update(|st| {
            st.tokens.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn clear(&self, key: TokenKey) -> Result<()> {
        self.update(|st| {
            st.tokens.remove(key.as_str());
        })
    }

    fn clear_all(&self) -> Result<()> {
        self.update(|st| st.tokens.clear())
    }
}

/// Process-local token store for embedding and tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<TokenKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tokens.get(&key).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.insert(key, value.to_string());
        Ok(())
    }

    fn clear(&self, key: TokenKey) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.remove(&key);
        Ok(())
    }
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create parent directories")?;
    }
    let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
    fs::write(&tmp, bytes).with_context(|| format!("write temp file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
