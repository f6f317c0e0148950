// src/roster.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const ENV_SEED_PATH: &str = "ROSTER_SEED_PATH";
const DEFAULT_SEED_PATH: &str = "config/roster.toml";

/// A subscriber address: an E.164 phone number ("+" then 2-15 digits,
/// first digit non-zero).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    pub fn parse(raw: &str) -> Result<Self> {
        static RE_E164: OnceCell<regex::Regex> = OnceCell::new();
        let re = RE_E164.get_or_init(|| regex::Regex::new(r"^\+[1-9]\d{1,14}$").unwrap());

        let trimmed = raw.trim();
        if !re.is_match(trimmed) {
            bail!("invalid phone number '{trimmed}', expected E.164 format (e.g. +1234567890)");
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the subscriber roster, read fresh at the start of every push run.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn current_recipients(&self) -> Result<Vec<Recipient>>;
}

/// In-memory subscriber roster, ordered by subscription time. Durability is
/// out of scope; an optional TOML seed file fills it at startup.
#[derive(Default)]
pub struct InMemoryRoster {
    subscribers: RwLock<Vec<Recipient>>,
}

impl InMemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from `$ROSTER_SEED_PATH`, then `config/roster.toml`, then empty.
    pub fn from_env() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SEED_PATH) {
            return Self::from_seed_file(&PathBuf::from(p));
        }
        let default = Path::new(DEFAULT_SEED_PATH);
        if default.exists() {
            return Self::from_seed_file(default);
        }
        Ok(Self::new())
    }

    pub fn from_seed_file(path: &Path) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct Seed {
            numbers: Vec<String>,
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading roster seed from {}", path.display()))?;
        let seed: Seed = toml::from_str(&content).context("parsing roster seed toml")?;

        let roster = Self::new();
        for number in seed.numbers {
            let recipient = Recipient::parse(&number)
                .with_context(|| format!("roster seed entry '{number}'"))?;
            roster.subscribe(recipient);
        }
        Ok(roster)
    }

    /// Returns false when the number is already subscribed.
    pub fn subscribe(&self, recipient: Recipient) -> bool {
        let mut subs = self.subscribers.write().expect("rwlock poisoned");
        if subs.contains(&recipient) {
            return false;
        }
        subs.push(recipient);
        true
    }

    /// Returns false when the number was not subscribed.
    pub fn unsubscribe(&self, recipient: &Recipient) -> bool {
        let mut subs = self.subscribers.write().expect("rwlock poisoned");
        match subs.iter().position(|r| r == recipient) {
            Some(idx) => {
                subs.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().expect("rwlock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RosterProvider for InMemoryRoster {
    async fn current_recipients(&self) -> Result<Vec<Recipient>> {
        Ok(self.subscribers.read().expect("rwlock poisoned").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e164_validation() {
        assert!(Recipient::parse("+12025550123").is_ok());
        assert!(Recipient::parse(" +420777123456 ").is_ok()); // trimmed
        assert!(Recipient::parse("+12").is_ok()); // minimum length
        assert!(Recipient::parse("12025550123").is_err()); // no plus
        assert!(Recipient::parse("+0123").is_err()); // leading zero
        assert!(Recipient::parse("+1").is_err()); // too short
        assert!(Recipient::parse("+1202555012345678").is_err()); // too long
        assert!(Recipient::parse("+1202-555-0123").is_err()); // punctuation
        assert!(Recipient::parse("").is_err());
    }

    #[test]
    fn subscribe_rejects_duplicates_and_keeps_order() {
        let roster = InMemoryRoster::new();
        let a = Recipient::parse("+12025550001").unwrap();
        let b = Recipient::parse("+12025550002").unwrap();

        assert!(roster.subscribe(a.clone()));
        assert!(roster.subscribe(b.clone()));
        assert!(!roster.subscribe(a.clone()));
        assert_eq!(roster.len(), 2);

        assert!(roster.unsubscribe(&a));
        assert!(!roster.unsubscribe(&a));
        assert_eq!(roster.len(), 1);
    }

    #[tokio::test]
    async fn current_recipients_reflects_mutations() {
        let roster = InMemoryRoster::new();
        roster.subscribe(Recipient::parse("+12025550001").unwrap());
        roster.subscribe(Recipient::parse("+12025550002").unwrap());

        let recipients = roster.current_recipients().await.unwrap();
        assert_eq!(
            recipients.iter().map(Recipient::as_str).collect::<Vec<_>>(),
            vec!["+12025550001", "+12025550002"]
        );
    }
}
