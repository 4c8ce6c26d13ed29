use common_types;

mod form;

#[allow(non_snake_case)]
pub mod Form {
    pub use crate::form::*;
}

#[allow(non_snake_case)]
pub mod Storage {
    use ::std::collections::HashMap;
    use ::std::fs;
    use ::std::io;
    use ::std::path::PathBuf;
    use parking_lot::Mutex;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum StorageError {
        #[error("failed to access storage file: {0}")]
        Io(#[from] io::Error),
        #[error("storage file is not a string map: {0}")]
        Format(#[from] serde_json::Error),
    }

    // Small string map scoped to one client profile, the way a browser's
    // local storage is scoped to one profile
    pub trait KeyValueStorage: Send + Sync {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
        fn remove(&self, key: &str) -> Result<(), StorageError>;
    }

    #[derive(Default, Debug)]
    pub struct MemoryStorage {
        entries: Mutex<HashMap<String, String>>,
    }

    impl MemoryStorage {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl KeyValueStorage for MemoryStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.entries.lock().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.entries.lock().insert(key.to_owned(), value.to_owned());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.entries.lock().remove(key);
            Ok(())
        }
    }

    // JSON object on disk, rewritten whole on every change
    #[derive(Debug)]
    pub struct FileStorage {
        path: PathBuf,
        lock: Mutex<()>,
    }

    impl FileStorage {
        pub fn new<P: Into<PathBuf>>(path: P) -> Self {
            FileStorage {
                path: path.into(),
                lock: Mutex::new(()),
            }
        }

        fn load(&self) -> Result<HashMap<String, String>, StorageError> {
            match fs::read(&self.path) {
                Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
                Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
                Err(err) => Err(err.into()),
            }
        }

        fn store(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&self.path, serde_json::to_vec(entries)?)?;
            Ok(())
        }
    }

    impl KeyValueStorage for FileStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            let _guard = self.lock.lock();
            Ok(self.load()?.remove(key))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let _guard = self.lock.lock();
            let mut entries = self.load()?;
            entries.insert(key.to_owned(), value.to_owned());
            self.store(&entries)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            let _guard = self.lock.lock();
            let mut entries = self.load()?;
            if entries.remove(key).is_some() {
                self.store(&entries)?;
            }
            Ok(())
        }
    }

}

#[allow(non_snake_case)]
pub mod Time {
    use chrono::{DateTime, Utc};

    pub trait Clock: Send + Sync {
        fn now(&self) -> DateTime<Utc>;
    }

    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[allow(non_snake_case)]
pub mod Cooldown {
    use ::std::sync::Arc;
    use chrono::{DateTime, TimeDelta, Utc};
    use crate::Storage::{KeyValueStorage, StorageError};

    pub const LAST_SUBMIT_KEY: &str = "contact_last_submit";
    pub const SUBMIT_COOLDOWN_MS: i64 = 60_000;

    // Advisory only, anything that skips the form skips this too
    pub struct SubmitCooldown {
        storage: Arc<dyn KeyValueStorage>,
        window: TimeDelta,
    }

    impl SubmitCooldown {
        pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
            SubmitCooldown {
                storage,
                window: TimeDelta::milliseconds(SUBMIT_COOLDOWN_MS),
            }
        }

        // Stored as milliseconds since the Unix epoch. Anything unparsable
        // counts as never having submitted
        pub fn last_submit(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
            let Some(raw) = self.storage.get(LAST_SUBMIT_KEY)? else {
                return Ok(None);
            };
            let last = raw.trim().parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
            if last.is_none() {
                tracing::warn!("Ignoring unreadable {LAST_SUBMIT_KEY} value {raw:?}");
            }
            Ok(last)
        }

        pub fn remaining(&self, now: DateTime<Utc>) -> Result<Option<TimeDelta>, StorageError> {
            let Some(last) = self.last_submit()? else {
                return Ok(None);
            };
            let elapsed = now - last;
            if elapsed < self.window {
                return Ok(Some(self.window - elapsed));
            }
            Ok(None)
        }

        pub fn record(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
            self.storage.set(LAST_SUBMIT_KEY, &at.timestamp_millis().to_string())
        }
    }

}

#[allow(non_snake_case)]
pub mod Notification {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum NotificationKind {
        Success,
        Failure,
        RateLimited,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Notification {
        pub kind: NotificationKind,
        pub title: &'static str,
        pub description: &'static str,
    }

    impl Notification {
        pub fn success() -> Self {
            Notification {
                kind: NotificationKind::Success,
                title: "Message sent!",
                description: "Thank you for reaching out. We'll get back to you soon.",
            }
        }

        pub fn failure() -> Self {
            Notification {
                kind: NotificationKind::Failure,
                title: "Failed to send",
                description: "Something went wrong. Please try again later.",
            }
        }

        pub fn rate_limited() -> Self {
            Notification {
                kind: NotificationKind::RateLimited,
                title: "Please wait",
                description: "You can only submit once per minute. Please try again later.",
            }
        }
    }
}
