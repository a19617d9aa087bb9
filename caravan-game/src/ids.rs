//! Identifier newtypes and the random source that mints them.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use uuid::{Builder, Uuid};

/// Unique id of a live caravan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaravanId(Uuid);

/// Unique id of a single guard enlistment (a player may enlist more than once over time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuardId(Uuid);

macro_rules! uuid_newtype {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_newtype!(CaravanId);
uuid_newtype!(GuardId);

/// Player identity supplied by the external identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Mints version-4 UUIDs from a ChaCha stream.
///
/// Seeded sources produce the same id sequence on every run, which keeps
/// simulations and tests reproducible.
#[derive(Debug)]
pub struct IdSource {
    rng: Mutex<ChaCha8Rng>,
}

impl IdSource {
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    fn next_uuid(&self) -> Uuid {
        let bytes: [u8; 16] = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .r#gen();
        Builder::from_random_bytes(bytes).into_uuid()
    }

    #[must_use]
    pub fn caravan_id(&self) -> CaravanId {
        CaravanId(self.next_uuid())
    }

    #[must_use]
    pub fn guard_id(&self) -> GuardId {
        GuardId(self.next_uuid())
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}
