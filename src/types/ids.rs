//! Newtype wrappers for Discord snowflake identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! ChannelId where a MessageId is expected) and make the code more
//! self-documenting. Discord serializes snowflakes as decimal strings on the
//! wire; these newtypes hold the parsed `u64` form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! snowflake {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                $name(n)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map($name)
            }
        }
    };
}

snowflake! {
    /// A Discord channel ID.
    ChannelId
}

snowflake! {
    /// A Discord message ID. Petitions are keyed by the ID of their anchor message.
    MessageId
}

snowflake! {
    /// A Discord user ID.
    UserId
}

snowflake! {
    /// A Discord thread ID (threads are channels, but keeping the types apart
    /// catches bugs where a discussion thread is used as the petitions channel).
    ThreadId
}

snowflake! {
    /// A Discord role ID.
    RoleId
}

snowflake! {
    /// A Discord guild (server) ID.
    GuildId
}

impl ThreadId {
    /// Returns the thread as a channel, for sending messages into it.
    pub fn as_channel(self) -> ChannelId {
        ChannelId(self.0)
    }
}
