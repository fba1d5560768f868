//! Core domain types for the petition bot.

pub mod ids;
pub mod petition;

pub use ids::{ChannelId, GuildId, MessageId, RoleId, ThreadId, UserId};
pub use petition::{
    MAX_DESCRIPTION_LEN, MAX_LINK_LEN, MAX_TITLE_LEN, NewPetition, Petition, PetitionRef,
    PetitionStatus,
};
