//! The social network domain: accounts, posts, the follow graph and moderation, tied together by
//! the [`SocialNetwork`] facade.

pub mod content;
pub mod graph;
pub mod identity;
pub mod moderation;
pub mod network;
pub mod seed;

pub use network::{Error, Seeding, SocialNetwork};
