//! Monotonic id sequences.
//!
//! Every entity kind draws ids from its own counter. The counters are part of the persisted
//! state so that ids are never reused across restarts.

use crate::model::{
    Id,
    moderation::ReportMarker,
    post::{CommentMarker, PostMarker},
    user::UserMarker,
};
use derive_where::derive_where;
use std::marker::PhantomData;

/// Value every counter starts from, and the value a missing counter is assumed to hold.
pub const FIRST_ID: u64 = 1;

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct IdSequence<Marker> {
    next: u64,
    phantom_data: PhantomData<Marker>,
}

impl<Marker> IdSequence<Marker> {
    #[must_use]
    pub fn starting_at(next: u64) -> Self {
        Self {
            next,
            phantom_data: PhantomData,
        }
    }

    /// The id the next call to [`IdSequence::generate`] will hand out.
    #[must_use]
    pub fn peek(self) -> u64 {
        self.next
    }

    pub fn generate(&mut self) -> Id<Marker> {
        let id = Id::new(self.next);
        self.next += 1;
        id
    }
}

impl<Marker> Default for IdSequence<Marker> {
    fn default() -> Self {
        Self::starting_at(FIRST_ID)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct IdCounters {
    pub users: IdSequence<UserMarker>,
    pub posts: IdSequence<PostMarker>,
    pub comments: IdSequence<CommentMarker>,
    pub reports: IdSequence<ReportMarker>,
}

impl IdCounters {
    #[must_use]
    pub fn as_array(&self) -> [u64; 4] {
        [
            self.users.peek(),
            self.posts.peek(),
            self.comments.peek(),
            self.reports.peek(),
        ]
    }

    #[must_use]
    pub fn from_array([users, posts, comments, reports]: [u64; 4]) -> Self {
        Self {
            users: IdSequence::starting_at(users),
            posts: IdSequence::starting_at(posts),
            comments: IdSequence::starting_at(comments),
            reports: IdSequence::starting_at(reports),
        }
    }
}
