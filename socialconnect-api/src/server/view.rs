//! Response bodies that differ from the stored models.

use serde::Serialize;
use socialconnect_common::model::{
    Id,
    post::PostMarker,
    user::{User, UserMarker, UserType},
};
use socialconnect_domain::graph::FollowOutcome;
use std::collections::BTreeSet;

/// A user as shown to clients. The password digest and ban lists stay on the server, and the
/// email address is only shown to its owner.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct UserView {
    pub id: Id<UserMarker>,
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub age: u8,
    pub bio: String,
    pub profile_photo: Option<String>,
    pub user_type: UserType,
    pub verified: bool,
    pub private_account: bool,
    pub followers: BTreeSet<Id<UserMarker>>,
    pub following: BTreeSet<Id<UserMarker>>,
    pub posts: Vec<Id<PostMarker>>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.get().to_owned(),
            full_name: user.full_name.clone(),
            email: None,
            age: user.age.get(),
            bio: user.bio.clone(),
            profile_photo: user.profile_photo.clone(),
            user_type: user.user_type(),
            verified: user.is_verified(),
            private_account: user.is_private_account(),
            followers: user.followers.clone(),
            following: user.following.clone(),
            posts: user.posts.clone(),
        }
    }
}

impl UserView {
    /// The view of the session user's own account, including the email address.
    #[must_use]
    pub fn own(user: &User) -> Self {
        Self {
            email: Some(user.email.get().to_owned()),
            ..Self::from(user)
        }
    }
}

pub fn users<'a>(users: impl IntoIterator<Item = &'a User>) -> Vec<UserView> {
    users.into_iter().map(UserView::from).collect()
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct SessionView {
    pub user: Option<UserView>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
    Following,
    NotFollowing,
    Requested,
}

impl From<FollowOutcome> for FollowState {
    fn from(outcome: FollowOutcome) -> Self {
        match outcome {
            FollowOutcome::Followed => FollowState::Following,
            FollowOutcome::Unfollowed | FollowOutcome::RequestCancelled => {
                FollowState::NotFollowing
            }
            FollowOutcome::Requested => FollowState::Requested,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub struct FollowResponse {
    pub state: FollowState,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub struct LikeSummary {
    pub liked: bool,
    pub count: usize,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}
