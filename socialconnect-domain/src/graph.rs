//! Follow relationships between regular users.
//!
//! A follow edge is stored on both ends: `a.following` contains `b` exactly when `b.followers`
//! contains `a`. Private accounts collect follow requests until their owner decides on them.

use crate::identity::IdentityStore;
use socialconnect_common::model::{
    Id,
    user::{Role, User, UserMarker},
};
use thiserror::Error;
use tracing::info;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum GraphError {
    #[error("Users cannot follow themselves")]
    SelfFollow,
    #[error("Admin {0} cannot follow users")]
    AdminCannotFollow(Id<UserMarker>),
    #[error("User {0} cannot be followed")]
    NotFollowable(Id<UserMarker>),
    #[error("User with id {0} was not found.")]
    UserNotFound(Id<UserMarker>),
    #[error("User {0} does not take follow requests")]
    NotRegularUser(Id<UserMarker>),
    #[error("User {owner} has no pending follow request from {requester}")]
    NoPendingRequest {
        owner: Id<UserMarker>,
        requester: Id<UserMarker>,
    },
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// What a call to [`follow`] changed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum FollowOutcome {
    Followed,
    Unfollowed,
    Requested,
    RequestCancelled,
}

/// Toggles the relationship from `requester` to `target`.
///
/// Following someone already followed unfollows them. For private targets a request is filed
/// instead, and repeating the call withdraws it.
pub fn follow(
    users: &mut IdentityStore,
    requester: Id<UserMarker>,
    target: Id<UserMarker>,
) -> Result<FollowOutcome> {
    if requester == target {
        return Err(GraphError::SelfFollow);
    }
    if users
        .get(requester)
        .ok_or(GraphError::UserNotFound(requester))?
        .is_admin()
    {
        return Err(GraphError::AdminCannotFollow(requester));
    }
    if users
        .get(target)
        .ok_or(GraphError::UserNotFound(target))?
        .is_admin()
    {
        return Err(GraphError::NotFollowable(target));
    }

    let (follower, followee) = users
        .pair_mut(requester, target)
        .ok_or(GraphError::UserNotFound(target))?;
    let Role::Regular(profile) = &mut followee.role else {
        return Err(GraphError::NotFollowable(target));
    };

    let outcome = if follower.following.contains(&target) {
        follower.following.remove(&target);
        followee.followers.remove(&requester);
        profile.pending_follow_requests.remove(&requester);
        FollowOutcome::Unfollowed
    } else if profile.private_account {
        if profile.pending_follow_requests.remove(&requester) {
            FollowOutcome::RequestCancelled
        } else {
            profile.pending_follow_requests.insert(requester);
            FollowOutcome::Requested
        }
    } else {
        profile.pending_follow_requests.remove(&requester);
        follower.following.insert(target);
        followee.followers.insert(requester);
        FollowOutcome::Followed
    };

    info!(%requester, %target, ?outcome, "Follow toggled");
    Ok(outcome)
}

pub fn approve_follow_request(
    users: &mut IdentityStore,
    owner: Id<UserMarker>,
    requester: Id<UserMarker>,
) -> Result<()> {
    let (owner_user, requester_user) = pending_pair(users, owner, requester)?;

    if let Role::Regular(profile) = &mut owner_user.role {
        profile.pending_follow_requests.remove(&requester);
    }
    owner_user.followers.insert(requester);
    requester_user.following.insert(owner);

    info!(%owner, %requester, "Approved follow request");
    Ok(())
}

pub fn reject_follow_request(
    users: &mut IdentityStore,
    owner: Id<UserMarker>,
    requester: Id<UserMarker>,
) -> Result<()> {
    let (owner_user, _) = pending_pair(users, owner, requester)?;

    if let Some(profile) = owner_user.as_regular_mut() {
        profile.pending_follow_requests.remove(&requester);
    }

    info!(%owner, %requester, "Rejected follow request");
    Ok(())
}

/// Resolves both ends of a follow request that `owner` is about to decide on.
fn pending_pair(
    users: &mut IdentityStore,
    owner: Id<UserMarker>,
    requester: Id<UserMarker>,
) -> Result<(&mut User, &mut User)> {
    let owner_user = users.get(owner).ok_or(GraphError::UserNotFound(owner))?;
    if owner_user.as_regular().is_none() {
        return Err(GraphError::NotRegularUser(owner));
    }
    if !owner_user.has_pending_request_from(requester) {
        return Err(GraphError::NoPendingRequest { owner, requester });
    }

    users
        .pair_mut(owner, requester)
        .ok_or(GraphError::UserNotFound(requester))
}

#[must_use]
pub fn has_sent_follow_request(
    users: &IdentityStore,
    requester: Id<UserMarker>,
    target: Id<UserMarker>,
) -> bool {
    users
        .get(target)
        .is_some_and(|target| target.has_pending_request_from(requester))
}

/// Whether `viewer` gets posts by `author` in their feed. Admins see everything.
#[must_use]
pub fn sees_posts_of(viewer: &User, author: Id<UserMarker>) -> bool {
    viewer.is_admin() || viewer.id == author || viewer.is_following(author)
}

#[cfg(test)]
mod tests {
    use crate::{
        graph::{
            FollowOutcome, GraphError, approve_follow_request, follow, has_sent_follow_request,
            reject_follow_request, sees_posts_of,
        },
        identity::{IdentityStore, tests::registration},
    };
    use socialconnect_common::{
        model::{
            Id,
            user::{UserMarker, UserType},
        },
        sequence::IdSequence,
    };

    fn setup() -> (IdentityStore, [Id<UserMarker>; 3]) {
        let mut users = IdentityStore::default();
        let mut ids = IdSequence::default();
        let mut register = |name: &str, user_type| {
            users
                .register(
                    &mut ids,
                    registration(name, &format!("{name}@gmail.com"), user_type),
                )
                .unwrap()
                .id
        };
        let ali = register("ali", UserType::Regular);
        let bob = register("bob", UserType::Regular);
        let admin = register("admin", UserType::Admin);
        (users, [ali, bob, admin])
    }

    fn make_private(users: &mut IdentityStore, user: Id<UserMarker>) {
        users
            .get_mut(user)
            .unwrap()
            .as_regular_mut()
            .unwrap()
            .private_account = true;
    }

    fn assert_symmetric(users: &IdentityStore) {
        for user in users.users() {
            for followed in &user.following {
                assert!(users.get(*followed).unwrap().followers.contains(&user.id));
            }
            for follower in &user.followers {
                assert!(users.get(*follower).unwrap().following.contains(&user.id));
            }
        }
    }

    #[test]
    fn public_follow_toggles() {
        let (mut users, [ali, bob, _]) = setup();

        assert_eq!(follow(&mut users, ali, bob), Ok(FollowOutcome::Followed));
        assert!(users.get(ali).unwrap().is_following(bob));
        assert!(users.get(bob).unwrap().followers.contains(&ali));
        assert_symmetric(&users);

        assert_eq!(follow(&mut users, ali, bob), Ok(FollowOutcome::Unfollowed));
        assert!(users.get(ali).unwrap().following.is_empty());
        assert!(users.get(bob).unwrap().followers.is_empty());
    }

    #[test]
    fn private_follow_goes_through_request() {
        let (mut users, [ali, bob, _]) = setup();
        make_private(&mut users, bob);

        assert_eq!(follow(&mut users, ali, bob), Ok(FollowOutcome::Requested));
        assert!(has_sent_follow_request(&users, ali, bob));
        assert!(!users.get(ali).unwrap().is_following(bob));

        approve_follow_request(&mut users, bob, ali).unwrap();
        assert!(users.get(ali).unwrap().is_following(bob));
        assert!(!has_sent_follow_request(&users, ali, bob));
        assert_symmetric(&users);

        assert_eq!(
            approve_follow_request(&mut users, bob, ali),
            Err(GraphError::NoPendingRequest {
                owner: bob,
                requester: ali
            })
        );
    }

    #[test]
    fn repeating_a_request_withdraws_it() {
        let (mut users, [ali, bob, _]) = setup();
        make_private(&mut users, bob);

        follow(&mut users, ali, bob).unwrap();
        assert_eq!(
            follow(&mut users, ali, bob),
            Ok(FollowOutcome::RequestCancelled)
        );
        assert!(!has_sent_follow_request(&users, ali, bob));
    }

    #[test]
    fn rejecting_clears_the_request() {
        let (mut users, [ali, bob, _]) = setup();
        make_private(&mut users, bob);
        follow(&mut users, ali, bob).unwrap();

        reject_follow_request(&mut users, bob, ali).unwrap();

        assert!(!has_sent_follow_request(&users, ali, bob));
        assert!(users.get(bob).unwrap().followers.is_empty());
        assert!(reject_follow_request(&mut users, bob, ali).is_err());
    }

    #[test]
    fn admins_stay_out_of_the_graph() {
        let (mut users, [ali, _, admin]) = setup();

        assert_eq!(
            follow(&mut users, admin, ali),
            Err(GraphError::AdminCannotFollow(admin))
        );
        assert_eq!(
            follow(&mut users, ali, admin),
            Err(GraphError::NotFollowable(admin))
        );
        assert_eq!(
            approve_follow_request(&mut users, admin, ali),
            Err(GraphError::NotRegularUser(admin))
        );
        assert_eq!(follow(&mut users, ali, ali), Err(GraphError::SelfFollow));
        assert_eq!(
            follow(&mut users, ali, Id::new(77)),
            Err(GraphError::UserNotFound(Id::new(77)))
        );
    }

    #[test]
    fn feed_visibility() {
        let (mut users, [ali, bob, admin]) = setup();
        follow(&mut users, ali, bob).unwrap();

        let ali_user = users.get(ali).unwrap();
        assert!(sees_posts_of(ali_user, ali));
        assert!(sees_posts_of(ali_user, bob));
        assert!(!sees_posts_of(users.get(bob).unwrap(), ali));
        assert!(sees_posts_of(users.get(admin).unwrap(), ali));
    }
}
