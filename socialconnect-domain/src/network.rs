//! The entry point into the domain.
//!
//! [`SocialNetwork`] owns every store and the current session. Each successful mutation is
//! written through to disk before the call returns; a failed save is logged and does not fail the
//! mutation.

use crate::{
    content::{ContentError, ContentStore},
    graph::{self, FollowOutcome, GraphError},
    identity::{IdentityError, IdentityStore, ProfileChanges, Registration},
    moderation::{self, ModerationError, ModerationStore},
    seed::seed_sample_users,
};
use socialconnect_common::{
    model::{
        Id, ModelValidationError,
        moderation::{CommentReport, ReportMarker, VerificationRequest},
        non_blank,
        post::{Comment, CommentMarker, Post, PostMarker},
        user::{Age, User, UserMarker, UserType},
    },
    sequence::IdCounters,
};
use socialconnect_store::{Snapshot, SnapshotRef, StoreClient, StoreError};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum Error {
    #[error("No user is logged in")]
    NotLoggedIn,
    #[error("User {0} is not an admin")]
    AdminRequired(Id<UserMarker>),
    #[error("User {0} is not a regular user")]
    RegularUserRequired(Id<UserMarker>),
    #[error(transparent)]
    Invalid(#[from] ModelValidationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Moderation(#[from] ModerationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Whether an installation without users gets the sample accounts.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum Seeding {
    #[default]
    SampleUsers,
    Disabled,
}

#[derive(Debug)]
pub struct SocialNetwork {
    store: StoreClient,
    identity: IdentityStore,
    content: ContentStore,
    moderation: ModerationStore,
    counters: IdCounters,
    current_user: Option<Id<UserMarker>>,
}

impl SocialNetwork {
    /// Loads the persisted state. State without any users is discarded and, depending on
    /// `seeding`, replaced by the sample accounts.
    pub fn open(store: StoreClient, seeding: Seeding) -> Self {
        let mut snapshot = store.load();
        if snapshot.users.is_empty() {
            info!("No stored users, starting from an empty network");
            snapshot = Snapshot::default();
        }

        let mut network = Self {
            store,
            identity: IdentityStore::new(snapshot.users),
            content: ContentStore::new(snapshot.posts),
            moderation: ModerationStore::new(
                snapshot.verification_requests,
                snapshot.comment_reports,
            ),
            counters: snapshot.counters,
            current_user: None,
        };

        let mut dirty = network.reconcile_counters();
        dirty |= network.identity.migrate_legacy_passwords() > 0;
        if network.identity.is_empty() && seeding == Seeding::SampleUsers {
            match seed_sample_users(&mut network.identity, &mut network.counters.users) {
                Ok(seeded) => dirty |= seeded > 0,
                Err(err) => error!(error = %err, "Seeding sample users failed"),
            }
        }
        if dirty {
            network.persist();
        }

        network
    }

    /// Moves every counter past the largest id in use. Returns whether anything changed.
    fn reconcile_counters(&mut self) -> bool {
        let posts = self.content.posts();
        let in_use = [
            self.identity.users().iter().map(|user| user.id.get()).max(),
            posts.iter().map(|post| post.id.get()).max(),
            posts
                .iter()
                .flat_map(|post| &post.comments)
                .map(|comment| comment.id.get())
                .max(),
            self.moderation
                .comment_reports()
                .iter()
                .map(|report| report.id.get())
                .max(),
        ];

        let stored = self.counters.as_array();
        let mut next = stored;
        for (counter, max) in next.iter_mut().zip(in_use) {
            if let Some(max) = max {
                *counter = (*counter).max(max.saturating_add(1));
            }
        }
        if next == stored {
            return false;
        }

        warn!(?stored, ?next, "Id counters were behind the stored data");
        self.counters = IdCounters::from_array(next);
        true
    }

    fn snapshot(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            users: self.identity.users(),
            posts: self.content.posts(),
            counters: &self.counters,
            verification_requests: self.moderation.verification_requests(),
            comment_reports: self.moderation.comment_reports(),
        }
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(self.snapshot()) {
            error!(error = %err, "Persisting the network failed");
        }
    }

    /// Writes the whole state to disk. Hosts call this before shutting down.
    pub fn force_save(&self) -> Result<(), StoreError> {
        self.store.save(self.snapshot())
    }

    fn session_id(&self) -> Result<Id<UserMarker>> {
        self.current_user.ok_or(Error::NotLoggedIn)
    }

    fn admin_session(&self) -> Result<Id<UserMarker>> {
        let user = self.current_user().ok_or(Error::NotLoggedIn)?;
        if user.is_admin() {
            Ok(user.id)
        } else {
            Err(Error::AdminRequired(user.id))
        }
    }

    fn session_user_mut(&mut self) -> Result<&mut User> {
        let id = self.session_id()?;
        self.identity.get_mut(id).ok_or(Error::NotLoggedIn)
    }

    // Session

    /// Creates an account without logging into it.
    pub fn register(&mut self, registration: Registration) -> Result<User> {
        let user = self
            .identity
            .register(&mut self.counters.users, registration)?
            .clone();
        self.persist();
        Ok(user)
    }

    /// Creates an administrator account. Only a logged-in administrator may do this.
    pub fn register_admin(&mut self, mut registration: Registration) -> Result<User> {
        self.admin_session()?;
        registration.user_type = UserType::Admin;
        self.register(registration)
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<User> {
        let user = self.identity.authenticate(username, password)?.clone();
        self.current_user = Some(user.id);
        info!(user = %user.id, "Logged in");
        Ok(user)
    }

    /// Whether a login for `username` is refused because of a ban.
    #[must_use]
    pub fn is_login_banned(&self, username: &str) -> bool {
        self.identity.is_login_banned(username)
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.current_user.take() {
            info!(%user, "Logged out");
        }
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.and_then(|id| self.identity.get(id))
    }

    // Lookups

    #[must_use]
    pub fn user(&self, id: Id<UserMarker>) -> Option<&User> {
        self.identity.get(id)
    }

    #[must_use]
    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.identity.by_username(username)
    }

    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.identity.by_email(email)
    }

    #[must_use]
    pub fn is_email_taken(&self, email: &str) -> bool {
        self.identity.is_email_taken(email)
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.identity.len()
    }

    #[must_use]
    pub fn all_users(&self) -> &[User] {
        self.identity.users()
    }

    #[must_use]
    pub fn search_users(&self, query: &str) -> Vec<&User> {
        self.identity.search(query)
    }

    // Profile

    pub fn set_full_name(&mut self, full_name: String) -> Result<()> {
        let full_name = non_blank(full_name)?.trim().to_owned();
        self.session_user_mut()?.full_name = full_name;
        self.persist();
        Ok(())
    }

    pub fn set_bio(&mut self, bio: String) -> Result<()> {
        self.session_user_mut()?.bio = bio;
        self.persist();
        Ok(())
    }

    pub fn set_email(&mut self, email: String) -> Result<()> {
        let user = self.session_id()?;
        self.identity.change_email(user, email)?;
        self.persist();
        Ok(())
    }

    pub fn set_age(&mut self, age: u32) -> Result<()> {
        let age = Age::new(age).map_err(ModelValidationError::from)?;
        self.session_user_mut()?.age = age;
        self.persist();
        Ok(())
    }

    pub fn set_password(&mut self, password: String) -> Result<()> {
        let user = self.session_id()?;
        self.identity.change_password(user, password)?;
        self.persist();
        Ok(())
    }

    pub fn set_private_account(&mut self, private_account: bool) -> Result<()> {
        let user = self.session_user_mut()?;
        let id = user.id;
        user.as_regular_mut()
            .ok_or(Error::RegularUserRequired(id))?
            .private_account = private_account;
        self.persist();
        Ok(())
    }

    /// Applies all `changes` to the session user, or none of them if any is rejected.
    pub fn update_profile(&mut self, changes: ProfileChanges) -> Result<()> {
        let id = self.session_id()?;
        let user = self.identity.get(id).ok_or(Error::NotLoggedIn)?;
        if changes.private_account.is_some() && user.as_regular().is_none() {
            return Err(Error::RegularUserRequired(id));
        }

        self.identity.update_profile(id, changes)?;
        self.persist();
        info!(user = %id, "Updated profile");
        Ok(())
    }

    /// `None` removes the photo.
    pub fn set_profile_photo(&mut self, path: Option<String>) -> Result<()> {
        self.session_user_mut()?.profile_photo = path.filter(|path| !path.trim().is_empty());
        self.persist();
        Ok(())
    }

    // Content

    pub fn create_text_post(&mut self, body: String) -> Result<Post> {
        let author = self.session_id()?;
        let author = self
            .identity
            .get_mut(author)
            .ok_or(Error::NotLoggedIn)?;
        let post = self
            .content
            .create_text_post(&mut self.counters.posts, author, body)?
            .clone();
        self.persist();
        Ok(post)
    }

    pub fn create_image_post(&mut self, path: String, caption: Option<String>) -> Result<Post> {
        let author = self.session_id()?;
        let author = self
            .identity
            .get_mut(author)
            .ok_or(Error::NotLoggedIn)?;
        let post = self
            .content
            .create_image_post(&mut self.counters.posts, author, path, caption)?
            .clone();
        self.persist();
        Ok(post)
    }

    /// Authors delete their own posts; admins delete any post.
    pub fn delete_post(&mut self, post: Id<PostMarker>) -> Result<()> {
        let requester = self.session_id()?;
        self.content
            .delete_post(&mut self.identity, post, requester)?;
        self.persist();
        Ok(())
    }

    /// Returns whether the session user likes the post afterwards.
    pub fn toggle_like(&mut self, post: Id<PostMarker>) -> Result<bool> {
        let user = self.session_id()?;
        let liked = self.content.toggle_like(post, user)?;
        self.persist();
        Ok(liked)
    }

    pub fn toggle_comment_like(
        &mut self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> Result<bool> {
        let user = self.session_id()?;
        let liked = self.content.toggle_comment_like(post, comment, user)?;
        self.persist();
        Ok(liked)
    }

    pub fn add_comment(&mut self, post: Id<PostMarker>, content: String) -> Result<Comment> {
        let author = self.session_id()?;
        let author = self.identity.get(author).ok_or(Error::NotLoggedIn)?;
        let comment = self
            .content
            .add_comment(&mut self.counters.comments, post, author, content)?
            .clone();
        self.persist();
        Ok(comment)
    }

    #[must_use]
    pub fn post(&self, post: Id<PostMarker>) -> Option<&Post> {
        self.content.get(post)
    }

    #[must_use]
    pub fn all_posts(&self) -> Vec<&Post> {
        self.content.newest_first()
    }

    #[must_use]
    pub fn posts_by_user(&self, user: Id<UserMarker>) -> Vec<&Post> {
        self.content.by_author(user)
    }

    /// Posts visible to the session user, newest first.
    pub fn feed(&self) -> Result<Vec<&Post>> {
        let viewer = self.current_user().ok_or(Error::NotLoggedIn)?;
        Ok(self
            .content
            .newest_first_where(|post| graph::sees_posts_of(viewer, post.author.id)))
    }

    #[must_use]
    pub fn is_post_liked_by_current_user(&self, post: Id<PostMarker>) -> bool {
        self.current_user.is_some_and(|user| {
            self.content
                .get(post)
                .is_some_and(|post| post.is_liked_by(user))
        })
    }

    // Social graph

    pub fn follow(&mut self, target: Id<UserMarker>) -> Result<FollowOutcome> {
        let requester = self.session_id()?;
        let outcome = graph::follow(&mut self.identity, requester, target)?;
        self.persist();
        Ok(outcome)
    }

    pub fn approve_follow_request(&mut self, requester: Id<UserMarker>) -> Result<()> {
        let owner = self.session_id()?;
        graph::approve_follow_request(&mut self.identity, owner, requester)?;
        self.persist();
        Ok(())
    }

    pub fn reject_follow_request(&mut self, requester: Id<UserMarker>) -> Result<()> {
        let owner = self.session_id()?;
        graph::reject_follow_request(&mut self.identity, owner, requester)?;
        self.persist();
        Ok(())
    }

    #[must_use]
    pub fn is_following(&self, target: Id<UserMarker>) -> bool {
        self.current_user()
            .is_some_and(|user| user.is_following(target))
    }

    #[must_use]
    pub fn has_sent_follow_request(&self, target: Id<UserMarker>) -> bool {
        self.current_user.is_some_and(|requester| {
            graph::has_sent_follow_request(&self.identity, requester, target)
        })
    }

    /// Users waiting for the session user to decide on their follow request.
    pub fn pending_follow_requests(&self) -> Result<Vec<&User>> {
        let owner = self.current_user().ok_or(Error::NotLoggedIn)?;
        Ok(owner
            .as_regular()
            .map(|profile| {
                profile
                    .pending_follow_requests
                    .iter()
                    .filter_map(|requester| self.identity.get(*requester))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default())
    }

    pub fn pending_follow_request_count(&self) -> Result<usize> {
        Ok(self.pending_follow_requests()?.len())
    }

    // Moderation

    pub fn request_verification(&mut self, evidence_path: String) -> Result<VerificationRequest> {
        let user = self.session_id()?;
        let user = self.identity.get(user).ok_or(Error::NotLoggedIn)?;
        let request = self
            .moderation
            .request_verification(user, evidence_path)?
            .clone();
        self.persist();
        Ok(request)
    }

    #[must_use]
    pub fn has_pending_verification_request(&self, user: Id<UserMarker>) -> bool {
        self.moderation.has_pending_verification(user)
    }

    pub fn pending_verification_requests(&self) -> Result<Vec<&VerificationRequest>> {
        self.admin_session()?;
        Ok(self.moderation.pending_verification_requests())
    }

    pub fn verify_user(&mut self, target: Id<UserMarker>) -> Result<()> {
        let admin = self.admin_session()?;
        self.moderation
            .verify_user(&mut self.identity, admin, target)?;
        self.persist();
        Ok(())
    }

    pub fn unverify_user(&mut self, target: Id<UserMarker>) -> Result<()> {
        let admin = self.admin_session()?;
        moderation::unverify_user(&mut self.identity, admin, target)?;
        self.persist();
        Ok(())
    }

    pub fn reject_verification_request(&mut self, target: Id<UserMarker>) -> Result<()> {
        let admin = self.admin_session()?;
        self.moderation
            .reject_verification_request(&self.identity, admin, target)?;
        self.persist();
        Ok(())
    }

    pub fn ban_user(&mut self, target: Id<UserMarker>) -> Result<()> {
        let admin = self.admin_session()?;
        moderation::ban_user(&mut self.identity, admin, target)?;
        self.persist();
        Ok(())
    }

    pub fn unban_user(&mut self, target: Id<UserMarker>) -> Result<()> {
        let admin = self.admin_session()?;
        moderation::unban_user(&mut self.identity, admin, target)?;
        self.persist();
        Ok(())
    }

    /// Whether any admin has banned `user`.
    #[must_use]
    pub fn is_user_banned(&self, user: Id<UserMarker>) -> bool {
        self.identity.is_banned(user)
    }

    pub fn report_comment(
        &mut self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        reason: &str,
    ) -> Result<CommentReport> {
        let reporter = self.session_id()?;
        let reporter = self.identity.get(reporter).ok_or(Error::NotLoggedIn)?;
        let report = self
            .moderation
            .report_comment(
                &mut self.counters.reports,
                &self.content,
                reporter,
                post,
                comment,
                reason,
            )?
            .clone();
        self.persist();
        Ok(report)
    }

    pub fn unresolved_reports(&self) -> Result<Vec<&CommentReport>> {
        self.admin_session()?;
        Ok(self.moderation.unresolved_reports())
    }

    pub fn unresolved_report_count(&self) -> Result<usize> {
        self.admin_session()?;
        Ok(self.moderation.unresolved_report_count())
    }

    pub fn resolve_report(&mut self, report: Id<ReportMarker>) -> Result<()> {
        let admin = self.admin_session()?;
        self.moderation
            .resolve_report(&self.identity, admin, report)?;
        self.persist();
        Ok(())
    }

    pub fn delete_reported_comment(
        &mut self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> Result<()> {
        let admin = self.admin_session()?;
        self.moderation.delete_reported_comment(
            &self.identity,
            &mut self.content,
            admin,
            post,
            comment,
        )?;
        self.persist();
        Ok(())
    }
}
