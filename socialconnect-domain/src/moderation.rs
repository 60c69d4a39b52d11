use crate::{content::ContentStore, identity::IdentityStore};
use socialconnect_common::{
    model::{
        Id, ModelValidationError,
        moderation::{CommentReport, ReportMarker, VerificationRequest},
        non_blank,
        post::{CommentMarker, PostMarker, UserSnapshot},
        user::{User, UserMarker},
    },
    sequence::IdSequence,
    util::Timestamp,
};
use thiserror::Error;
use tracing::info;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ModerationError {
    #[error(transparent)]
    Invalid(#[from] ModelValidationError),
    #[error("User with id {0} was not found.")]
    UserNotFound(Id<UserMarker>),
    #[error("User {0} is not an admin")]
    NotAdmin(Id<UserMarker>),
    #[error("User {0} is not a regular user")]
    NotRegularUser(Id<UserMarker>),
    #[error("User {0} already has a pending verification request")]
    VerificationAlreadyPending(Id<UserMarker>),
    #[error("User {0} has no pending verification request")]
    NoPendingVerification(Id<UserMarker>),
    #[error("Admin {0} cannot be banned")]
    CannotBanAdmin(Id<UserMarker>),
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment with id {comment} was not found on post {post}.")]
    CommentNotFound {
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    },
    #[error("Users cannot report their own comments")]
    OwnComment,
    #[error("Comment {comment} already has a pending report from {reporter}")]
    AlreadyReported {
        reporter: Id<UserMarker>,
        comment: Id<CommentMarker>,
    },
    #[error("Report with id {0} was not found.")]
    ReportNotFound(Id<ReportMarker>),
}

pub type Result<T, E = ModerationError> = std::result::Result<T, E>;

/// Verification requests and comment reports, in filing order.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ModerationStore {
    verification_requests: Vec<VerificationRequest>,
    comment_reports: Vec<CommentReport>,
}

fn require_admin(users: &IdentityStore, admin: Id<UserMarker>) -> Result<&User> {
    let user = users.get(admin).ok_or(ModerationError::UserNotFound(admin))?;
    if user.is_admin() {
        Ok(user)
    } else {
        Err(ModerationError::NotAdmin(admin))
    }
}

fn require_regular(users: &mut IdentityStore, target: Id<UserMarker>) -> Result<&mut User> {
    let user = users
        .get_mut(target)
        .ok_or(ModerationError::UserNotFound(target))?;
    if user.as_regular().is_some() {
        Ok(user)
    } else {
        Err(ModerationError::NotRegularUser(target))
    }
}

impl ModerationStore {
    #[must_use]
    pub fn new(
        verification_requests: Vec<VerificationRequest>,
        comment_reports: Vec<CommentReport>,
    ) -> Self {
        Self {
            verification_requests,
            comment_reports,
        }
    }

    #[must_use]
    pub fn verification_requests(&self) -> &[VerificationRequest] {
        &self.verification_requests
    }

    #[must_use]
    pub fn comment_reports(&self) -> &[CommentReport] {
        &self.comment_reports
    }

    pub fn request_verification(
        &mut self,
        user: &User,
        evidence_path: String,
    ) -> Result<&VerificationRequest> {
        if user.as_regular().is_none() {
            return Err(ModerationError::NotRegularUser(user.id));
        }
        if self.has_pending_verification(user.id) {
            return Err(ModerationError::VerificationAlreadyPending(user.id));
        }
        let evidence_path = non_blank(evidence_path)?;

        self.verification_requests.push(VerificationRequest {
            user: UserSnapshot::of(user),
            evidence_path,
            created_at: Timestamp::now(),
            resolved: false,
        });
        info!(user = %user.id, "Filed verification request");

        let index = self.verification_requests.len() - 1;
        Ok(&self.verification_requests[index])
    }

    #[must_use]
    pub fn has_pending_verification(&self, user: Id<UserMarker>) -> bool {
        self.verification_requests
            .iter()
            .any(|request| request.is_pending_for(user))
    }

    /// Unresolved requests, newest first.
    #[must_use]
    pub fn pending_verification_requests(&self) -> Vec<&VerificationRequest> {
        let mut pending: Vec<_> = self
            .verification_requests
            .iter()
            .filter(|request| !request.resolved)
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pending
    }

    /// Sets the verified flag and resolves every request the target ever filed.
    pub fn verify_user(
        &mut self,
        users: &mut IdentityStore,
        admin: Id<UserMarker>,
        target: Id<UserMarker>,
    ) -> Result<()> {
        require_admin(users, admin)?;
        if let Some(profile) = require_regular(users, target)?.as_regular_mut() {
            profile.verified = true;
        }

        for request in &mut self.verification_requests {
            if request.user.id == target {
                request.resolved = true;
            }
        }

        info!(%admin, %target, "Verified user");
        Ok(())
    }

    pub fn reject_verification_request(
        &mut self,
        users: &IdentityStore,
        admin: Id<UserMarker>,
        target: Id<UserMarker>,
    ) -> Result<()> {
        require_admin(users, admin)?;

        let mut found = false;
        for request in &mut self.verification_requests {
            if request.is_pending_for(target) {
                request.resolved = true;
                found = true;
            }
        }
        if !found {
            return Err(ModerationError::NoPendingVerification(target));
        }

        info!(%admin, %target, "Rejected verification request");
        Ok(())
    }

    pub fn report_comment(
        &mut self,
        ids: &mut IdSequence<ReportMarker>,
        content: &ContentStore,
        reporter: &User,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        reason: &str,
    ) -> Result<&CommentReport> {
        let reason = non_blank(reason.trim().to_owned())?;
        let reported = content
            .get(post)
            .ok_or(ModerationError::PostNotFound(post))?
            .comment(comment)
            .ok_or(ModerationError::CommentNotFound { post, comment })?;

        if reported.author.id == reporter.id {
            return Err(ModerationError::OwnComment);
        }
        if self
            .comment_reports
            .iter()
            .any(|report| report.is_pending_from(reporter.id, comment))
        {
            return Err(ModerationError::AlreadyReported {
                reporter: reporter.id,
                comment,
            });
        }

        let report = CommentReport {
            id: ids.generate(),
            comment_id: comment,
            post_id: post,
            reporter: UserSnapshot::of(reporter),
            comment_author: reported.author.clone(),
            comment_content: reported.content.clone(),
            reason,
            created_at: Timestamp::now(),
            resolved: false,
        };
        info!(report = %report.id, %comment, reporter = %reporter.id, "Reported comment");

        self.comment_reports.push(report);
        let index = self.comment_reports.len() - 1;
        Ok(&self.comment_reports[index])
    }

    /// Unresolved reports, newest first.
    #[must_use]
    pub fn unresolved_reports(&self) -> Vec<&CommentReport> {
        let mut unresolved: Vec<_> = self
            .comment_reports
            .iter()
            .filter(|report| !report.resolved)
            .collect();
        unresolved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        unresolved
    }

    #[must_use]
    pub fn unresolved_report_count(&self) -> usize {
        self.comment_reports
            .iter()
            .filter(|report| !report.resolved)
            .count()
    }

    pub fn resolve_report(
        &mut self,
        users: &IdentityStore,
        admin: Id<UserMarker>,
        report: Id<ReportMarker>,
    ) -> Result<()> {
        require_admin(users, admin)?;

        self.comment_reports
            .iter_mut()
            .find(|r| r.id == report)
            .ok_or(ModerationError::ReportNotFound(report))?
            .resolved = true;

        info!(%admin, %report, "Resolved report");
        Ok(())
    }

    /// Removes the comment and resolves every report against it. Nothing is resolved when the
    /// comment could not be removed.
    pub fn delete_reported_comment(
        &mut self,
        users: &IdentityStore,
        content: &mut ContentStore,
        admin: Id<UserMarker>,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> Result<()> {
        require_admin(users, admin)?;
        if content.get(post).is_none() {
            return Err(ModerationError::PostNotFound(post));
        }
        content
            .remove_comment(post, comment)
            .map_err(|_| ModerationError::CommentNotFound { post, comment })?;

        for report in &mut self.comment_reports {
            if report.comment_id == comment {
                report.resolved = true;
            }
        }

        info!(%admin, %post, %comment, "Deleted reported comment");
        Ok(())
    }
}

pub fn unverify_user(
    users: &mut IdentityStore,
    admin: Id<UserMarker>,
    target: Id<UserMarker>,
) -> Result<()> {
    require_admin(users, admin)?;
    if let Some(profile) = require_regular(users, target)?.as_regular_mut() {
        profile.verified = false;
    }

    info!(%admin, %target, "Unverified user");
    Ok(())
}

/// Adds `target` to `admin`'s own ban list.
pub fn ban_user(
    users: &mut IdentityStore,
    admin: Id<UserMarker>,
    target: Id<UserMarker>,
) -> Result<()> {
    require_admin(users, admin)?;
    if users
        .get(target)
        .ok_or(ModerationError::UserNotFound(target))?
        .is_admin()
    {
        return Err(ModerationError::CannotBanAdmin(target));
    }

    if let Some(profile) = users.get_mut(admin).and_then(User::as_admin_mut) {
        profile.banned_users.insert(target);
    }

    info!(%admin, %target, "Banned user");
    Ok(())
}

/// Removes `target` from `admin`'s own ban list. Other admins' bans stay in force.
pub fn unban_user(
    users: &mut IdentityStore,
    admin: Id<UserMarker>,
    target: Id<UserMarker>,
) -> Result<()> {
    require_admin(users, admin)?;

    if let Some(profile) = users.get_mut(admin).and_then(User::as_admin_mut) {
        profile.banned_users.remove(&target);
    }

    info!(%admin, %target, "Unbanned user");
    Ok(())
}
