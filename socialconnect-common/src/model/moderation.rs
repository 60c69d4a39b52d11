use crate::{
    model::{
        Id,
        post::{CommentMarker, PostMarker, UserSnapshot},
        user::UserMarker,
    },
    util::Timestamp,
};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ReportMarker;

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct VerificationRequest {
    pub user: UserSnapshot,
    /// Location of the evidence the user submitted.
    pub evidence_path: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub resolved: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct CommentReport {
    pub id: Id<ReportMarker>,
    pub comment_id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub reporter: UserSnapshot,
    pub comment_author: UserSnapshot,
    /// The comment text at the time of the report.
    pub comment_content: String,
    pub reason: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub resolved: bool,
}

impl VerificationRequest {
    #[must_use]
    pub fn is_pending_for(&self, user: Id<UserMarker>) -> bool {
        self.user.id == user && !self.resolved
    }
}

impl CommentReport {
    #[must_use]
    pub fn is_pending_from(&self, reporter: Id<UserMarker>, comment: Id<CommentMarker>) -> bool {
        self.reporter.id == reporter && self.comment_id == comment && !self.resolved
    }
}
