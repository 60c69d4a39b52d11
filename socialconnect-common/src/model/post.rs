use crate::{
    model::{
        Id,
        user::{User, UserMarker},
    },
    util::Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// Identity of a user as it was when something was written. Not kept in sync with
/// later profile edits.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct UserSnapshot {
    pub id: Id<UserMarker>,
    pub username: String,
    pub full_name: String,
}

impl UserSnapshot {
    #[must_use]
    pub fn of(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.get().to_owned(),
            full_name: user.full_name.clone(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: UserSnapshot,
    pub created_at: Timestamp,
    pub content: PostContent,
    #[serde(default)]
    pub liked_by: BTreeSet<Id<UserMarker>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostContent {
    Text {
        body: String,
    },
    Image {
        path: String,
        caption: Option<String>,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Text,
    Image,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub author: UserSnapshot,
    pub content: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub liked_by: BTreeSet<Id<UserMarker>>,
}

impl Post {
    #[must_use]
    pub fn new(id: Id<PostMarker>, author: &User, content: PostContent) -> Self {
        Self {
            id,
            author: UserSnapshot::of(author),
            created_at: Timestamp::now(),
            content,
            liked_by: BTreeSet::new(),
            comments: Vec::new(),
        }
    }

    #[must_use]
    pub fn post_type(&self) -> PostType {
        self.content.post_type()
    }

    #[must_use]
    pub fn is_liked_by(&self, user: Id<UserMarker>) -> bool {
        self.liked_by.contains(&user)
    }

    /// Likes the post if `user` has not, unlikes it otherwise. Returns whether the post is
    /// liked by `user` afterwards.
    pub fn toggle_like(&mut self, user: Id<UserMarker>) -> bool {
        toggle(&mut self.liked_by, user)
    }

    #[must_use]
    pub fn like_count(&self) -> usize {
        self.liked_by.len()
    }

    #[must_use]
    pub fn comment(&self, comment: Id<CommentMarker>) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment)
    }

    pub fn comment_mut(&mut self, comment: Id<CommentMarker>) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment)
    }

    /// Returns whether a comment was removed.
    pub fn remove_comment(&mut self, comment: Id<CommentMarker>) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| c.id != comment);
        self.comments.len() != before
    }

    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

impl PostContent {
    #[must_use]
    pub fn post_type(&self) -> PostType {
        match self {
            PostContent::Text { .. } => PostType::Text,
            PostContent::Image { .. } => PostType::Image,
        }
    }

    /// The body of a text post or the image path of an image post.
    #[must_use]
    pub fn primary(&self) -> &str {
        match self {
            PostContent::Text { body } => body,
            PostContent::Image { path, .. } => path,
        }
    }

    #[must_use]
    pub fn has_caption(&self) -> bool {
        matches!(self, PostContent::Image { caption: Some(caption), .. } if !caption.trim().is_empty())
    }

    /// Last segment of an image path, accepting both `/` and `\` as separators.
    #[must_use]
    pub fn image_file_name(&self) -> Option<&str> {
        match self {
            PostContent::Image { path, .. } if !path.is_empty() => {
                path.rsplit(['/', '\\']).find(|segment| !segment.is_empty())
            }
            _ => None,
        }
    }
}

impl Comment {
    #[must_use]
    pub fn new(
        id: Id<CommentMarker>,
        post_id: Id<PostMarker>,
        author: &User,
        content: String,
    ) -> Self {
        Self {
            id,
            post_id,
            author: UserSnapshot::of(author),
            content,
            created_at: Timestamp::now(),
            liked_by: BTreeSet::new(),
        }
    }

    pub fn toggle_like(&mut self, user: Id<UserMarker>) -> bool {
        toggle(&mut self.liked_by, user)
    }

    #[must_use]
    pub fn like_count(&self) -> usize {
        self.liked_by.len()
    }
}

fn toggle(set: &mut BTreeSet<Id<UserMarker>>, user: Id<UserMarker>) -> bool {
    if set.remove(&user) {
        false
    } else {
        set.insert(user);
        true
    }
}
