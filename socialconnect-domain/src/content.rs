use crate::identity::IdentityStore;
use socialconnect_common::{
    model::{
        Id, ModelValidationError, non_blank,
        post::{Comment, CommentMarker, Post, PostContent, PostMarker},
        user::{User, UserMarker},
    },
    sequence::IdSequence,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Invalid(#[from] ModelValidationError),
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment with id {comment} was not found on post {post}.")]
    CommentNotFound {
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    },
    #[error("User with id {0} was not found.")]
    UserNotFound(Id<UserMarker>),
    #[error("User {user} may not delete post {post}")]
    NotPostAuthor {
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    },
}

pub type Result<T, E = ContentError> = std::result::Result<T, E>;

/// All posts, in creation order. Comments live inside their post.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ContentStore {
    posts: Vec<Post>,
}

impl ContentStore {
    #[must_use]
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn get(&self, post: Id<PostMarker>) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post)
    }

    fn require(&self, post: Id<PostMarker>) -> Result<&Post> {
        self.get(post).ok_or(ContentError::PostNotFound(post))
    }

    fn require_mut(&mut self, post: Id<PostMarker>) -> Result<&mut Post> {
        self.posts
            .iter_mut()
            .find(|p| p.id == post)
            .ok_or(ContentError::PostNotFound(post))
    }

    /// Looks up a comment, requiring it to belong to `post`.
    pub fn comment(&self, post: Id<PostMarker>, comment: Id<CommentMarker>) -> Result<&Comment> {
        self.require(post)?
            .comment(comment)
            .ok_or(ContentError::CommentNotFound { post, comment })
    }

    pub fn create_text_post(
        &mut self,
        ids: &mut IdSequence<PostMarker>,
        author: &mut User,
        body: String,
    ) -> Result<&Post> {
        let body = non_blank(body)?;
        Ok(self.publish(ids, author, PostContent::Text { body }))
    }

    pub fn create_image_post(
        &mut self,
        ids: &mut IdSequence<PostMarker>,
        author: &mut User,
        path: String,
        caption: Option<String>,
    ) -> Result<&Post> {
        let path = non_blank(path)?;
        let caption = caption.filter(|caption| !caption.trim().is_empty());
        Ok(self.publish(ids, author, PostContent::Image { path, caption }))
    }

    fn publish(
        &mut self,
        ids: &mut IdSequence<PostMarker>,
        author: &mut User,
        content: PostContent,
    ) -> &Post {
        let post = Post::new(ids.generate(), author, content);
        info!(post = %post.id, author = %author.id, kind = ?post.post_type(), "Created post");

        author.posts.push(post.id);
        self.posts.push(post);
        &self.posts[self.posts.len() - 1]
    }

    /// Returns whether `user` likes the post afterwards.
    pub fn toggle_like(&mut self, post: Id<PostMarker>, user: Id<UserMarker>) -> Result<bool> {
        let liked = self.require_mut(post)?.toggle_like(user);
        debug!(%post, %user, liked, "Toggled post like");
        Ok(liked)
    }

    pub fn toggle_comment_like(
        &mut self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        user: Id<UserMarker>,
    ) -> Result<bool> {
        let liked = self
            .require_mut(post)?
            .comment_mut(comment)
            .ok_or(ContentError::CommentNotFound { post, comment })?
            .toggle_like(user);
        debug!(%post, %comment, %user, liked, "Toggled comment like");
        Ok(liked)
    }

    pub fn add_comment(
        &mut self,
        ids: &mut IdSequence<CommentMarker>,
        post: Id<PostMarker>,
        author: &User,
        content: String,
    ) -> Result<&Comment> {
        let content = non_blank(content)?;
        let target = self.require_mut(post)?;

        let comment = Comment::new(ids.generate(), post, author, content);
        info!(%post, comment = %comment.id, author = %author.id, "Added comment");

        target.comments.push(comment);
        let index = target.comments.len() - 1;
        Ok(&target.comments[index])
    }

    /// Deletes a post if `requester` wrote it or may delete any post. The post id is also removed
    /// from its author's post list.
    pub fn delete_post(
        &mut self,
        users: &mut IdentityStore,
        post: Id<PostMarker>,
        requester: Id<UserMarker>,
    ) -> Result<Post> {
        let may_delete_any = users
            .get(requester)
            .ok_or(ContentError::UserNotFound(requester))?
            .can_delete_any_post();
        let author = self.require(post)?.author.id;
        if author != requester && !may_delete_any {
            return Err(ContentError::NotPostAuthor {
                post,
                user: requester,
            });
        }

        let index = self
            .posts
            .iter()
            .position(|p| p.id == post)
            .ok_or(ContentError::PostNotFound(post))?;
        let removed = self.posts.remove(index);

        if let Some(author) = users.get_mut(author) {
            author.posts.retain(|id| *id != post);
        }
        info!(%post, %requester, "Deleted post");
        Ok(removed)
    }

    pub fn remove_comment(
        &mut self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> Result<()> {
        if self.require_mut(post)?.remove_comment(comment) {
            info!(%post, %comment, "Removed comment");
            Ok(())
        } else {
            Err(ContentError::CommentNotFound { post, comment })
        }
    }

    /// Every post, newest first.
    #[must_use]
    pub fn newest_first(&self) -> Vec<&Post> {
        self.newest_first_where(|_| true)
    }

    #[must_use]
    pub fn by_author(&self, author: Id<UserMarker>) -> Vec<&Post> {
        self.newest_first_where(|post| post.author.id == author)
    }

    /// Posts accepted by `filter`, newest first. Posts created within the same millisecond keep
    /// their insertion order.
    pub fn newest_first_where(&self, filter: impl Fn(&Post) -> bool) -> Vec<&Post> {
        let mut posts: Vec<_> = self.posts.iter().filter(|post| filter(post)).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        content::{ContentError, ContentStore},
        identity::{IdentityStore, tests::registration},
    };
    use socialconnect_common::{
        model::{
            Id, ModelValidationError,
            post::{PostContent, PostMarker, PostType},
            user::{UserMarker, UserType},
        },
        sequence::IdCounters,
        util::Timestamp,
    };

    pub(crate) fn set_created_at(content: &mut ContentStore, post: Id<PostMarker>, millis: i64) {
        let post = content
            .posts
            .iter_mut()
            .find(|candidate| candidate.id == post)
            .unwrap();
        post.created_at = Timestamp::from_unix_millis(millis).unwrap();
    }

    fn setup() -> (IdentityStore, ContentStore, IdCounters, [Id<UserMarker>; 3]) {
        let mut users = IdentityStore::default();
        let mut counters = IdCounters::default();
        let mut register = |name: &str, user_type| {
            users
                .register(
                    &mut counters.users,
                    registration(name, &format!("{name}@gmail.com"), user_type),
                )
                .unwrap()
                .id
        };
        let ali = register("ali", UserType::Regular);
        let bob = register("bob", UserType::Regular);
        let admin = register("admin", UserType::Admin);

        (users, ContentStore::default(), counters, [ali, bob, admin])
    }

    #[test]
    fn text_post_is_owned_by_author() {
        let (mut users, mut content, mut counters, [ali, ..]) = setup();

        let post = content
            .create_text_post(
                &mut counters.posts,
                users.get_mut(ali).unwrap(),
                "hello".to_owned(),
            )
            .unwrap()
            .id;

        assert_eq!(users.get(ali).unwrap().posts, [post]);
        let stored = content.get(post).unwrap();
        assert_eq!(stored.author.username, "ali");
        assert_eq!(stored.post_type(), PostType::Text);
        assert_eq!(stored.like_count(), 0);
    }

    #[test]
    fn blank_posts_are_rejected() {
        let (mut users, mut content, mut counters, [ali, ..]) = setup();

        let text = content.create_text_post(
            &mut counters.posts,
            users.get_mut(ali).unwrap(),
            "  \n".to_owned(),
        );
        assert_eq!(
            text.unwrap_err(),
            ContentError::Invalid(ModelValidationError::EmptyContent)
        );

        let image = content.create_image_post(
            &mut counters.posts,
            users.get_mut(ali).unwrap(),
            String::new(),
            Some("caption".to_owned()),
        );
        assert!(image.is_err());
        assert!(content.posts().is_empty());
        assert!(users.get(ali).unwrap().posts.is_empty());
    }

    #[test]
    fn blank_caption_is_dropped() {
        let (mut users, mut content, mut counters, [ali, ..]) = setup();

        let post = content
            .create_image_post(
                &mut counters.posts,
                users.get_mut(ali).unwrap(),
                "C:\\photos\\cat.png".to_owned(),
                Some(" ".to_owned()),
            )
            .unwrap();

        assert_eq!(
            post.content,
            PostContent::Image {
                path: "C:\\photos\\cat.png".to_owned(),
                caption: None
            }
        );
        assert_eq!(post.content.image_file_name(), Some("cat.png"));
    }

    #[test]
    fn likes_toggle_per_user() {
        let (mut users, mut content, mut counters, [ali, bob, _]) = setup();
        let post = content
            .create_text_post(
                &mut counters.posts,
                users.get_mut(ali).unwrap(),
                "hi".to_owned(),
            )
            .unwrap()
            .id;

        assert!(content.toggle_like(post, bob).unwrap());
        assert!(content.toggle_like(post, ali).unwrap());
        assert!(!content.toggle_like(post, bob).unwrap());
        assert_eq!(content.get(post).unwrap().like_count(), 1);
        assert_eq!(
            content.toggle_like(Id::new(42), bob),
            Err(ContentError::PostNotFound(Id::new(42)))
        );
    }

    #[test]
    fn comments_are_kept_in_order_and_liked() {
        let (mut users, mut content, mut counters, [ali, bob, _]) = setup();
        let post = content
            .create_text_post(
                &mut counters.posts,
                users.get_mut(ali).unwrap(),
                "hi".to_owned(),
            )
            .unwrap()
            .id;

        let first = content
            .add_comment(
                &mut counters.comments,
                post,
                users.get(bob).unwrap(),
                "first".to_owned(),
            )
            .unwrap()
            .id;
        let second = content
            .add_comment(
                &mut counters.comments,
                post,
                users.get(ali).unwrap(),
                "second".to_owned(),
            )
            .unwrap()
            .id;
        assert!(
            content
                .add_comment(
                    &mut counters.comments,
                    post,
                    users.get(ali).unwrap(),
                    " ".to_owned()
                )
                .is_err()
        );

        let ids: Vec<_> = content
            .get(post)
            .unwrap()
            .comments
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, [first, second]);

        assert!(content.toggle_comment_like(post, first, ali).unwrap());
        assert_eq!(content.comment(post, first).unwrap().like_count(), 1);
        assert_eq!(
            content.toggle_comment_like(post, Id::new(99), ali),
            Err(ContentError::CommentNotFound {
                post,
                comment: Id::new(99)
            })
        );

        content.remove_comment(post, first).unwrap();
        assert!(content.remove_comment(post, first).is_err());
        assert_eq!(content.get(post).unwrap().comment_count(), 1);
    }

    #[test]
    fn only_author_or_admin_deletes() {
        let (mut users, mut content, mut counters, [ali, bob, admin]) = setup();
        let mut post_by = |users: &mut IdentityStore, user| {
            content
                .create_text_post(
                    &mut counters.posts,
                    users.get_mut(user).unwrap(),
                    "post".to_owned(),
                )
                .unwrap()
                .id
        };
        let first = post_by(&mut users, ali);
        let second = post_by(&mut users, ali);

        assert_eq!(
            content.delete_post(&mut users, first, bob),
            Err(ContentError::NotPostAuthor {
                post: first,
                user: bob
            })
        );

        content.delete_post(&mut users, first, ali).unwrap();
        content.delete_post(&mut users, second, admin).unwrap();

        assert!(content.posts().is_empty());
        assert!(users.get(ali).unwrap().posts.is_empty());
        assert_eq!(
            content.delete_post(&mut users, first, ali),
            Err(ContentError::PostNotFound(first))
        );
    }

    #[test]
    fn listings_are_newest_first() {
        let (mut users, mut content, mut counters, [ali, bob, _]) = setup();
        let mut ids = Vec::new();
        for user in [ali, bob, ali] {
            ids.push(
                content
                    .create_text_post(
                        &mut counters.posts,
                        users.get_mut(user).unwrap(),
                        "post".to_owned(),
                    )
                    .unwrap()
                    .id,
            );
        }

        for (post, millis) in ids.iter().zip([1_000, 3_000, 2_000]) {
            set_created_at(&mut content, *post, millis);
        }

        let all: Vec<_> = content.newest_first().iter().map(|p| p.id).collect();
        assert_eq!(all, [ids[1], ids[2], ids[0]]);

        let by_ali: Vec<_> = content.by_author(ali).iter().map(|p| p.id).collect();
        assert_eq!(by_ali, [ids[2], ids[0]]);
    }

    #[test]
    fn posts_from_the_same_millisecond_keep_insertion_order() {
        let (mut users, mut content, mut counters, [ali, bob, _]) = setup();
        let mut ids = Vec::new();
        for user in [ali, bob, ali] {
            let post = content
                .create_text_post(
                    &mut counters.posts,
                    users.get_mut(user).unwrap(),
                    "post".to_owned(),
                )
                .unwrap()
                .id;
            set_created_at(&mut content, post, 1_000);
            ids.push(post);
        }

        let all: Vec<_> = content.newest_first().iter().map(|p| p.id).collect();
        assert_eq!(all, ids);

        let by_ali: Vec<_> = content.by_author(ali).iter().map(|p| p.id).collect();
        assert_eq!(by_ali, [ids[0], ids[2]]);
    }
}
