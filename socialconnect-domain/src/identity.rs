use socialconnect_common::{
    model::{
        Id, ModelValidationError, non_blank,
        auth::Password,
        user::{Age, Email, User, UserMarker, UserType, Username},
    },
    sequence::IdSequence,
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use tracing::info;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Invalid(#[from] ModelValidationError),
    #[error("The username {0} is already taken")]
    DuplicateUsername(String),
    #[error("The email address {0} is already registered")]
    DuplicateEmail(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("User {0} is banned")]
    Banned(Id<UserMarker>),
    #[error("User with id {0} was not found.")]
    UserNotFound(Id<UserMarker>),
}

pub type Result<T, E = IdentityError> = std::result::Result<T, E>;

#[derive(Clone, Eq, PartialEq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub age: u32,
    pub user_type: UserType,
}

impl Debug for Registration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("age", &self.age)
            .field("user_type", &self.user_type)
            .finish()
    }
}

/// Profile edits applied together by [`IdentityStore::update_profile`]. `None` leaves a field
/// unchanged. A blank `profile_photo` removes the photo.
#[derive(Clone, Eq, PartialEq, Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    pub password: Option<String>,
    pub private_account: Option<bool>,
    pub profile_photo: Option<String>,
}

impl Debug for ProfileChanges {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileChanges")
            .field("full_name", &self.full_name)
            .field("bio", &self.bio)
            .field("email", &self.email)
            .field("age", &self.age)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("private_account", &self.private_account)
            .field("profile_photo", &self.profile_photo)
            .finish()
    }
}

/// All registered users, in registration order.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct IdentityStore {
    users: Vec<User>,
}

impl IdentityStore {
    #[must_use]
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn position(&self, id: Id<UserMarker>) -> Option<usize> {
        self.users.iter().position(|user| user.id == id)
    }

    #[must_use]
    pub fn get(&self, id: Id<UserMarker>) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    pub fn get_mut(&mut self, id: Id<UserMarker>) -> Option<&mut User> {
        self.users.iter_mut().find(|user| user.id == id)
    }

    pub fn require_mut(&mut self, id: Id<UserMarker>) -> Result<&mut User> {
        self.get_mut(id).ok_or(IdentityError::UserNotFound(id))
    }

    /// Mutable access to two distinct users at once.
    pub fn pair_mut(
        &mut self,
        first: Id<UserMarker>,
        second: Id<UserMarker>,
    ) -> Option<(&mut User, &mut User)> {
        let first = self.position(first)?;
        let second = self.position(second)?;

        if first < second {
            let (head, tail) = self.users.split_at_mut(second);
            Some((&mut head[first], &mut tail[0]))
        } else if second < first {
            let (head, tail) = self.users.split_at_mut(first);
            Some((&mut tail[0], &mut head[second]))
        } else {
            None
        }
    }

    #[must_use]
    pub fn by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|user| user.username.matches(username))
    }

    #[must_use]
    pub fn by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|user| user.email.matches(email))
    }

    #[must_use]
    pub fn is_email_taken(&self, email: &str) -> bool {
        !email.trim().is_empty() && self.by_email(email).is_some()
    }

    /// Case-insensitive substring search over usernames and full names.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&User> {
        let query = query.to_lowercase();
        self.users
            .iter()
            .filter(|user| {
                user.username.get().to_lowercase().contains(&query)
                    || user.full_name.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn register(
        &mut self,
        ids: &mut IdSequence<UserMarker>,
        registration: Registration,
    ) -> Result<&User> {
        let Registration {
            username,
            password,
            full_name,
            email,
            age,
            user_type,
        } = registration;

        let username = Username::new(username).map_err(ModelValidationError::from)?;
        let email = Email::new(email).map_err(ModelValidationError::from)?;
        let password = Password::new(password).map_err(ModelValidationError::from)?;
        let age = Age::new(age).map_err(ModelValidationError::from)?;
        let full_name = non_blank(full_name)?.trim().to_owned();

        if self.by_username(username.get()).is_some() {
            return Err(IdentityError::DuplicateUsername(username.into_inner()));
        }
        if self.by_email(email.get()).is_some() {
            return Err(IdentityError::DuplicateEmail(email.get().to_owned()));
        }

        let user = User::new(
            ids.generate(),
            username,
            password.digest(),
            full_name,
            email,
            age,
            user_type,
        );
        info!(user = %user.id, username = user.username.get(), "Registered user");

        self.users.push(user);
        Ok(&self.users[self.users.len() - 1])
    }

    /// Checks credentials. A banned user with the right password gets [`IdentityError::Banned`]
    /// rather than [`IdentityError::InvalidCredentials`].
    pub fn authenticate(&self, username: &str, password: &str) -> Result<&User> {
        let user = self
            .by_username(username)
            .filter(|user| user.password.matches(password))
            .ok_or(IdentityError::InvalidCredentials)?;

        if self.is_banned(user.id) {
            return Err(IdentityError::Banned(user.id));
        }
        Ok(user)
    }

    /// Whether any admin has banned `user`.
    #[must_use]
    pub fn is_banned(&self, user: Id<UserMarker>) -> bool {
        self.users.iter().any(|admin| admin.has_banned(user))
    }

    /// Whether a login for `username` would be refused because of a ban.
    #[must_use]
    pub fn is_login_banned(&self, username: &str) -> bool {
        self.by_username(username)
            .is_some_and(|user| self.is_banned(user.id))
    }

    pub fn change_password(&mut self, user: Id<UserMarker>, password: String) -> Result<()> {
        let password = Password::new(password).map_err(ModelValidationError::from)?;
        self.require_mut(user)?.password = password.digest();
        Ok(())
    }

    pub fn change_email(&mut self, user: Id<UserMarker>, email: String) -> Result<()> {
        let email = self.available_email(user, email)?;
        self.require_mut(user)?.email = email;
        Ok(())
    }

    /// Validates `email` as the new address of `user`, who may keep their own address.
    fn available_email(&self, user: Id<UserMarker>, email: String) -> Result<Email> {
        let email = Email::new(email).map_err(ModelValidationError::from)?;
        if self
            .by_email(email.get())
            .is_some_and(|owner| owner.id != user)
        {
            return Err(IdentityError::DuplicateEmail(email.get().to_owned()));
        }
        Ok(email)
    }

    /// Validates every change before applying any, so a rejected update leaves the user as it
    /// was. `private_account` is ignored for administrators.
    pub fn update_profile(&mut self, user: Id<UserMarker>, changes: ProfileChanges) -> Result<()> {
        let ProfileChanges {
            full_name,
            bio,
            email,
            age,
            password,
            private_account,
            profile_photo,
        } = changes;

        let full_name = full_name
            .map(non_blank)
            .transpose()?
            .map(|name| name.trim().to_owned());
        let email = email
            .map(|email| self.available_email(user, email))
            .transpose()?;
        let age = age
            .map(Age::new)
            .transpose()
            .map_err(ModelValidationError::from)?;
        let password = password
            .map(Password::new)
            .transpose()
            .map_err(ModelValidationError::from)?;

        let target = self.require_mut(user)?;
        if let Some(full_name) = full_name {
            target.full_name = full_name;
        }
        if let Some(bio) = bio {
            target.bio = bio;
        }
        if let Some(email) = email {
            target.email = email;
        }
        if let Some(age) = age {
            target.age = age;
        }
        if let Some(password) = password {
            target.password = password.digest();
        }
        if let (Some(private_account), Some(profile)) = (private_account, target.as_regular_mut()) {
            profile.private_account = private_account;
        }
        if let Some(path) = profile_photo {
            target.profile_photo = Some(path).filter(|path| !path.trim().is_empty());
        }
        Ok(())
    }

    /// Re-hashes passwords that older releases stored in plaintext. Returns how many users were
    /// migrated so the caller can flush the change.
    pub fn migrate_legacy_passwords(&mut self) -> usize {
        let mut migrated = 0;
        for user in &mut self.users {
            if user.password.migrate_legacy() {
                info!(username = user.username.get(), "Migrated plaintext password");
                migrated += 1;
            }
        }
        migrated
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::identity::{IdentityError, IdentityStore, ProfileChanges, Registration};
    use socialconnect_common::{
        model::{Id, ModelValidationError, auth::PasswordDigest, user::UserType},
        sequence::IdSequence,
    };

    pub(crate) fn registration(username: &str, email: &str, user_type: UserType) -> Registration {
        Registration {
            username: username.to_owned(),
            password: "pw123456".to_owned(),
            full_name: username.to_uppercase(),
            email: email.to_owned(),
            age: 22,
            user_type,
        }
    }

    #[test]
    fn register_then_reject_duplicate_username() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();

        let ali = store
            .register(
                &mut ids,
                Registration {
                    username: "ali".to_owned(),
                    password: "pw123456".to_owned(),
                    full_name: "Ali".to_owned(),
                    email: "ali@gmail.com".to_owned(),
                    age: 22,
                    user_type: UserType::Regular,
                },
            )
            .unwrap();
        assert_eq!(ali.id, Id::new(1));
        assert_eq!(ali.password, PasswordDigest::of("pw123456"));

        let duplicate = store.register(
            &mut ids,
            registration("ALI", "other@gmail.com", UserType::Regular),
        );
        assert_eq!(
            duplicate.unwrap_err(),
            IdentityError::DuplicateUsername("ALI".to_owned())
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_email_is_case_insensitive() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();
        store
            .register(&mut ids, registration("ali", "ali@gmail.com", UserType::Regular))
            .unwrap();

        let duplicate = store.register(
            &mut ids,
            registration("bob", " Ali@GMAIL.com", UserType::Regular),
        );

        assert!(matches!(duplicate, Err(IdentityError::DuplicateEmail(_))));
        assert!(store.is_email_taken("ALI@gmail.com"));
        assert!(!store.is_email_taken("  "));
    }

    #[test]
    fn invalid_input_is_rejected() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();

        let mut young = registration("kid", "kid@gmail.com", UserType::Regular);
        young.age = 9;
        assert!(matches!(
            store.register(&mut ids, young),
            Err(IdentityError::Invalid(ModelValidationError::Age(_)))
        ));

        let mut short = registration("shorty", "s@gmail.com", UserType::Regular);
        short.password = "123".to_owned();
        assert!(matches!(
            store.register(&mut ids, short),
            Err(IdentityError::Invalid(ModelValidationError::Password(_)))
        ));

        let mut nameless = registration("nameless", "n@gmail.com", UserType::Regular);
        nameless.full_name = " ".to_owned();
        assert!(matches!(
            store.register(&mut ids, nameless),
            Err(IdentityError::Invalid(ModelValidationError::EmptyContent))
        ));

        assert!(store.is_empty());
        assert_eq!(ids.peek(), 1);
    }

    #[test]
    fn authenticate_checks_digest_and_bans() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();
        let bob = store
            .register(&mut ids, registration("bob", "bob@gmail.com", UserType::Regular))
            .unwrap()
            .id;
        let admin = store
            .register(&mut ids, registration("root", "root@gmail.com", UserType::Admin))
            .unwrap()
            .id;

        assert_eq!(store.authenticate("BOB", "pw123456").unwrap().id, bob);
        assert_eq!(
            store.authenticate("bob", "wrong-password").unwrap_err(),
            IdentityError::InvalidCredentials
        );
        assert_eq!(
            store.authenticate("nobody", "pw123456").unwrap_err(),
            IdentityError::InvalidCredentials
        );

        store
            .get_mut(admin)
            .unwrap()
            .as_admin_mut()
            .unwrap()
            .banned_users
            .insert(bob);

        assert_eq!(
            store.authenticate("bob", "pw123456").unwrap_err(),
            IdentityError::Banned(bob)
        );
        assert!(store.is_login_banned("Bob"));
        assert!(!store.is_login_banned("root"));
    }

    #[test]
    fn pair_mut_requires_two_distinct_users() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();
        let a = store
            .register(&mut ids, registration("aaa", "a@gmail.com", UserType::Regular))
            .unwrap()
            .id;
        let b = store
            .register(&mut ids, registration("bbb", "b@gmail.com", UserType::Regular))
            .unwrap()
            .id;

        let (first, second) = store.pair_mut(b, a).unwrap();
        assert_eq!((first.id, second.id), (b, a));
        assert!(store.pair_mut(a, a).is_none());
        assert!(store.pair_mut(a, Id::new(99)).is_none());
    }

    #[test]
    fn legacy_passwords_are_migrated_once() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();
        let ali = store
            .register(&mut ids, registration("ali", "ali@gmail.com", UserType::Regular))
            .unwrap()
            .id;
        store.get_mut(ali).unwrap().password =
            serde_json::from_str("\"password123\"").unwrap();

        assert_eq!(store.migrate_legacy_passwords(), 1);
        assert_eq!(store.migrate_legacy_passwords(), 0);
        assert!(store.authenticate("ali", "password123").is_ok());
    }

    #[test]
    fn change_email_keeps_uniqueness() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();
        let ali = store
            .register(&mut ids, registration("ali", "ali@gmail.com", UserType::Regular))
            .unwrap()
            .id;
        store
            .register(&mut ids, registration("bob", "bob@gmail.com", UserType::Regular))
            .unwrap();

        assert!(matches!(
            store.change_email(ali, "BOB@gmail.com".to_owned()),
            Err(IdentityError::DuplicateEmail(_))
        ));
        store.change_email(ali, "ALI@gmail.com".to_owned()).unwrap();
        assert_eq!(store.get(ali).unwrap().email.get(), "ALI@gmail.com");
    }

    #[test]
    fn rejected_profile_update_changes_nothing() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();
        let ali = store
            .register(&mut ids, registration("ali", "ali@gmail.com", UserType::Regular))
            .unwrap()
            .id;
        store
            .register(&mut ids, registration("bob", "bob@gmail.com", UserType::Regular))
            .unwrap();
        let before = store.get(ali).unwrap().clone();

        let result = store.update_profile(
            ali,
            ProfileChanges {
                full_name: Some("Changed".to_owned()),
                bio: Some("new bio".to_owned()),
                email: Some("bob@gmail.com".to_owned()),
                ..ProfileChanges::default()
            },
        );
        assert!(matches!(result, Err(IdentityError::DuplicateEmail(_))));

        let result = store.update_profile(
            ali,
            ProfileChanges {
                full_name: Some("Changed".to_owned()),
                age: Some(7),
                ..ProfileChanges::default()
            },
        );
        assert!(matches!(result, Err(IdentityError::Invalid(_))));
        assert_eq!(store.get(ali), Some(&before));
    }

    #[test]
    fn profile_update_applies_every_field() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();
        let ali = store
            .register(&mut ids, registration("ali", "ali@gmail.com", UserType::Regular))
            .unwrap()
            .id;

        store
            .update_profile(
                ali,
                ProfileChanges {
                    full_name: Some("  Ali Khan ".to_owned()),
                    email: Some("ali@proton.me".to_owned()),
                    age: Some(30),
                    password: Some("fresh-secret".to_owned()),
                    private_account: Some(true),
                    profile_photo: Some("/pics/ali.png".to_owned()),
                    ..ProfileChanges::default()
                },
            )
            .unwrap();

        let ali = store.authenticate("ali", "fresh-secret").unwrap();
        assert_eq!(ali.full_name, "Ali Khan");
        assert_eq!(ali.email.get(), "ali@proton.me");
        assert_eq!(ali.age.get(), 30);
        assert!(ali.is_private_account());
        assert_eq!(ali.profile_photo.as_deref(), Some("/pics/ali.png"));
    }

    #[test]
    fn search_matches_username_or_full_name() {
        let mut store = IdentityStore::default();
        let mut ids = IdSequence::default();
        store
            .register(&mut ids, registration("hashir", "h@gmail.com", UserType::Regular))
            .unwrap();
        store
            .register(&mut ids, registration("arfa", "a@gmail.com", UserType::Regular))
            .unwrap();

        let found: Vec<_> = store
            .search("ASH")
            .into_iter()
            .map(|user| user.username.get())
            .collect();
        assert_eq!(found, ["hashir"]);
        assert_eq!(store.search("").len(), 2);
    }
}
