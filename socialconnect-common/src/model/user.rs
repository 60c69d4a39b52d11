use crate::model::{Id, auth::PasswordDigest, post::PostMarker};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::collections::BTreeSet;
use thiserror::Error;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const MIN_AGE: u8 = 13;
pub const MAX_AGE: u8 = 120;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub password: PasswordDigest,
    pub full_name: String,
    pub email: Email,
    pub age: Age,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub followers: BTreeSet<Id<UserMarker>>,
    #[serde(default)]
    pub following: BTreeSet<Id<UserMarker>>,
    #[serde(default)]
    pub posts: Vec<Id<PostMarker>>,
    pub role: Role,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    Regular(RegularProfile),
    Admin(AdminProfile),
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct RegularProfile {
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub private_account: bool,
    /// Users waiting for this account to approve their follow.
    #[serde(default)]
    pub pending_follow_requests: BTreeSet<Id<UserMarker>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct AdminProfile {
    #[serde(default)]
    pub banned_users: BTreeSet<Id<UserMarker>>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Regular,
    Admin,
}

impl User {
    #[must_use]
    pub fn new(
        id: Id<UserMarker>,
        username: Username,
        password: PasswordDigest,
        full_name: String,
        email: Email,
        age: Age,
        user_type: UserType,
    ) -> Self {
        let role = match user_type {
            UserType::Regular => Role::Regular(RegularProfile::default()),
            UserType::Admin => Role::Admin(AdminProfile::default()),
        };

        Self {
            id,
            username,
            password,
            full_name,
            email,
            age,
            bio: String::new(),
            profile_photo: None,
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
            posts: Vec::new(),
            role,
        }
    }

    #[must_use]
    pub fn user_type(&self) -> UserType {
        match self.role {
            Role::Regular(_) => UserType::Regular,
            Role::Admin(_) => UserType::Admin,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user_type() == UserType::Admin
    }

    #[must_use]
    pub fn can_delete_any_post(&self) -> bool {
        self.is_admin()
    }

    #[must_use]
    pub fn as_regular(&self) -> Option<&RegularProfile> {
        match &self.role {
            Role::Regular(profile) => Some(profile),
            Role::Admin(_) => None,
        }
    }

    pub fn as_regular_mut(&mut self) -> Option<&mut RegularProfile> {
        match &mut self.role {
            Role::Regular(profile) => Some(profile),
            Role::Admin(_) => None,
        }
    }

    #[must_use]
    pub fn as_admin(&self) -> Option<&AdminProfile> {
        match &self.role {
            Role::Admin(profile) => Some(profile),
            Role::Regular(_) => None,
        }
    }

    pub fn as_admin_mut(&mut self) -> Option<&mut AdminProfile> {
        match &mut self.role {
            Role::Admin(profile) => Some(profile),
            Role::Regular(_) => None,
        }
    }

    #[must_use]
    pub fn is_following(&self, user: Id<UserMarker>) -> bool {
        self.following.contains(&user)
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.as_regular().is_some_and(|profile| profile.verified)
    }

    #[must_use]
    pub fn is_private_account(&self) -> bool {
        self.as_regular()
            .is_some_and(|profile| profile.private_account)
    }

    #[must_use]
    pub fn has_pending_request_from(&self, user: Id<UserMarker>) -> bool {
        self.as_regular()
            .is_some_and(|profile| profile.pending_follow_requests.contains(&user))
    }

    #[must_use]
    pub fn has_banned(&self, user: Id<UserMarker>) -> bool {
        self.as_admin()
            .is_some_and(|profile| profile.banned_users.contains(&user))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0}")]
pub struct InvalidUsernameError(String);

impl Username {
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let len = username.chars().count();
        if (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len)
            && !username.chars().any(char::is_whitespace)
        {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Case-insensitive comparison, the only equality that matters for uniqueness.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Username"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The email address is invalid: {0}")]
pub struct InvalidEmailError(String);

impl Email {
    /// Accepts `local@domain.tld`, trimming surrounding whitespace first.
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let trimmed = email.trim();
        let valid = trimmed.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }) && !trimmed.chars().any(char::is_whitespace);

        if valid {
            Ok(Email(trimmed.to_owned()))
        } else {
            Err(InvalidEmailError(email))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.trim().to_lowercase()
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Age(u8);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The age must be between {MIN_AGE} and {MAX_AGE}: {0}")]
pub struct InvalidAgeError(u32);

impl Age {
    pub fn new(age: u32) -> Result<Self, InvalidAgeError> {
        u8::try_from(age)
            .ok()
            .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
            .map(Age)
            .ok_or(InvalidAgeError(age))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Age {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = u32::deserialize(deserializer)?;
        Age::new(inner).map_err(|_| Error::invalid_value(Unexpected::Unsigned(inner.into()), &"Age"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        auth::PasswordDigest,
        user::{Age, Email, Role, User, UserType, Username},
    };

    fn user(user_type: UserType) -> User {
        User::new(
            Id::new(1),
            Username::new("ali".to_owned()).unwrap(),
            PasswordDigest::of("pw123456"),
            "Ali".to_owned(),
            Email::new("ali@gmail.com".to_owned()).unwrap(),
            Age::new(22).unwrap(),
            user_type,
        )
    }

    #[test]
    fn usernames_compare_case_insensitively() {
        let username = Username::new("Alice".to_owned()).unwrap();

        assert!(username.matches("alice"));
        assert!(username.matches("ALICE"));
        assert!(!username.matches("alicia"));
    }

    #[test]
    fn username_length_is_bounded() {
        assert!(Username::new("al".to_owned()).is_err());
        assert!(Username::new("ali".to_owned()).is_ok());
        assert!(Username::new("a".repeat(51)).is_err());
        assert!(Username::new("a b".to_owned()).is_err());
    }

    #[test]
    fn emails_are_trimmed_and_checked() {
        let email = Email::new("  Ali@Gmail.com ".to_owned()).unwrap();

        assert_eq!(email.get(), "Ali@Gmail.com");
        assert!(email.matches("ali@gmail.com "));
        assert!(Email::new("no-at-sign".to_owned()).is_err());
        assert!(Email::new("@gmail.com".to_owned()).is_err());
        assert!(Email::new("ali@localhost".to_owned()).is_err());
    }

    #[test]
    fn age_is_bounded() {
        assert!(Age::new(12).is_err());
        assert_eq!(Age::new(13).map(Age::get), Ok(13));
        assert_eq!(Age::new(120).map(Age::get), Ok(120));
        assert!(Age::new(121).is_err());
        assert!(Age::new(300).is_err());
    }

    #[test]
    fn capabilities_follow_the_role() {
        let regular = user(UserType::Regular);
        let admin = user(UserType::Admin);

        assert!(!regular.can_delete_any_post());
        assert!(admin.can_delete_any_post());
        assert!(regular.as_regular().is_some());
        assert!(admin.as_admin().is_some());
        assert!(!admin.is_verified());
    }

    #[test]
    fn role_is_tagged_in_serialized_form() {
        let json = serde_json::to_value(user(UserType::Admin)).unwrap();

        assert_eq!(json["role"]["kind"], "admin");

        let parsed: User = serde_json::from_value(json).unwrap();
        assert!(matches!(parsed.role, Role::Admin(_)));
    }

    #[test]
    fn missing_follow_requests_default_to_empty() {
        let mut json = serde_json::to_value(user(UserType::Regular)).unwrap();
        json["role"]
            .as_object_mut()
            .unwrap()
            .remove("pending_follow_requests");

        let parsed: User = serde_json::from_value(json).unwrap();
        assert!(
            parsed
                .as_regular()
                .unwrap()
                .pending_follow_requests
                .is_empty()
        );
    }
}
