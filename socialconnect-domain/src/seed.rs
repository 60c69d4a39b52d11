//! Sample accounts for an empty installation.

use crate::identity::{IdentityError, IdentityStore, Registration};
use socialconnect_common::{
    model::user::{UserMarker, UserType},
    sequence::IdSequence,
};
use tracing::info;

struct SampleUser {
    username: &'static str,
    password: &'static str,
    full_name: &'static str,
    email: &'static str,
    age: u32,
    bio: &'static str,
    user_type: UserType,
    verified: bool,
}

const SAMPLE_USERS: [SampleUser; 4] = [
    SampleUser {
        username: "ali",
        password: "password123",
        full_name: "Ali",
        email: "ali@email.com",
        age: 22,
        bio: "Software developer | Coffee lover | Travel enthusiast",
        user_type: UserType::Regular,
        verified: false,
    },
    SampleUser {
        username: "arfa",
        password: "password123",
        full_name: "Arfa",
        email: "arfa@email.com",
        age: 21,
        bio: "Designer & Artist 🎨 | Nature photographer 📸",
        user_type: UserType::Regular,
        verified: true,
    },
    SampleUser {
        username: "hashir",
        password: "password123",
        full_name: "Hashir",
        email: "hashir@email.com",
        age: 23,
        bio: "Tech geek 💻 | Gamer 🎮 | Music producer 🎵",
        user_type: UserType::Regular,
        verified: false,
    },
    SampleUser {
        username: "admin",
        password: "admin123",
        full_name: "System Admin",
        email: "admin@socialconnect.com",
        age: 30,
        bio: "Platform Administrator",
        user_type: UserType::Admin,
        verified: false,
    },
];

/// Registers the sample accounts. Accounts whose username or email is already taken are
/// skipped.
pub fn seed_sample_users(
    users: &mut IdentityStore,
    ids: &mut IdSequence<UserMarker>,
) -> Result<usize, IdentityError> {
    let mut seeded = 0;
    for sample in &SAMPLE_USERS {
        let registration = Registration {
            username: sample.username.to_owned(),
            password: sample.password.to_owned(),
            full_name: sample.full_name.to_owned(),
            email: sample.email.to_owned(),
            age: sample.age,
            user_type: sample.user_type,
        };

        let id = match users.register(ids, registration) {
            Ok(user) => user.id,
            Err(IdentityError::DuplicateUsername(_) | IdentityError::DuplicateEmail(_)) => continue,
            Err(err) => return Err(err),
        };
        let user = users.require_mut(id)?;
        sample.bio.clone_into(&mut user.bio);
        if let Some(profile) = user.as_regular_mut() {
            profile.verified = sample.verified;
        }
        seeded += 1;
    }

    info!(seeded, "Seeded sample users");
    Ok(seeded)
}
