use crate::{
    cipher::{CipherError, RecordCipher},
    record::{CountersRecord, RecordKind, VerificationRequestsRecord},
};
use serde::{Serialize, de::DeserializeOwned};
use socialconnect_common::{
    model::{
        moderation::{CommentReport, VerificationRequest},
        post::Post,
        user::User,
    },
    sequence::IdCounters,
};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O on {} failed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Record could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// The complete persisted state.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub posts: Vec<Post>,
    pub counters: IdCounters,
    pub verification_requests: Vec<VerificationRequest>,
    pub comment_reports: Vec<CommentReport>,
}

/// Borrowed view of the state, so saving does not need to clone every collection.
#[derive(Copy, Clone, Debug)]
pub struct SnapshotRef<'a> {
    pub users: &'a [User],
    pub posts: &'a [Post],
    pub counters: &'a IdCounters,
    pub verification_requests: &'a [VerificationRequest],
    pub comment_reports: &'a [CommentReport],
}

impl Snapshot {
    #[must_use]
    pub fn view(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            users: &self.users,
            posts: &self.posts,
            counters: &self.counters,
            verification_requests: &self.verification_requests,
            comment_reports: &self.comment_reports,
        }
    }
}

/// Reads and writes the state as a set of encrypted record files in one directory.
#[derive(Debug)]
pub struct StoreClient {
    data_dir: PathBuf,
    cipher: RecordCipher,
}

impl StoreClient {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cipher: RecordCipher::new(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn record_path(&self, kind: RecordKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    /// Writes every record. A failing record does not stop the others from being written; the
    /// last error seen is returned.
    pub fn save(&self, snapshot: SnapshotRef<'_>) -> Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let results = [
            self.write_record(RecordKind::Users, &snapshot.users),
            self.write_record(RecordKind::Posts, &snapshot.posts),
            self.write_record(
                RecordKind::Counters,
                &CountersRecord::from(snapshot.counters),
            ),
            self.write_record(
                RecordKind::VerificationRequests,
                &snapshot.verification_requests,
            ),
            self.write_record(RecordKind::CommentReports, &snapshot.comment_reports),
        ];

        let mut outcome = Ok(());
        for (kind, result) in RecordKind::ALL.into_iter().zip(results) {
            if let Err(err) = result {
                error!(record = %kind, error = %err, "Saving record failed");
                outcome = Err(err);
            }
        }
        outcome
    }

    /// Loads every record. Records that are missing or unreadable come back empty.
    #[must_use]
    pub fn load(&self) -> Snapshot {
        let counters = self
            .read_record::<CountersRecord>(RecordKind::Counters)
            .and_then(|record| {
                IdCounters::try_from(record)
                    .inspect_err(|err| error!(error = %err, "Ignoring malformed counters"))
                    .ok()
            })
            .unwrap_or_default();

        let snapshot = Snapshot {
            users: self.read_record(RecordKind::Users).unwrap_or_default(),
            posts: self.read_record(RecordKind::Posts).unwrap_or_default(),
            counters,
            verification_requests: self
                .read_record::<VerificationRequestsRecord>(RecordKind::VerificationRequests)
                .map(Vec::from)
                .unwrap_or_default(),
            comment_reports: self
                .read_record(RecordKind::CommentReports)
                .unwrap_or_default(),
        };

        info!(
            users = snapshot.users.len(),
            posts = snapshot.posts.len(),
            "Loaded saved data"
        );
        snapshot
    }

    fn write_record<T: Serialize + ?Sized>(&self, kind: RecordKind, value: &T) -> Result<()> {
        let plaintext = serde_json::to_vec(value)?;
        let sealed = self.cipher.seal(&plaintext)?;

        let path = self.record_path(kind);
        let temp_path = path.with_extension("dat.tmp");
        fs::write(&temp_path, &sealed)
            .and_then(|()| fs::rename(&temp_path, &path))
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(record = %kind, bytes = sealed.len(), "Wrote record");
        Ok(())
    }

    fn decode_sealed<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let plaintext = self.cipher.open(bytes)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn read_record<T: DeserializeOwned + Serialize>(&self, kind: RecordKind) -> Option<T> {
        let path = self.record_path(kind);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(record = %kind, "Record does not exist");
                return None;
            }
            Err(err) => {
                error!(record = %kind, error = %err, "Reading record failed");
                return None;
            }
        };

        let sealed_error = match self.decode_sealed(&bytes) {
            Ok(value) => {
                debug!(record = %kind, "Loaded encrypted record");
                return Some(value);
            }
            Err(err) => err,
        };

        if matches!(sealed_error, StoreError::Cipher(CipherError::NotEncrypted)) {
            warn!(record = %kind, "Record appears to be unencrypted, loading as plain");
        } else {
            error!(record = %kind, error = %sealed_error, "Decrypting record failed");
        }

        match serde_json::from_slice::<T>(&bytes) {
            Ok(value) => {
                info!(record = %kind, "Migrating record to the encrypted format");
                if let Err(err) = self.write_record(kind, &value) {
                    error!(record = %kind, error = %err, "Migrating record failed");
                }
                Some(value)
            }
            Err(plain_error) => {
                error!(
                    record = %kind,
                    encrypted_error = %sealed_error,
                    plain_error = %plain_error,
                    "Record is unreadable in any format, treating it as empty"
                );
                None
            }
        }
    }
}
