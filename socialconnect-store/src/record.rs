use serde::{Deserialize, Serialize};
use socialconnect_common::{
    model::moderation::VerificationRequest,
    sequence::{FIRST_ID, IdCounters},
};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use tracing::warn;

/// The independently stored pieces of the persisted state.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum RecordKind {
    Users,
    Posts,
    Counters,
    VerificationRequests,
    CommentReports,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Users,
        RecordKind::Posts,
        RecordKind::Counters,
        RecordKind::VerificationRequests,
        RecordKind::CommentReports,
    ];

    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            RecordKind::Users => "users.dat",
            RecordKind::Posts => "posts.dat",
            RecordKind::Counters => "counters.dat",
            RecordKind::VerificationRequests => "verification_requests.dat",
            RecordKind::CommentReports => "comment_reports.dat",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The counters record holds {0} values, expected 3 or 4")]
pub struct CountersLengthError(usize);

/// Counters in the order user, post, comment, report.
///
/// Older releases did not track reports and wrote three values.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub(crate) struct CountersRecord(Vec<u64>);

impl From<&IdCounters> for CountersRecord {
    fn from(value: &IdCounters) -> Self {
        Self(value.as_array().to_vec())
    }
}

impl TryFrom<CountersRecord> for IdCounters {
    type Error = CountersLengthError;

    fn try_from(value: CountersRecord) -> Result<Self, Self::Error> {
        let len = value.0.len();
        if !(3..=4).contains(&len) {
            return Err(CountersLengthError(len));
        }

        let mut counters = [FIRST_ID; 4];
        counters[..len].copy_from_slice(&value.0);
        Ok(IdCounters::from_array(counters))
    }
}

/// Verification requests as found on disk. The earliest format stored bare user ids, which do
/// not carry enough information to rebuild a request.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub(crate) enum VerificationRequestsRecord {
    Current(Vec<VerificationRequest>),
    Legacy(Vec<String>),
}

impl From<VerificationRequestsRecord> for Vec<VerificationRequest> {
    fn from(value: VerificationRequestsRecord) -> Self {
        match value {
            VerificationRequestsRecord::Current(requests) => requests,
            VerificationRequestsRecord::Legacy(ids) => {
                warn!(
                    discarded = ids.len(),
                    "Discarding verification requests in the legacy id-only format"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{CountersLengthError, CountersRecord, VerificationRequestsRecord};
    use socialconnect_common::{model::moderation::VerificationRequest, sequence::IdCounters};

    #[test]
    fn four_counters_load_as_is() {
        let record: CountersRecord = serde_json::from_str("[5, 9, 12, 3]").unwrap();

        let counters = IdCounters::try_from(record).unwrap();
        assert_eq!(counters.as_array(), [5, 9, 12, 3]);
    }

    #[test]
    fn missing_report_counter_defaults_to_one() {
        let record: CountersRecord = serde_json::from_str("[5, 9, 12]").unwrap();

        let counters = IdCounters::try_from(record).unwrap();
        assert_eq!(counters.as_array(), [5, 9, 12, 1]);
    }

    #[test]
    fn other_lengths_are_rejected() {
        for (json, len) in [("[]", 0), ("[1, 2]", 2), ("[1, 2, 3, 4, 5]", 5)] {
            let record: CountersRecord = serde_json::from_str(json).unwrap();
            assert_eq!(IdCounters::try_from(record), Err(CountersLengthError(len)));
        }
    }

    #[test]
    fn counters_are_written_as_four_values() {
        let json = serde_json::to_string(&CountersRecord::from(&IdCounters::default())).unwrap();

        assert_eq!(json, "[1,1,1,1]");
    }

    #[test]
    fn legacy_verification_requests_are_discarded() {
        let record: VerificationRequestsRecord =
            serde_json::from_str(r#"["user_1", "user_2"]"#).unwrap();

        assert!(matches!(record, VerificationRequestsRecord::Legacy(_)));
        assert!(Vec::<VerificationRequest>::from(record).is_empty());
    }

    #[test]
    fn current_verification_requests_are_kept() {
        let json = r#"[{
            "user": { "id": 3, "username": "hashir", "full_name": "Hashir" },
            "evidence_path": "/tmp/id.png",
            "created_at": 1700000000000,
            "resolved": false
        }]"#;

        let record: VerificationRequestsRecord = serde_json::from_str(json).unwrap();
        let requests = Vec::<VerificationRequest>::from(record);

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user.username, "hashir");
        assert!(!requests[0].resolved);
    }
}
