//! Builds the outbound mDNS query for a resolution.

use sonar_common::config::QueryKind;
use sonar_protocols::dns::{self, EncodeError, Question};

/// An encoded query, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    bytes: Vec<u8>,
    questions: Vec<Question>,
}

impl Query {
    /// One question per protocol, in the given order.
    pub fn build<S: AsRef<str>>(protocols: &[S], kind: QueryKind) -> Result<Self, EncodeError> {
        let questions: Vec<Question> = protocols
            .iter()
            .map(|protocol| Question::new(protocol.as_ref(), kind))
            .collect();
        let bytes: Vec<u8> = dns::encode_query(&questions)?;
        Ok(Self { bytes, questions })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
