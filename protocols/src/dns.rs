//! # DNS Codec
//!
//! Converts between mDNS wire bytes and an owned message model.
//!
//! Parsing is delegated to `dns-parser`; its borrowed packet is copied into
//! [`DnsResponse`] right away so responses can outlive the receive buffer and
//! be merged with later packets. Names are always fully qualified, with a
//! trailing dot.

use std::net::{Ipv4Addr, Ipv6Addr};

use dns_parser::{Builder, Packet, QueryClass, QueryType, RData, ResourceRecord};
use sonar_common::config::{MAX_LABEL_LEN, QueryKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed DNS packet: {0}")]
    Malformed(#[from] dns_parser::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("a query needs at least one question")]
    NoQuestions,
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("label '{0}' exceeds {MAX_LABEL_LEN} bytes")]
    LabelTooLong(String),
    #[error("query does not fit in a single datagram")]
    Truncated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub id: u16,
    pub is_response: bool,
    pub authoritative: bool,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ptr(String),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Txt(Vec<String>),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
}

impl Record {
    pub fn new(name: impl Into<String>, ttl: u32, data: RecordData) -> Self {
        Self {
            name: fqdn(&name.into()),
            ttl,
            data,
        }
    }

    pub fn a(&self) -> Option<Ipv4Addr> {
        match self.data {
            RecordData::A(addr) => Some(addr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DnsResponse {
    pub header: Header,
    pub answers: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl DnsResponse {
    /// Every record, answers first.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.answers.iter().chain(self.additionals.iter())
    }

    /// A-record addresses from answers and additionals, in order of appearance.
    pub fn a_records(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.records().filter_map(Record::a)
    }
}

/// A single question of an outbound query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub kind: QueryKind,
}

impl Question {
    pub fn new(name: impl Into<String>, kind: QueryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<DnsResponse, DecodeError> {
    let packet: Packet = Packet::parse(bytes)?;

    Ok(DnsResponse {
        header: Header {
            id: packet.header.id,
            is_response: !packet.header.query,
            authoritative: packet.header.authoritative,
            truncated: packet.header.truncated,
        },
        answers: packet.answers.iter().map(convert_record).collect(),
        additionals: packet.additional.iter().map(convert_record).collect(),
    })
}

/// Encodes a multicast query: id 0, no recursion, every question with class ANY.
pub fn encode_query(questions: &[Question]) -> Result<Vec<u8>, EncodeError> {
    if questions.is_empty() {
        return Err(EncodeError::NoQuestions);
    }

    let mut builder: Builder = Builder::new_query(0, false);
    for question in questions {
        let qname: &str = question.name.trim_end_matches('.');
        validate_name(qname, &question.name)?;

        let qtype: QueryType = match question.kind {
            QueryKind::Ptr => QueryType::PTR,
            QueryKind::Any => QueryType::All,
        };
        builder.add_question(qname, false, qtype, QueryClass::Any);
    }

    builder.build().map_err(|_truncated| EncodeError::Truncated)
}

/// Appends the root label if it is missing.
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

fn validate_name(qname: &str, original: &str) -> Result<(), EncodeError> {
    if qname.is_empty() {
        return Err(EncodeError::InvalidName(original.to_string()));
    }
    for label in qname.split('.') {
        if label.is_empty() {
            return Err(EncodeError::InvalidName(original.to_string()));
        }
        // dns-parser's builder asserts on labels of 63 bytes or more.
        if label.len() >= MAX_LABEL_LEN {
            return Err(EncodeError::LabelTooLong(label.to_string()));
        }
    }
    Ok(())
}

fn convert_record(record: &ResourceRecord) -> Record {
    let data: RecordData = match &record.data {
        RData::A(a) => RecordData::A(a.0),
        RData::AAAA(aaaa) => RecordData::Aaaa(aaaa.0),
        RData::PTR(ptr) => RecordData::Ptr(fqdn(&ptr.0.to_string())),
        RData::SRV(srv) => RecordData::Srv {
            priority: srv.priority,
            weight: srv.weight,
            port: srv.port,
            target: fqdn(&srv.target.to_string()),
        },
        RData::TXT(txt) => RecordData::Txt(
            txt.iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .collect(),
        ),
        _ => RecordData::Other,
    };

    Record {
        name: fqdn(&record.name.to_string()),
        ttl: record.ttl,
        data,
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
