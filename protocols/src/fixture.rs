//! Wire-format packet builder for tests.
//!
//! Writes uncompressed messages that [`crate::dns::decode`] understands.

use crate::dns::{Record, RecordData};

const TYPE_A: u16 = 1;
const TYPE_PTR: u16 = 12;
const TYPE_TXT: u16 = 16;
const TYPE_AAAA: u16 = 28;
const TYPE_SRV: u16 = 33;
const CLASS_IN: u16 = 1;

const FLAGS_RESPONSE: u16 = 0x8400;
const FLAGS_QUERY: u16 = 0x0000;

#[derive(Debug, Clone)]
pub struct PacketBuilder {
    flags: u16,
    answers: Vec<Record>,
    additionals: Vec<Record>,
}

impl PacketBuilder {
    /// An authoritative response.
    pub fn response() -> Self {
        Self {
            flags: FLAGS_RESPONSE,
            answers: Vec::new(),
            additionals: Vec::new(),
        }
    }

    /// A message with the response flag unset, as a query echo would be.
    pub fn query() -> Self {
        Self {
            flags: FLAGS_QUERY,
            answers: Vec::new(),
            additionals: Vec::new(),
        }
    }

    pub fn answer(mut self, record: Record) -> Self {
        self.answers.push(record);
        self
    }

    pub fn additional(mut self, record: Record) -> Self {
        self.additionals.push(record);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::with_capacity(512);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&self.flags.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&(self.additionals.len() as u16).to_be_bytes());

        for record in self.answers.iter().chain(self.additionals.iter()) {
            write_record(&mut buf, record);
        }
        buf
    }
}

fn write_record(buf: &mut Vec<u8>, record: &Record) {
    let (rtype, rdata): (u16, Vec<u8>) = match &record.data {
        RecordData::A(addr) => (TYPE_A, addr.octets().to_vec()),
        RecordData::Aaaa(addr) => (TYPE_AAAA, addr.octets().to_vec()),
        RecordData::Ptr(target) => (TYPE_PTR, encode_name(target)),
        RecordData::Srv {
            priority,
            weight,
            port,
            target,
        } => {
            let mut rdata: Vec<u8> = Vec::new();
            rdata.extend_from_slice(&priority.to_be_bytes());
            rdata.extend_from_slice(&weight.to_be_bytes());
            rdata.extend_from_slice(&port.to_be_bytes());
            rdata.extend_from_slice(&encode_name(target));
            (TYPE_SRV, rdata)
        }
        RecordData::Txt(strings) => {
            let mut rdata: Vec<u8> = Vec::new();
            for string in strings {
                rdata.push(string.len() as u8);
                rdata.extend_from_slice(string.as_bytes());
            }
            if rdata.is_empty() {
                rdata.push(0);
            }
            (TYPE_TXT, rdata)
        }
        RecordData::Other => panic!("fixture cannot encode RecordData::Other"),
    };

    buf.extend_from_slice(&encode_name(&record.name));
    buf.extend_from_slice(&rtype.to_be_bytes());
    buf.extend_from_slice(&CLASS_IN.to_be_bytes());
    buf.extend_from_slice(&record.ttl.to_be_bytes());
    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&rdata);
}

fn encode_name(name: &str) -> Vec<u8> {
    let mut encoded: Vec<u8> = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    encoded
}
