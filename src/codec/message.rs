//! Whole-message decode and encode.

use rustc_hash::FxHashMap;

use super::header::Header;
use super::record::{Question, Record};
use super::wire::Cursor;
use super::{HEADER_LEN, MAX_EDNS_PAYLOAD};
use crate::error::DnsError;

/// One parsed datagram: header plus the four ordered sections. The section
/// vectors are authoritative; header counts are rewritten from them on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authority: Vec<Record>,
    pub additional: Vec<Record>,
}

impl Message {
    /// Decode a received datagram.
    ///
    /// Sections share one cursor so that compression pointers in later
    /// sections may reference names emitted in earlier ones. Bytes trailing
    /// the last record are tolerated.
    pub fn parse(data: &[u8]) -> Result<Self, DnsError> {
        if data.len() < HEADER_LEN {
            return Err(DnsError::ParseTooShort);
        }
        if data.len() > MAX_EDNS_PAYLOAD {
            return Err(DnsError::ParseTruncated);
        }

        let header = Header::decode(data)?;
        let mut cur = Cursor::new(data);
        cur.set_pos(HEADER_LEN);

        let mut questions = Vec::with_capacity(usize::from(header.qdcount));
        for _ in 0..header.qdcount {
            questions.push(Question::decode(&mut cur)?);
        }
        let mut answers = Vec::with_capacity(usize::from(header.ancount));
        for _ in 0..header.ancount {
            answers.push(Record::decode(&mut cur)?);
        }
        let mut authority = Vec::with_capacity(usize::from(header.nscount));
        for _ in 0..header.nscount {
            authority.push(Record::decode(&mut cur)?);
        }
        let mut additional = Vec::with_capacity(usize::from(header.arcount));
        for _ in 0..header.arcount {
            additional.push(Record::decode(&mut cur)?);
        }

        Ok(Message {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }

    /// Serialize to wire format.
    ///
    /// A single compression table is threaded through every name in every
    /// section; its offsets are datagram-absolute because everything is
    /// written into one buffer starting at the header.
    pub fn encode(&self) -> Result<Vec<u8>, DnsError> {
        let mut header = self.header;
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authority.len() as u16;
        header.arcount = self.additional.len() as u16;

        let mut buf = Vec::with_capacity(512);
        header.encode(&mut buf);

        let mut table: FxHashMap<String, u16> = FxHashMap::default();
        for question in &self.questions {
            question.encode(&mut table, &mut buf)?;
        }
        for record in self
            .answers
            .iter()
            .chain(&self.authority)
            .chain(&self.additional)
        {
            record.encode(&mut table, &mut buf)?;
        }

        if buf.len() > MAX_EDNS_PAYLOAD {
            return Err(DnsError::EncodeOverflow);
        }
        Ok(buf)
    }
}
