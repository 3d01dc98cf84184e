//! Question and resource-record sections.

use rustc_hash::FxHashMap;

use super::name::{decode_name, encode_name};
use super::wire::{put_u16, put_u32, Cursor};
use crate::error::DnsError;

/// One entry of the question section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub(crate) fn decode(cur: &mut Cursor<'_>) -> Result<Self, DnsError> {
        let name = decode_name(cur)?;
        let qtype = cur.read_u16()?;
        let qclass = cur.read_u16()?;
        Ok(Self {
            name,
            qtype,
            qclass,
        })
    }

    pub(crate) fn encode(
        &self,
        table: &mut FxHashMap<String, u16>,
        buf: &mut Vec<u8>,
    ) -> Result<(), DnsError> {
        encode_name(&self.name, Some(table), buf)?;
        put_u16(buf, self.qtype);
        put_u16(buf, self.qclass);
        Ok(())
    }
}

/// One answer, authority, or additional record. RDATA is an opaque blob; the
/// wire RDLENGTH is always derived from it at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl Record {
    pub(crate) fn decode(cur: &mut Cursor<'_>) -> Result<Self, DnsError> {
        let name = decode_name(cur)?;
        let rtype = cur.read_u16()?;
        let class = cur.read_u16()?;
        let ttl = cur.read_u32()?;
        let rdlength = cur.read_u16()?;
        let rdata = cur.read_bytes(usize::from(rdlength))?.to_vec();
        Ok(Self {
            name,
            rtype,
            class,
            ttl,
            rdata,
        })
    }

    pub(crate) fn encode(
        &self,
        table: &mut FxHashMap<String, u16>,
        buf: &mut Vec<u8>,
    ) -> Result<(), DnsError> {
        encode_name(&self.name, Some(table), buf)?;
        put_u16(buf, self.rtype);
        put_u16(buf, self.class);
        put_u32(buf, self.ttl);
        put_u16(buf, self.rdata.len() as u16);
        buf.extend_from_slice(&self.rdata);
        Ok(())
    }
}
