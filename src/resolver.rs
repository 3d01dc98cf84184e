//! Per-datagram decision pipeline.
//!
//! The listener hands in raw bytes; the resolver parses them, checks every
//! question against the denylist, and answers with what to do: send back a
//! synthesized blocked response, forward the raw datagram upstream, or drop.
//! The socket I/O itself stays in the server.

use tracing::debug;

use crate::codec::{qtype, rcode, Message, Record};
use crate::error::DnsError;
use crate::filter::Blocklist;

/// Action to take for one received datagram.
pub enum QueryAction {
    /// A question hit the denylist; send this response and stop.
    Blocked { response: Vec<u8>, domain: String },
    /// No question hit; relay the raw datagram upstream.
    Forward { domain: String, qtype: u16 },
    /// Nothing to answer and nothing to forward (a response with no
    /// questions landed on the listener port).
    Ignore,
    /// The datagram failed to parse or the blocked response failed to encode.
    Invalid(DnsError),
}

/// Holds the denylist and turns parsed queries into actions.
pub struct Resolver {
    blocklist: Blocklist,
}

impl Resolver {
    pub fn new(blocklist: Blocklist) -> Self {
        Self { blocklist }
    }

    /// Decide what to do with one raw datagram.
    ///
    /// Only the first denylisted question triggers synthesis; standard stubs
    /// never send more than one anyway (and the header codec enforces it).
    pub fn process_query(&self, data: &[u8]) -> QueryAction {
        let mut msg = match Message::parse(data) {
            Ok(msg) => msg,
            Err(e) => return QueryAction::Invalid(e),
        };

        for question in &msg.questions {
            debug!(name = %question.name, qtype = question.qtype, "question");
        }

        let hit = msg
            .questions
            .iter()
            .position(|q| self.blocklist.matches(&q.name));

        match hit {
            Some(idx) => {
                let domain = msg.questions[idx].name.clone();
                synthesize_blocked(&mut msg, idx);
                match msg.encode() {
                    Ok(response) => QueryAction::Blocked { response, domain },
                    Err(e) => QueryAction::Invalid(e),
                }
            }
            None => match msg.questions.first() {
                Some(first) => QueryAction::Forward {
                    domain: first.name.clone(),
                    qtype: first.qtype,
                },
                None => QueryAction::Ignore,
            },
        }
    }

    /// Number of domains in the denylist.
    pub fn blocked_count(&self) -> usize {
        self.blocklist.len()
    }
}

/// Mutate a parsed query into a blocked response.
///
/// QR=1, RA=1, AA=0, RCODE=NOERROR; RD and TC are echoed untouched. Authority
/// and additional records are dropped (including any EDNS OPT pseudo-RR). For
/// HTTPS questions the answer section stays empty: an empty NOERROR cleanly
/// says "no HTTPS binding", and clients fall back to A/AAAA lookups that this
/// forwarder also intercepts. Everything else gets one null-route answer with
/// TTL=0 so downstream caches never pin the block.
fn synthesize_blocked(msg: &mut Message, question_idx: usize) {
    let (name, asked_type, asked_class) = {
        let q = &msg.questions[question_idx];
        (q.name.clone(), q.qtype, q.qclass)
    };

    msg.header.qr = true;
    msg.header.ra = true;
    msg.header.aa = false;
    msg.header.rcode = rcode::NOERROR;
    msg.authority.clear();
    msg.additional.clear();

    if asked_type == qtype::HTTPS {
        msg.answers.clear();
    } else {
        let rdlen = if asked_type == qtype::AAAA { 16 } else { 4 };
        msg.answers = vec![Record {
            name,
            rtype: asked_type,
            class: asked_class,
            ttl: 0,
            rdata: vec![0; rdlen],
        }];
    }
}
