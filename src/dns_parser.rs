//! DNS parsing utility.
//!
//! [DnsIncoming] is the logic representation of an incoming DNS packet.
//! [DnsOutgoing] is the logic representation of an outgoing DNS query.
//!
//! Only the record types needed for service browsing are decoded into
//! [RecordData]: PTR, SRV, A and AAAA. Records of any other type are
//! skipped over using their RDLENGTH, without failing the whole packet.

#[cfg(feature = "logging")]
use crate::log::trace;
use crate::error::{Error, Result};
use std::{
    collections::HashMap,
    convert::TryInto,
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
    str,
};

/// DNS resource record types, stored as `u16`. Can do `as u16` when needed.
///
/// See [RFC 1035 section 3.2.2](https://datatracker.ietf.org/doc/html/rfc1035#section-3.2.2)
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
#[non_exhaustive]
#[repr(u16)]
pub enum RRType {
    /// DNS record type for IPv4 address
    A = 1,

    /// DNS record type for Pointer
    PTR = 12,

    /// DNS record type for IPv6 address
    AAAA = 28,

    /// DNS record type for Service
    SRV = 33,

    /// DNS record type for any records (wildcard)
    ANY = 255,
}

impl RRType {
    /// Converts `u16` into `RRType` if possible.
    pub const fn from_u16(value: u16) -> Option<RRType> {
        match value {
            1 => Some(RRType::A),
            12 => Some(RRType::PTR),
            28 => Some(RRType::AAAA),
            33 => Some(RRType::SRV),
            255 => Some(RRType::ANY),
            _ => None,
        }
    }
}

impl fmt::Display for RRType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RRType::A => write!(f, "TYPE_A"),
            RRType::PTR => write!(f, "TYPE_PTR"),
            RRType::AAAA => write!(f, "TYPE_AAAA"),
            RRType::SRV => write!(f, "TYPE_SRV"),
            RRType::ANY => write!(f, "TYPE_ANY"),
        }
    }
}

/// The class value for the Internet.
pub const CLASS_IN: u16 = 1;
pub const CLASS_MASK: u16 = 0x7FFF;

/// Max size of UDP datagram payload.
///
/// It is calculated as: 9000 bytes - IP header 20 bytes - UDP header 8 bytes.
/// Reference: [RFC6762 section 17](https://datatracker.ietf.org/doc/html/rfc6762#section-17)
pub const MAX_MSG_ABSOLUTE: usize = 8972;

const MSG_HEADER_LEN: usize = 12;

// Definitions for DNS message header "flags" field
//
// The "flags" field is 16-bit long, in this format:
// (RFC 1035 section 4.1.1)
//
//   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
// |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
//
pub const FLAGS_QR_MASK: u16 = 0x8000; // mask for query/response bit

/// Flag bit to indicate a query
pub const FLAGS_QR_QUERY: u16 = 0x0000;

/// Flag bit to indicate a response
pub const FLAGS_QR_RESPONSE: u16 = 0x8000;

const U16_SIZE: usize = 2;

/// The decoded payload of one resource record.
///
/// A record is identified by its owner name together with this payload;
/// the TTL is deliberately not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    /// PTR: the owner is a service type, `target` is a service instance name.
    Ptr {
        /// Full name of the service instance.
        target: String,
    },

    /// SRV: the owner is a service instance name.
    Srv {
        /// Target host that runs the instance.
        hostname: String,
        /// Port the instance listens on.
        port: u16,
    },

    /// A: the owner is a hostname.
    A {
        /// IPv4 address of the host.
        addr: Ipv4Addr,
    },

    /// AAAA: the owner is a hostname.
    Aaaa {
        /// IPv6 address of the host.
        addr: Ipv6Addr,
    },
}

impl RecordData {
    /// Returns the resource record type of this payload.
    pub const fn rr_type(&self) -> RRType {
        match self {
            Self::Ptr { .. } => RRType::PTR,
            Self::Srv { .. } => RRType::SRV,
            Self::A { .. } => RRType::A,
            Self::Aaaa { .. } => RRType::AAAA,
        }
    }
}

/// One decoded resource record from an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsAnswer {
    /// The owner name of the record.
    pub name: String,

    /// The typed payload.
    pub data: RecordData,

    /// Time to live in seconds. Zero means "goodbye": the record
    /// should be dropped from any cache.
    pub ttl: u32,
}

/// A DNS question to be sent in a query.
#[derive(Debug)]
struct DnsQuestion {
    name: String,
    ty: RRType,
}

/// Representation of one outgoing DNS query message.
pub struct DnsOutgoing {
    flags: u16,
    id: u16,
    questions: Vec<DnsQuestion>,
}

impl DnsOutgoing {
    pub fn new(flags: u16) -> Self {
        Self {
            flags,
            id: 0,
            questions: Vec::new(),
        }
    }

    pub const fn is_query(&self) -> bool {
        (self.flags & FLAGS_QR_MASK) == FLAGS_QR_QUERY
    }

    pub fn add_question(&mut self, name: &str, qtype: RRType) {
        self.questions.push(DnsQuestion {
            name: name.to_string(),
            ty: qtype,
        });
    }

    /// Returns the actual DNS packet data to be sent on the wire.
    ///
    /// A browsing query carries at most a handful of questions and always
    /// fits one packet, so no truncation handling is needed here.
    pub fn to_data_on_wire(&self) -> Vec<u8> {
        let mut packet = DnsOutPacket::new();

        for question in self.questions.iter() {
            packet.write_name(&question.name);
            packet.write_short(question.ty as u16);
            packet.write_short(CLASS_IN);
        }

        packet.write_header(self.id, self.flags, self.questions.len() as u16);
        packet.to_bytes()
    }
}

/// A single encoded packet for an outgoing DNS message.
struct DnsOutPacket {
    /// All chunks in `data` concatenated is the actual packet on the wire.
    data: Vec<Vec<u8>>,

    /// Current logical size of the packet. It starts with the size of the
    /// mandatory header.
    size: usize,

    /// k: name, v: offset
    names: HashMap<String, u16>,
}

impl DnsOutPacket {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            size: MSG_HEADER_LEN, // Header is mandatory.
            names: HashMap::new(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.data.concat()
    }

    // Write name to packet
    //
    // [RFC1035]
    // 4.1.4. Message compression
    //
    // In order to reduce the size of messages, the domain system utilizes a
    // compression scheme which eliminates the repetition of domain names in
    // a message. In this scheme, an entire domain name or a list of labels
    // at the end of a domain name is replaced with a pointer to a prior
    // occurrence of the same name.
    fn write_name(&mut self, name: &str) {
        // ignore the ending "." if exists
        let end = name.len();
        let end = if end > 0 && &name[end - 1..] == "." {
            end - 1
        } else {
            end
        };

        let mut here = 0;
        while here < end {
            const POINTER_MASK: u16 = 0xC000;
            let remaining = &name[here..end];

            // Check if 'remaining' already appeared in this message
            match self.names.get(remaining) {
                Some(offset) => {
                    let pointer = *offset | POINTER_MASK;
                    self.write_short(pointer);
                    break;
                }
                None => {
                    // Remember the remaining parts so we can point to it
                    self.names.insert(remaining.to_string(), self.size as u16);

                    // Find the current label to write into the packet
                    let stop = remaining.find('.').map_or(end, |i| here + i);
                    let label = &name[here..stop];
                    self.write_utf8(label);

                    here = stop + 1; // move past the current label
                }
            }

            if here >= end {
                self.write_byte(0); // name ends with 0 if not using a pointer
            }
        }
    }

    fn write_utf8(&mut self, utf: &str) {
        assert!(utf.len() < 64);
        self.write_byte(utf.len() as u8);
        self.write_bytes(utf.as_bytes());
    }

    fn write_bytes(&mut self, s: &[u8]) {
        self.data.push(s.to_vec());
        self.size += s.len();
    }

    fn write_short(&mut self, short: u16) {
        self.data.push(short.to_be_bytes().to_vec());
        self.size += 2;
    }

    fn write_byte(&mut self, byte: u8) {
        self.data.push(vec![byte]);
        self.size += 1;
    }

    fn insert_short(&mut self, index: usize, value: u16) {
        self.data.insert(index, value.to_be_bytes().to_vec());
        self.size += 2;
    }

    /// Writes the header fields and finishes the packet.
    ///
    /// The header format is based on RFC 1035 section 4.1.1:
    /// https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
    fn write_header(&mut self, id: u16, flags: u16, q_count: u16) {
        // A query carries no answer, authority or additional records.
        self.insert_short(0, 0); // ARCOUNT
        self.insert_short(0, 0); // NSCOUNT
        self.insert_short(0, 0); // ANCOUNT
        self.insert_short(0, q_count);
        self.insert_short(0, flags);
        self.insert_short(0, id);

        // Adjust the size as it was already initialized to include the header.
        self.size -= MSG_HEADER_LEN;
    }
}

/// An incoming DNS message. It could be a query or a response.
#[derive(Debug)]
pub struct DnsIncoming {
    offset: usize,
    data: Vec<u8>,
    answers: Vec<DnsAnswer>,
    id: u16,
    flags: u16,
    num_questions: u16,
    num_answers: u16,
    num_authorities: u16,
    num_additionals: u16,
}

impl DnsIncoming {
    pub fn new(data: Vec<u8>) -> Result<Self> {
        let mut incoming = Self {
            offset: 0,
            data,
            answers: Vec::new(),
            id: 0,
            flags: 0,
            num_questions: 0,
            num_answers: 0,
            num_authorities: 0,
            num_additionals: 0,
        };

        incoming.read_header()?;
        incoming.read_questions()?;

        // For browsing we treat the answer, authority and additional
        // sections uniformly: a record in any of them updates the cache.
        let record_count = incoming.num_answers as u32
            + incoming.num_authorities as u32
            + incoming.num_additionals as u32;
        incoming.read_rr_records(record_count)?;

        Ok(incoming)
    }

    /// All decoded resource records, regardless of which section carried them.
    pub fn answers(&self) -> &[DnsAnswer] {
        &self.answers
    }

    /// Consumes the message and yields its decoded records.
    pub fn into_answers(self) -> Vec<DnsAnswer> {
        self.answers
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn num_questions(&self) -> u16 {
        self.num_questions
    }

    pub const fn is_query(&self) -> bool {
        (self.flags & FLAGS_QR_MASK) == FLAGS_QR_QUERY
    }

    pub const fn is_response(&self) -> bool {
        (self.flags & FLAGS_QR_MASK) == FLAGS_QR_RESPONSE
    }

    fn read_header(&mut self) -> Result<()> {
        if self.data.len() < MSG_HEADER_LEN {
            return Err(Error::ParseDnsMessage(format!(
                "incoming header is too short: {} bytes",
                self.data.len()
            )));
        }

        let data = &self.data[0..];
        self.id = u16_from_be_slice(&data[..2]);
        self.flags = u16_from_be_slice(&data[2..4]);
        self.num_questions = u16_from_be_slice(&data[4..6]);
        self.num_answers = u16_from_be_slice(&data[6..8]);
        self.num_authorities = u16_from_be_slice(&data[8..10]);
        self.num_additionals = u16_from_be_slice(&data[10..12]);

        self.offset = MSG_HEADER_LEN;

        trace!(
            "read_header: id {}, {} questions {} answers {} authorities {} additionals",
            self.id,
            self.num_questions,
            self.num_answers,
            self.num_authorities,
            self.num_additionals
        );
        Ok(())
    }

    /// Walks over the question section. The questions themselves are not
    /// kept: a browser only consumes responses. The walk is still needed
    /// to find where the answer section starts.
    fn read_questions(&mut self) -> Result<()> {
        for i in 0..self.num_questions {
            let _name = self.read_name()?;

            let data = &self.data[self.offset..];
            if data.len() < 4 {
                return Err(Error::ParseDnsMessage(format!(
                    "question idx {} too short: {}",
                    i,
                    data.len()
                )));
            }
            // QTYPE and QCLASS are not validated: an unknown question type
            // from another host must not fail the whole message.
            self.offset += 4;
        }
        Ok(())
    }

    /// Decodes a sequence of RR records (answers, authorities, additionals).
    ///
    /// A record that fails to decode, or is of a type we do not consume, is
    /// skipped over via its RDLENGTH; the remaining records in the packet
    /// are still processed.
    fn read_rr_records(&mut self, count: u32) -> Result<()> {
        trace!("read_rr_records: {}", count);

        // RFC 1035: https://datatracker.ietf.org/doc/html/rfc1035#section-3.2.1
        //
        // All RRs have the same top level format: NAME, then TYPE, CLASS,
        // TTL and RDLENGTH (10 bytes), then RDATA of RDLENGTH bytes.
        const RR_HEADER_REMAIN: usize = 10;

        for _ in 0..count {
            let name = self.read_name()?;
            let slice = &self.data[self.offset..];

            if slice.len() < RR_HEADER_REMAIN {
                return Err(Error::ParseDnsMessage(format!(
                    "RR '{}' is too short after name: {} bytes",
                    &name,
                    slice.len()
                )));
            }

            let ty = u16_from_be_slice(&slice[..2]);
            let _class = u16_from_be_slice(&slice[2..4]) & CLASS_MASK;
            let ttl = u32_from_be_slice(&slice[4..8]);
            let rdata_len = u16_from_be_slice(&slice[8..10]) as usize;
            self.offset += RR_HEADER_REMAIN;
            let next_offset = self.offset + rdata_len;

            // Sanity check for RDATA length.
            if next_offset > self.data.len() {
                return Err(Error::ParseDnsMessage(format!(
                    "RR {name} RDATA length {rdata_len} is invalid: remain data len: {}",
                    self.data.len() - self.offset
                )));
            }

            match self.read_rdata(ty, rdata_len) {
                Ok(Some(data)) => {
                    if self.offset == next_offset {
                        trace!("read_rr_records: {} {:?} ttl {}", &name, &data, ttl);
                        self.answers.push(DnsAnswer { name, data, ttl });
                    } else {
                        trace!(
                            "RR {} of type {} decoded to offset {} expected {}, skipped",
                            &name,
                            ty,
                            self.offset,
                            next_offset
                        );
                        self.offset = next_offset;
                    }
                }
                Ok(None) => {
                    trace!("Unsupported DNS record type: {} name: {}", ty, &name);
                    self.offset = next_offset;
                }
                Err(e) => {
                    trace!("skip RR {} of type {}: {}", &name, ty, e);
                    self.offset = next_offset;
                }
            }
        }

        Ok(())
    }

    /// Decodes RDATA based on the record type. Returns `Ok(None)` for
    /// types not consumed by service browsing.
    fn read_rdata(&mut self, ty: u16, rdata_len: usize) -> Result<Option<RecordData>> {
        let data = match RRType::from_u16(ty) {
            Some(RRType::PTR) => Some(RecordData::Ptr {
                target: self.read_name()?,
            }),
            Some(RRType::SRV) => {
                // priority and weight are decoded but not used: for a LAN
                // with a single server per instance they carry no signal.
                let _priority = self.read_u16()?;
                let _weight = self.read_u16()?;
                let port = self.read_u16()?;
                let hostname = self.read_name()?;
                Some(RecordData::Srv { hostname, port })
            }
            Some(RRType::A) => {
                if rdata_len != 4 {
                    return Err(Error::ParseDnsMessage(format!(
                        "A record RDATA length is {rdata_len}"
                    )));
                }
                Some(RecordData::A {
                    addr: self.read_ipv4(),
                })
            }
            Some(RRType::AAAA) => {
                if rdata_len != 16 {
                    return Err(Error::ParseDnsMessage(format!(
                        "AAAA record RDATA length is {rdata_len}"
                    )));
                }
                Some(RecordData::Aaaa {
                    addr: self.read_ipv6(),
                })
            }
            _ => None,
        };
        Ok(data)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let slice = &self.data[self.offset..];
        if slice.len() < U16_SIZE {
            return Err(Error::ParseDnsMessage(format!(
                "read_u16: slice len is only {}",
                slice.len()
            )));
        }
        let num = u16_from_be_slice(&slice[..U16_SIZE]);
        self.offset += U16_SIZE;
        Ok(num)
    }

    fn read_ipv4(&mut self) -> Ipv4Addr {
        // The length was checked against RDLENGTH by the caller.
        let bytes: [u8; 4] = self.data[self.offset..self.offset + 4]
            .try_into()
            .unwrap_or_default();
        self.offset += bytes.len();
        Ipv4Addr::from(bytes)
    }

    fn read_ipv6(&mut self) -> Ipv6Addr {
        let bytes: [u8; 16] = self.data[self.offset..self.offset + 16]
            .try_into()
            .unwrap_or_default();
        self.offset += bytes.len();
        Ipv6Addr::from(bytes)
    }

    /// Reads a domain name at the current location of `self.data`.
    ///
    /// See https://datatracker.ietf.org/doc/html/rfc1035#section-3.1 for
    /// domain name encoding.
    fn read_name(&mut self) -> Result<String> {
        let data = &self.data[..];
        let start_offset = self.offset;
        let mut offset = start_offset;
        let mut name = "".to_string();
        let mut at_end = false;

        // From RFC1035:
        // "...Domain names in messages are expressed in terms of a sequence
        // of labels. Each label is represented as a one octet length field
        // followed by that number of octets."
        //
        // "...The compression scheme allows a domain name in a message to be
        // represented as either:
        // - a sequence of labels ending in a zero octet
        // - a pointer
        // - a sequence of labels ending with a pointer"
        loop {
            if offset >= data.len() {
                return Err(Error::ParseDnsMessage(format!(
                    "read_name: offset: {} data len {}",
                    offset,
                    data.len(),
                )));
            }
            let length = data[offset];

            // "...a domain name is terminated by a length byte of zero."
            if length == 0 {
                if !at_end {
                    self.offset = offset + 1;
                }
                break; // The end of the name
            }

            // Check the first 2 bits for possible "Message compression".
            match length & 0xC0 {
                0x00 => {
                    // regular utf8 string with length
                    offset += 1;
                    let ending = offset + length as usize;

                    // Never read beyond the whole data length.
                    if ending > data.len() {
                        return Err(Error::ParseDnsMessage(format!(
                            "read_name: ending {} exceeds data length {}",
                            ending,
                            data.len()
                        )));
                    }

                    name += str::from_utf8(&data[offset..ending])
                        .map_err(|e| Error::ParseDnsMessage(format!("read_name: from_utf8: {}", e)))?;
                    name += ".";
                    offset += length as usize;
                }
                0xC0 => {
                    // Message compression.
                    // See https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4
                    let slice = &data[offset..];
                    if slice.len() < U16_SIZE {
                        return Err(Error::ParseDnsMessage(format!(
                            "read_name: u16 slice len is only {}",
                            slice.len()
                        )));
                    }
                    let pointer = (u16_from_be_slice(slice) ^ 0xC000) as usize;
                    if pointer >= start_offset {
                        // Error: could trigger an infinite loop.
                        return Err(Error::ParseDnsMessage(format!(
                            "invalid name compression: pointer {} must be less than the start offset {}",
                            &pointer, &start_offset
                        )));
                    }

                    // A pointer marks the end of a domain name.
                    if !at_end {
                        self.offset = offset + U16_SIZE;
                        at_end = true;
                    }
                    offset = pointer;
                }
                _ => {
                    return Err(Error::ParseDnsMessage(format!(
                        "bad name with invalid length: 0x{:x} offset {}",
                        length, offset,
                    )));
                }
            };
        }

        Ok(name)
    }
}

const fn u16_from_be_slice(bytes: &[u8]) -> u16 {
    let u8_array: [u8; 2] = [bytes[0], bytes[1]];
    u16::from_be_bytes(u8_array)
}

const fn u32_from_be_slice(s: &[u8]) -> u32 {
    let u8_array: [u8; 4] = [s[0], s[1], s[2], s[3]];
    u32::from_be_bytes(u8_array)
}

#[cfg(test)]
mod tests {
    use super::{
        DnsIncoming, DnsOutgoing, RRType, RecordData, CLASS_IN, FLAGS_QR_QUERY, FLAGS_QR_RESPONSE,
    };

    /// Appends `name` in uncompressed label encoding.
    fn push_name(buf: &mut Vec<u8>, name: &str) {
        for label in name.trim_end_matches('.').split('.') {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
        buf.push(0);
    }

    fn push_u16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    fn push_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    fn response_header(answer_count: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        push_u16(&mut buf, 0); // id
        push_u16(&mut buf, FLAGS_QR_RESPONSE);
        push_u16(&mut buf, 0); // questions
        push_u16(&mut buf, answer_count);
        push_u16(&mut buf, 0); // authorities
        push_u16(&mut buf, 0); // additionals
        buf
    }

    fn push_rr_header(buf: &mut Vec<u8>, name: &str, ty: u16, ttl: u32, rdata_len: u16) {
        push_name(buf, name);
        push_u16(buf, ty);
        push_u16(buf, CLASS_IN);
        push_u32(buf, ttl);
        push_u16(buf, rdata_len);
    }

    #[test]
    fn test_encode_query_decode_roundtrip() {
        let mut out = DnsOutgoing::new(FLAGS_QR_QUERY);
        out.add_question("_my-service._tcp.local.", RRType::PTR);
        assert!(out.is_query());

        let bytes = out.to_data_on_wire();
        let decoded = DnsIncoming::new(bytes).expect("decode query");
        assert!(decoded.is_query());
        assert!(!decoded.is_response());
        assert_eq!(decoded.num_questions(), 1);
        assert!(decoded.answers().is_empty());
    }

    #[test]
    fn test_query_name_compression() {
        // The second question shares the full suffix of the first: it must be
        // encoded as a two-byte pointer instead of repeating the labels.
        let mut compressed = DnsOutgoing::new(FLAGS_QR_QUERY);
        compressed.add_question("_my-service._tcp.local.", RRType::PTR);
        compressed.add_question("_my-service._tcp.local.", RRType::SRV);

        let mut flat = DnsOutgoing::new(FLAGS_QR_QUERY);
        flat.add_question("_my-service._tcp.local.", RRType::PTR);
        flat.add_question("_other-svc._tcp.local.", RRType::SRV);

        let compressed_len = compressed.to_data_on_wire().len();
        let flat_len = flat.to_data_on_wire().len();
        assert!(compressed_len < flat_len);

        let decoded = DnsIncoming::new(compressed.to_data_on_wire()).expect("decode");
        assert_eq!(decoded.num_questions(), 2);
    }

    #[test]
    fn test_decode_response_all_record_types() {
        let mut buf = response_header(4);

        let mut ptr_rdata = Vec::new();
        push_name(&mut ptr_rdata, "inst._svc._tcp.local.");
        push_rr_header(&mut buf, "_svc._tcp.local.", 12, 4500, ptr_rdata.len() as u16);
        buf.extend_from_slice(&ptr_rdata);

        let mut srv_rdata = Vec::new();
        push_u16(&mut srv_rdata, 0); // priority
        push_u16(&mut srv_rdata, 0); // weight
        push_u16(&mut srv_rdata, 9757); // port
        push_name(&mut srv_rdata, "box.local.");
        push_rr_header(&mut buf, "inst._svc._tcp.local.", 33, 120, srv_rdata.len() as u16);
        buf.extend_from_slice(&srv_rdata);

        push_rr_header(&mut buf, "box.local.", 1, 120, 4);
        buf.extend_from_slice(&[192, 168, 1, 9]);

        push_rr_header(&mut buf, "box.local.", 28, 120, 16);
        buf.extend_from_slice(&std::net::Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 9).octets());

        let msg = DnsIncoming::new(buf).expect("decode response");
        assert!(msg.is_response());

        let answers = msg.answers();
        assert_eq!(answers.len(), 4);
        assert_eq!(
            answers[0].data,
            RecordData::Ptr {
                target: "inst._svc._tcp.local.".to_string()
            }
        );
        assert_eq!(
            answers[1].data,
            RecordData::Srv {
                hostname: "box.local.".to_string(),
                port: 9757
            }
        );
        assert_eq!(
            answers[2].data,
            RecordData::A {
                addr: std::net::Ipv4Addr::new(192, 168, 1, 9)
            }
        );
        assert_eq!(answers[1].ttl, 120);
    }

    #[test]
    fn test_decode_compressed_rdata_name() {
        // PTR rdata pointing back at the owner name at offset 12.
        let mut buf = response_header(1);
        let rdata: &[u8] = &[4, b'i', b'n', b's', b't', 0xC0, 12];
        push_rr_header(&mut buf, "_svc._tcp.local.", 12, 4500, rdata.len() as u16);
        buf.extend_from_slice(rdata);

        let msg = DnsIncoming::new(buf).expect("decode response");
        assert_eq!(
            msg.answers()[0].data,
            RecordData::Ptr {
                target: "inst._svc._tcp.local.".to_string()
            }
        );
    }

    #[test]
    fn test_zero_ttl_is_preserved() {
        // A "goodbye" record must come out with TTL 0 so the cache can
        // treat it as a tombstone.
        let mut buf = response_header(1);
        push_rr_header(&mut buf, "box.local.", 1, 0, 4);
        buf.extend_from_slice(&[192, 168, 1, 9]);

        let msg = DnsIncoming::new(buf).expect("decode response");
        assert_eq!(msg.answers()[0].ttl, 0);
    }

    #[test]
    fn test_unknown_record_type_is_skipped() {
        let mut buf = response_header(2);

        // TXT (type 16) is not consumed by the browser.
        push_rr_header(&mut buf, "inst._svc._tcp.local.", 16, 4500, 5);
        buf.extend_from_slice(&[4, b'a', b'=', b'b', b'c']);

        push_rr_header(&mut buf, "box.local.", 1, 120, 4);
        buf.extend_from_slice(&[10, 0, 0, 7]);

        let msg = DnsIncoming::new(buf).expect("decode response");
        assert_eq!(msg.answers().len(), 1);
        assert_eq!(
            msg.answers()[0].data,
            RecordData::A {
                addr: std::net::Ipv4Addr::new(10, 0, 0, 7)
            }
        );
    }

    #[test]
    fn test_truncated_header_is_rejected() {
        assert!(DnsIncoming::new(vec![0, 0, 0x84, 0]).is_err());
    }

    #[test]
    fn test_forward_compression_pointer_is_rejected() {
        // An owner name that is a pointer to itself would loop forever.
        let mut buf = response_header(1);
        let self_offset = buf.len() as u16;
        push_u16(&mut buf, 0xC000 | self_offset);
        push_u16(&mut buf, 1); // type A
        push_u16(&mut buf, 1); // class IN
        push_u32(&mut buf, 120);
        push_u16(&mut buf, 4);
        buf.extend_from_slice(&[10, 0, 0, 7]);

        assert!(DnsIncoming::new(buf).is_err());
    }

    #[test]
    fn test_rdata_overflow_is_rejected() {
        // RDLENGTH claims more bytes than the packet holds.
        let mut buf = response_header(1);
        push_rr_header(&mut buf, "box.local.", 1, 120, 40);
        buf.extend_from_slice(&[10, 0, 0, 7]);

        assert!(DnsIncoming::new(buf).is_err());
    }

    #[test]
    fn test_bad_label_length_is_rejected() {
        let mut buf = response_header(1);
        buf.push(0x80); // 0x80 is neither a label nor a pointer
        buf.extend_from_slice(&[0, 0, 0]);

        assert!(DnsIncoming::new(buf).is_err());
    }

    #[test]
    fn test_malformed_srv_rdata_is_skipped_not_fatal() {
        let mut buf = response_header(2);

        // SRV whose RDATA is too short for priority/weight/port.
        push_rr_header(&mut buf, "inst._svc._tcp.local.", 33, 120, 2);
        push_u16(&mut buf, 0);

        push_rr_header(&mut buf, "box.local.", 1, 120, 4);
        buf.extend_from_slice(&[10, 0, 0, 8]);

        let msg = DnsIncoming::new(buf).expect("decode response");
        assert_eq!(msg.answers().len(), 1);
        assert_eq!(msg.answers()[0].name, "box.local.");
    }
}
