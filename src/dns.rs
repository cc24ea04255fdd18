//! DNS wire format helpers: header flags, question name decoding and
//! REFUSED reply synthesis.
//!
//! Only the parts of RFC 1035 the proxy needs are handled here. Messages are
//! otherwise passed through as opaque bytes.

use crate::error::ParseError;

pub const HEADER_LEN: usize = 12;

/// Length bytes at or above this value are compression pointers.
const POINTER_MASK: u8 = 0xC0;

/// Response codes carried in the low nibble of header byte 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Rcode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NxDomain = 3,
    NotImp = 4,
    Refused = 5,
}

/// The 16 flag bits of a DNS header (bytes 2 and 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderFlags {
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: u8,
}

impl HeaderFlags {
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        let [hi, lo] = bytes;
        Self {
            qr: hi & 0x80 != 0,
            opcode: (hi >> 3) & 0x0F,
            aa: hi & 0x04 != 0,
            tc: hi & 0x02 != 0,
            rd: hi & 0x01 != 0,
            ra: lo & 0x80 != 0,
            z: (lo >> 4) & 0x07,
            rcode: lo & 0x0F,
        }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        let mut hi = (self.opcode & 0x0F) << 3;
        if self.qr {
            hi |= 0x80;
        }
        if self.aa {
            hi |= 0x04;
        }
        if self.tc {
            hi |= 0x02;
        }
        if self.rd {
            hi |= 0x01;
        }

        let mut lo = ((self.z & 0x07) << 4) | (self.rcode & 0x0F);
        if self.ra {
            lo |= 0x80;
        }

        [hi, lo]
    }

    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.rcode = rcode as u8;
    }
}

/// The fixed 12-byte DNS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: HeaderFlags,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < HEADER_LEN {
            return Err(ParseError::TooShort { len: data.len() });
        }

        let word = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);

        Ok(Self {
            id: word(0),
            flags: HeaderFlags::from_bytes([data[2], data[3]]),
            qdcount: word(4),
            ancount: word(6),
            nscount: word(8),
            arcount: word(10),
        })
    }
}

/// Read the transaction ID, if the message is long enough to carry one.
pub fn transaction_id(data: &[u8]) -> Option<u16> {
    match data {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

pub fn read_flags(data: &[u8]) -> Result<HeaderFlags, ParseError> {
    Header::parse(data).map(|h| h.flags)
}

/// Build a REFUSED reply echoing the request.
///
/// The reply is a fresh copy of the request with QR set and RCODE replaced;
/// every other bit, the ID, the counts and the question are left as sent.
/// Callers must have checked that `request` holds a full header.
pub fn make_refused(request: &[u8]) -> Vec<u8> {
    let mut reply = request.to_vec();

    let mut flags = HeaderFlags::from_bytes([reply[2], reply[3]]);
    flags.qr = true;
    flags.set_rcode(Rcode::Refused);
    let [hi, lo] = flags.to_bytes();
    reply[2] = hi;
    reply[3] = lo;

    reply
}

/// Decode a length-prefixed label chain starting at `offset`.
///
/// Returns the dotted name (no trailing dot) and the number of bytes
/// consumed including the terminating zero byte. Label octets are kept
/// byte-for-byte, each byte mapped to the char with the same code point,
/// and no case folding is applied.
pub fn decode_name(data: &[u8], offset: usize) -> Result<(String, usize), ParseError> {
    if offset >= data.len() {
        return Err(ParseError::Empty { offset });
    }

    let mut domain = String::new();
    let mut pos = offset;

    loop {
        let Some(&len) = data.get(pos) else {
            return Err(ParseError::Truncated { offset: pos });
        };

        if len == 0 {
            pos += 1;
            break;
        }
        if len >= POINTER_MASK {
            return Err(ParseError::CompressionPointer { offset: pos });
        }

        let start = pos + 1;
        let end = start + len as usize;
        let Some(label) = data.get(start..end) else {
            return Err(ParseError::Truncated { offset: pos });
        };

        domain.extend(label.iter().map(|&b| b as char));
        domain.push('.');
        pos = end;
    }

    if domain.ends_with('.') {
        domain.pop();
    }

    Ok((domain, pos - offset))
}

/// Encode a dotted name into label form. Empty labels are skipped, so
/// `""` and `"."` both encode to the root name.
pub fn encode_name(domain: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(domain.len() + 2);
    for label in domain.split('.').filter(|l| !l.is_empty()) {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
    buf
}

/// Build a single-question query, mainly for tests and benchmarks.
pub fn build_query(id: u16, domain: &str, qtype: u16) -> Vec<u8> {
    let mut query = Vec::with_capacity(HEADER_LEN + domain.len() + 6);
    query.extend_from_slice(&id.to_be_bytes());
    query.extend_from_slice(&[0x01, 0x00]); // RD
    query.extend_from_slice(&[0x00, 0x01]); // QDCOUNT
    query.extend_from_slice(&[0x00; 6]);
    query.extend_from_slice(&encode_name(domain));
    query.extend_from_slice(&qtype.to_be_bytes());
    query.extend_from_slice(&[0x00, 0x01]); // IN
    query
}

/// Query types the proxy knows by name, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    A,
    Ns,
    Md,
    Mf,
    Cname,
    Soa,
    Mb,
    Mg,
    Mr,
    Null,
    Wks,
    Ptr,
    Hinfo,
    Minfo,
    Mx,
    Txt,
    Aaaa,
    Any,
    Other(u16),
}

impl QueryType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::Ns,
            3 => Self::Md,
            4 => Self::Mf,
            5 => Self::Cname,
            6 => Self::Soa,
            7 => Self::Mb,
            8 => Self::Mg,
            9 => Self::Mr,
            10 => Self::Null,
            11 => Self::Wks,
            12 => Self::Ptr,
            13 => Self::Hinfo,
            14 => Self::Minfo,
            15 => Self::Mx,
            16 => Self::Txt,
            28 => Self::Aaaa,
            255 => Self::Any,
            other => Self::Other(other),
        }
    }

    /// Read the QTYPE that follows a name ending at `offset`.
    pub fn read(data: &[u8], offset: usize) -> Option<Self> {
        let bytes = data.get(offset..offset + 2)?;
        Some(Self::from_u16(u16::from_be_bytes([bytes[0], bytes[1]])))
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::Ns => "NS",
            Self::Md => "MD",
            Self::Mf => "MF",
            Self::Cname => "CNAME",
            Self::Soa => "SOA",
            Self::Mb => "MB",
            Self::Mg => "MG",
            Self::Mr => "MR",
            Self::Null => "NULL",
            Self::Wks => "WKS",
            Self::Ptr => "PTR",
            Self::Hinfo => "HINFO",
            Self::Minfo => "MINFO",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Aaaa => "AAAA",
            Self::Any => "*",
            Self::Other(n) => return write!(f, "TYPE{}", n),
        };
        f.write_str(name)
    }
}
