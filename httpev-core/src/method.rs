//! HTTP request methods.
//!
//! Closed enumeration of every method the grammar engine recognises. A
//! syntactically valid token outside this set is not an error: it surfaces
//! as [`RequestMethod::Unknown`](crate::RequestMethod::Unknown) carrying the
//! raw token span.

use phf::phf_map;

/// HTTP method.
///
/// Discriminants follow the classic http_parser numbering so codes stay
/// stable across the host boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    Delete = 0,
    Get = 1,
    Head = 2,
    Post = 3,
    Put = 4,
    Connect = 5,
    Options = 6,
    Trace = 7,
    Copy = 8,
    Lock = 9,
    Mkcol = 10,
    Move = 11,
    Propfind = 12,
    Proppatch = 13,
    Unlock = 14,
    Report = 15,
    Mkactivity = 16,
    Checkout = 17,
    Merge = 18,
    MSearch = 19,
    Notify = 20,
    Subscribe = 21,
    Unsubscribe = 22,
}

/// Method tokens are case-sensitive (RFC 7230 §3.1.1).
static METHODS: phf::Map<&'static [u8], Method> = phf_map! {
    b"DELETE" => Method::Delete,
    b"GET" => Method::Get,
    b"HEAD" => Method::Head,
    b"POST" => Method::Post,
    b"PUT" => Method::Put,
    b"CONNECT" => Method::Connect,
    b"OPTIONS" => Method::Options,
    b"TRACE" => Method::Trace,
    b"COPY" => Method::Copy,
    b"LOCK" => Method::Lock,
    b"MKCOL" => Method::Mkcol,
    b"MOVE" => Method::Move,
    b"PROPFIND" => Method::Propfind,
    b"PROPPATCH" => Method::Proppatch,
    b"UNLOCK" => Method::Unlock,
    b"REPORT" => Method::Report,
    b"MKACTIVITY" => Method::Mkactivity,
    b"CHECKOUT" => Method::Checkout,
    b"MERGE" => Method::Merge,
    b"M-SEARCH" => Method::MSearch,
    b"NOTIFY" => Method::Notify,
    b"SUBSCRIBE" => Method::Subscribe,
    b"UNSUBSCRIBE" => Method::Unsubscribe,
};

impl Method {
    /// All methods, in discriminant order.
    pub const ALL: [Method; 23] = [
        Method::Delete,
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Connect,
        Method::Options,
        Method::Trace,
        Method::Copy,
        Method::Lock,
        Method::Mkcol,
        Method::Move,
        Method::Propfind,
        Method::Proppatch,
        Method::Unlock,
        Method::Report,
        Method::Mkactivity,
        Method::Checkout,
        Method::Merge,
        Method::MSearch,
        Method::Notify,
        Method::Subscribe,
        Method::Unsubscribe,
    ];

    /// Look up a raw method token.
    #[inline]
    pub fn from_token(token: &[u8]) -> Option<Self> {
        METHODS.get(token).copied()
    }

    /// Canonical wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Copy => "COPY",
            Method::Lock => "LOCK",
            Method::Mkcol => "MKCOL",
            Method::Move => "MOVE",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Unlock => "UNLOCK",
            Method::Report => "REPORT",
            Method::Mkactivity => "MKACTIVITY",
            Method::Checkout => "CHECKOUT",
            Method::Merge => "MERGE",
            Method::MSearch => "M-SEARCH",
            Method::Notify => "NOTIFY",
            Method::Subscribe => "SUBSCRIBE",
            Method::Unsubscribe => "UNSUBSCRIBE",
        }
    }

    /// Convert from the numeric code.
    pub fn from_u8(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
