use std::fmt;
use std::str::FromStr;

use crate::error::RpcError;

/// How a client reaches the server named in an [`RpcAddress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Raw TCP stream carrying the connection preamble directly.
    Tcp,
    /// TCP stream tunnelled through an HTTP CONNECT request first.
    Http,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Http => "http",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed address string: `{protocol}@{addr}`
///
/// Example: `http@10.0.0.1:7001`
/// - `protocol`: `http`
/// - `addr`: `10.0.0.1:7001`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RpcAddress {
    pub protocol: Protocol,
    pub addr: String,
}

impl RpcAddress {
    /// Parse an address string.
    ///
    /// The string must split into exactly two `@`-separated tokens and the protocol must
    /// be `tcp` or `http`. No network access happens here.
    pub fn parse(address: &str) -> Result<Self, RpcError> {
        let tokens: Vec<&str> = address.split('@').collect();
        let [protocol, addr] = tokens.as_slice() else {
            return Err(RpcError::Format(address.to_owned()));
        };

        let protocol = match *protocol {
            "tcp" => Protocol::Tcp,
            "http" => Protocol::Http,
            other => return Err(RpcError::UnsupportedProtocol(other.to_owned())),
        };

        Ok(RpcAddress {
            protocol,
            addr: (*addr).to_owned(),
        })
    }
}

impl FromStr for RpcAddress {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RpcAddress::parse(s)
    }
}

impl fmt::Display for RpcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.protocol, self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp() {
        let address = RpcAddress::parse("tcp@127.0.0.1:9999").unwrap();
        assert_eq!(address.protocol, Protocol::Tcp);
        assert_eq!(address.addr, "127.0.0.1:9999");
    }

    #[test]
    fn test_parse_http() {
        let address: RpcAddress = "http@127.0.0.1:9999".parse().unwrap();
        assert_eq!(address.protocol, Protocol::Http);
        assert_eq!(address.to_string(), "http@127.0.0.1:9999");
    }

    #[test]
    fn test_missing_separator() {
        let result = RpcAddress::parse("badformat");
        assert!(matches!(result, Err(RpcError::Format(s)) if s == "badformat"));
    }

    #[test]
    fn test_too_many_separators() {
        let result = RpcAddress::parse("tcp@user@host:1");
        assert!(matches!(result, Err(RpcError::Format(_))));
    }

    #[test]
    fn test_unsupported_protocol() {
        let result = RpcAddress::parse("ftp@x");
        assert!(matches!(result, Err(RpcError::UnsupportedProtocol(p)) if p == "ftp"));
    }

    #[test]
    fn test_protocol_is_case_sensitive() {
        let result = RpcAddress::parse("TCP@127.0.0.1:1");
        assert!(matches!(result, Err(RpcError::UnsupportedProtocol(_))));
    }
}
