//! Content references in on-chain message bodies.
//!
//! A message body is either inline text or a pointer to stored content in
//! the form `cid:<address>`. The address is opaque here.

use std::fmt;
use std::str::FromStr;

use crate::error::{CryptoError, CryptoResult};

/// Prefix marking a body as a content reference.
pub const CID_PREFIX: &str = "cid:";

/// Reference to content stored off-chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef(String);

impl ContentRef {
    /// Wrap a bare content address.
    pub fn new(address: impl Into<String>) -> CryptoResult<Self> {
        let address = address.into();
        if address.is_empty() {
            return Err(CryptoError::InvalidInput(
                "Content address is empty".to_string(),
            ));
        }
        if address.chars().any(char::is_whitespace) {
            return Err(CryptoError::InvalidInput(
                "Content address contains whitespace".to_string(),
            ));
        }
        Ok(Self(address))
    }

    /// Parse the `cid:<address>` form.
    pub fn parse(s: &str) -> CryptoResult<Self> {
        let address = s.trim().strip_prefix(CID_PREFIX).ok_or_else(|| {
            CryptoError::InvalidInput(format!("Content reference must start with '{}'", CID_PREFIX))
        })?;
        Self::new(address)
    }

    /// The bare content address.
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CID_PREFIX, self.0)
    }
}

impl FromStr for ContentRef {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A message body as stored on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Reference(ContentRef),
    Inline(String),
}

impl MessageBody {
    /// Classify a raw body. Anything that is not a valid reference is inline.
    pub fn parse(body: &str) -> Self {
        match ContentRef::parse(body) {
            Ok(reference) => MessageBody::Reference(reference),
            Err(_) => MessageBody::Inline(body.to_string()),
        }
    }
}

impl fmt::Display for MessageBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageBody::Reference(reference) => reference.fmt(f),
            MessageBody::Inline(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn test_parse_reference() {
        let r = ContentRef::parse(&format!("cid:{}", CID)).unwrap();
        assert_eq!(r.address(), CID);
        assert_eq!(r.to_string(), format!("cid:{}", CID));
    }

    #[test]
    fn test_from_str() {
        let r: ContentRef = format!("cid:{}", CID).parse().unwrap();
        assert_eq!(r, ContentRef::new(CID).unwrap());
    }

    #[test]
    fn test_invalid_references() {
        assert!(ContentRef::parse(CID).is_err());
        assert!(ContentRef::parse("cid:").is_err());
        assert!(ContentRef::parse("cid:abc def").is_err());
        assert!(ContentRef::new("").is_err());
    }

    #[test]
    fn test_message_body() {
        assert_eq!(
            MessageBody::parse(&format!("cid:{}", CID)),
            MessageBody::Reference(ContentRef::new(CID).unwrap())
        );
        assert_eq!(
            MessageBody::parse("gm fren"),
            MessageBody::Inline("gm fren".to_string())
        );
        assert_eq!(MessageBody::parse("cid: spaced out").to_string(), "cid: spaced out");
    }
}
