//! Outbound requests and their serialization.

use std::{error::Error, fmt};

use bincode::{Encode, config};
use bytes::Bytes;

/// Boxed error returned by fallible serialization.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Outbound logical message.
///
/// `to_bytes` yields exactly the bytes handed to the transport. A request is
/// not mutated once sent, so implementations should be pure.
pub trait Request: Send + Sync + 'static {
    /// Serialize the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be encoded.
    fn to_bytes(&self) -> Result<Bytes, BoxError>;
}

impl Request for Bytes {
    fn to_bytes(&self) -> Result<Bytes, BoxError> { Ok(self.clone()) }
}

impl Request for Vec<u8> {
    fn to_bytes(&self) -> Result<Bytes, BoxError> { Ok(Bytes::copy_from_slice(self)) }
}

impl Request for &'static [u8] {
    fn to_bytes(&self) -> Result<Bytes, BoxError> { Ok(Bytes::from_static(*self)) }
}

impl Request for &'static str {
    fn to_bytes(&self) -> Result<Bytes, BoxError> {
        let text: &'static str = *self;
        Ok(Bytes::from_static(text.as_bytes()))
    }
}

impl Request for String {
    fn to_bytes(&self) -> Result<Bytes, BoxError> { Ok(Bytes::copy_from_slice(self.as_bytes())) }
}

/// Request wrapper encoding its value with `bincode`'s standard
/// configuration.
///
/// # Examples
///
/// ```
/// use bytesio::request::{Bincode, Request};
///
/// #[derive(bincode::Encode)]
/// struct Ping(u8);
///
/// let bytes = Bincode(Ping(7)).to_bytes().expect("encode ping");
/// assert_eq!(bytes.as_ref(), &[7]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Bincode<T>(pub T);

impl<T> Bincode<T> {
    /// Borrow the wrapped value.
    #[must_use]
    pub fn get(&self) -> &T { &self.0 }
}

impl<T: fmt::Debug> fmt::Debug for Bincode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bincode").field(&self.0).finish()
    }
}

impl<T> Request for Bincode<T>
where
    T: Encode + Send + Sync + 'static,
{
    fn to_bytes(&self) -> Result<Bytes, BoxError> {
        let bytes = bincode::encode_to_vec(&self.0, config::standard())?;
        Ok(Bytes::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Encode)]
    struct Header {
        id: u32,
        flag: bool,
    }

    #[test]
    fn byte_requests_serialize_verbatim() {
        assert_eq!(
            b"PING".to_vec().to_bytes().expect("vec"),
            Bytes::from_static(b"PING")
        );
        assert_eq!("PING".to_bytes().expect("str"), Bytes::from_static(b"PING"));
        assert_eq!(
            String::from("PING").to_bytes().expect("string"),
            Bytes::from_static(b"PING")
        );
    }

    #[test]
    fn bincode_wrapper_uses_standard_config() {
        let bytes = Bincode(Header { id: 1, flag: true })
            .to_bytes()
            .expect("encode header");
        assert_eq!(bytes.as_ref(), &[1, 1]);
    }
}
