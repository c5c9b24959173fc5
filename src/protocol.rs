//! Response generator for the dispense protocol.
//!
//! A client receives exactly one frame per connection: either a text line or
//! the literal sentinel `exit`, each terminated by a single `\n`, after which
//! the connection is closed. Nothing is ever read from the client.

use bytes::BytesMut;

/// Response generator for the dispense protocol
pub struct Response;

impl Response {
    /// Frame a text line for the wire
    pub fn line(text: &str) -> BytesMut {
        let mut response = BytesMut::with_capacity(text.len() + 1);
        response.extend_from_slice(text.as_bytes());
        response.extend_from_slice(b"\n");
        response
    }

    /// Generate the exit frame
    pub fn exit() -> &'static [u8] {
        b"exit\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_line() {
        let response = Response::line("compute chunk 7");
        assert_eq!(&response[..], b"compute chunk 7\n");
    }

    #[test]
    fn test_response_empty_line() {
        let response = Response::line("");
        assert_eq!(&response[..], b"\n");
    }

    #[test]
    fn test_response_exit() {
        assert_eq!(Response::exit(), b"exit\n");
    }

    #[test]
    fn test_exit_frame_is_a_plain_line() {
        let framed = Response::line("exit");
        assert_eq!(&framed[..], Response::exit());
    }
}
