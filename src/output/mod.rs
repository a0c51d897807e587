//! Output rendering and response framing
//!
//! Null values render as a sentinel of the format (`NA`, `null`, `None`),
//! never as an empty field. Non-finite doubles count as null.

mod format;
mod renderer;

pub use format::{OutputFormat, ResponseHeader, Separators};
pub use renderer::{render, renderer_for, Renderer};

/// Status of a successful response
pub const STATUS_OK: u16 = 200;

/// A complete answer to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    pub header: ResponseHeader,
}

impl Response {
    pub fn ok(body: Vec<u8>, header: ResponseHeader) -> Self {
        Self {
            status: STATUS_OK,
            body,
            header,
        }
    }

    /// Error body is the message on one line
    pub fn error(status: u16, message: &str, header: ResponseHeader) -> Self {
        let mut body = message.as_bytes().to_vec();
        body.push(b'\n');
        Self { status, body, header }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Bytes as sent to the client. `fixed16` prepends
    /// `"<status:3> <length:11>\n"`.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.header {
            ResponseHeader::Off => self.body.clone(),
            ResponseHeader::Fixed16 => {
                let mut out = format!("{:3} {:11}\n", self.status, self.body.len()).into_bytes();
                out.extend_from_slice(&self.body);
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed16_header() {
        let response = Response::ok(b"[]\n".to_vec(), ResponseHeader::Fixed16);
        let bytes = response.to_bytes();
        assert_eq!(&bytes[..16], b"200           3\n");
        assert_eq!(&bytes[16..], b"[]\n");
    }

    #[test]
    fn test_error_response() {
        let response = Response::error(404, "unknown table 'nope'", ResponseHeader::Off);
        assert!(!response.is_ok());
        assert_eq!(response.to_bytes(), b"unknown table 'nope'\n".to_vec());
    }
}
