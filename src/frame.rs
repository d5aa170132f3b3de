//! Assembled protocol frames.
//!
//! A [`Frame`] is one complete message delimited from a byte stream:
//!
//! | Component | Size | Description |
//! |-----------|------|-------------|
//! | Head | fixed per protocol | Signature, addressing and the declared length |
//! | Body | declared by the head | Payload, possibly empty |
//!
//! # Example
//!
//! ```
//! use plc_link::Frame;
//!
//! let frame = Frame::new(vec![0x03, 0x00, 0x00, 0x06], vec![0x02, 0xF0]);
//! assert_eq!(frame.len(), 6);
//! assert_eq!(frame.into_bytes(), vec![0x03, 0x00, 0x00, 0x06, 0x02, 0xF0]);
//! ```

/// One complete protocol message: head followed by body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    head: Vec<u8>,
    body: Vec<u8>,
}

impl Frame {
    /// Creates a frame from its head and body.
    pub fn new(head: Vec<u8>, body: Vec<u8>) -> Self {
        Self { head, body }
    }

    /// Returns the head bytes.
    pub fn head(&self) -> &[u8] {
        &self.head
    }

    /// Returns the body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the total frame length (head + body).
    pub fn len(&self) -> usize {
        self.head.len() + self.body.len()
    }

    /// Returns whether the frame has no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.body.is_empty()
    }

    /// Returns the raw frame bytes (head followed by body).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.len());
        raw.extend_from_slice(&self.head);
        raw.extend_from_slice(&self.body);
        raw
    }

    /// Consumes the frame and returns the raw bytes (head followed by body).
    pub fn into_bytes(self) -> Vec<u8> {
        let Self { mut head, body } = self;
        head.extend(body);
        head
    }

    /// Splits the frame into head and body.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.head, self.body)
    }
}
