//! Scrollback buffer (§3, §4.E). Per the Open Question decision recorded
//! in DESIGN.md: a flat byte ring capped at `cols * scrollback_lines`
//! bytes, FIFO-evicted from the front on overflow — byte granularity,
//! not line granularity, so a catch-up snapshot may start mid-escape
//! sequence. Terminals recover from this; see SPEC_FULL.md §9.

use std::collections::VecDeque;

pub struct Scrollback {
    buf: VecDeque<u8>,
    cap_bytes: usize,
}

impl Scrollback {
    pub fn new(cap_bytes: usize) -> Self {
        Self { buf: VecDeque::new(), cap_bytes }
    }

    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend(data.iter().copied());
        let overflow = self.buf.len().saturating_sub(self.cap_bytes);
        if overflow > 0 {
            self.buf.drain(..overflow);
        }
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.buf.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_within_capacity_keeps_everything() {
        let mut sb = Scrollback::new(16);
        sb.append(b"hello");
        assert_eq!(sb.snapshot(), b"hello");
    }

    #[test]
    fn append_beyond_capacity_evicts_from_front() {
        let mut sb = Scrollback::new(4);
        sb.append(b"abcd");
        sb.append(b"ef");
        assert_eq!(sb.snapshot(), b"cdef");
        assert_eq!(sb.len(), 4);
    }

    #[test]
    fn single_chunk_larger_than_capacity_keeps_tail() {
        let mut sb = Scrollback::new(3);
        sb.append(b"abcdefgh");
        assert_eq!(sb.snapshot(), b"fgh");
    }

    #[test]
    fn empty_buffer_snapshot_is_empty() {
        let sb = Scrollback::new(100);
        assert!(sb.is_empty());
        assert!(sb.snapshot().is_empty());
    }
}
