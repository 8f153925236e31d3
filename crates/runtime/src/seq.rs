//! Sequence cells: LazySeq, Cons, and the chunk layer
//!
//! A lazy seq owns its thunk until first realization, then permanently
//! holds the realized seq (which may be nil for empty). Chunks move 32
//! elements at a time so bulk consumers touch the thunk machinery once
//! per block instead of once per element.
//!
//! The seq *protocol* (seq/first/rest over every seqable) lives on
//! `Interp` in `seq_protocol.rs`, since realization may call user code.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::value::{Meta, Value};

/// Unrealized thunk + memoized seq.
pub struct LazySeq {
    pub thunk: RefCell<Option<Value>>,
    realized: RefCell<Option<Value>>,
}

impl LazySeq {
    pub fn new(thunk: Value) -> LazySeq {
        LazySeq {
            thunk: RefCell::new(Some(thunk)),
            realized: RefCell::new(None),
        }
    }

    /// The realized seq, if realization already happened.
    pub fn realized_value(&self) -> Option<Value> {
        self.realized.borrow().clone()
    }

    /// Store the realized seq and drop the thunk.
    pub fn set_realized(&self, seq: Value) {
        *self.realized.borrow_mut() = Some(seq);
        *self.thunk.borrow_mut() = None;
    }
}

/// first + rest cell. `rest` is always a seqable (or nil).
pub struct ConsVal {
    pub first: Value,
    pub rest: Value,
    pub meta: Meta,
}

/// Immutable fixed-size slice of elements with an offset, shared by
/// chunked conses as they are consumed one element at a time.
pub struct ArrayChunk {
    items: Rc<Vec<Value>>,
    off: usize,
    end: usize,
}

impl ArrayChunk {
    pub fn new(items: Vec<Value>) -> ArrayChunk {
        let end = items.len();
        ArrayChunk {
            items: Rc::new(items),
            off: 0,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.off
    }

    pub fn is_empty(&self) -> bool {
        self.off >= self.end
    }

    pub fn nth(&self, i: usize) -> Option<&Value> {
        if self.off + i < self.end {
            self.items.get(self.off + i)
        } else {
            None
        }
    }

    pub fn items(&self) -> &[Value] {
        &self.items[self.off..self.end]
    }

    /// The chunk minus its first element, sharing the backing array.
    pub fn drop_first(&self) -> ArrayChunk {
        ArrayChunk {
            items: self.items.clone(),
            off: self.off + 1,
            end: self.end,
        }
    }
}

/// ArrayChunk + rest seq.
pub struct ChunkedConsVal {
    pub chunk: Rc<ArrayChunk>,
    pub rest: Value,
    pub meta: Meta,
}

/// Mutable chunk builder with fixed capacity. `chunk` finalizes it into
/// an immutable ArrayChunk; finalizing twice is a value-error.
pub struct ChunkBufferCell {
    buffer: RefCell<Option<Vec<Value>>>,
    capacity: usize,
}

impl ChunkBufferCell {
    pub fn new(capacity: usize) -> ChunkBufferCell {
        ChunkBufferCell {
            buffer: RefCell::new(Some(Vec::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn append(&self, value: Value) -> Result<()> {
        match &mut *self.buffer.borrow_mut() {
            Some(buf) => {
                if buf.len() >= self.capacity {
                    return Err(Error::value(format!(
                        "chunk-append: buffer full (capacity {})",
                        self.capacity
                    )));
                }
                buf.push(value);
                Ok(())
            }
            None => Err(Error::value("chunk-append: buffer already finalized")),
        }
    }

    pub fn count(&self) -> Result<usize> {
        match &*self.buffer.borrow() {
            Some(buf) => Ok(buf.len()),
            None => Err(Error::value("chunk-buffer already finalized")),
        }
    }

    pub fn finalize(&self) -> Result<ArrayChunk> {
        match self.buffer.borrow_mut().take() {
            Some(buf) => Ok(ArrayChunk::new(buf)),
            None => Err(Error::value("chunk: buffer already finalized")),
        }
    }
}

/// Standard chunk width used when chunking vectors and producers.
pub const CHUNK_SIZE: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(ns: &[i64]) -> Vec<Value> {
        ns.iter().map(|n| Value::Int(*n)).collect()
    }

    #[test]
    fn test_array_chunk_offsets() {
        let c = ArrayChunk::new(ints(&[1, 2, 3]));
        assert_eq!(c.len(), 3);
        assert_eq!(c.nth(0), Some(&Value::Int(1)));
        let d = c.drop_first();
        assert_eq!(d.len(), 2);
        assert_eq!(d.nth(0), Some(&Value::Int(2)));
        assert_eq!(d.nth(2), None);
        // Original chunk is untouched.
        assert_eq!(c.nth(0), Some(&Value::Int(1)));
    }

    #[test]
    fn test_chunk_buffer_lifecycle() {
        let b = ChunkBufferCell::new(4);
        b.append(Value::Int(1)).unwrap();
        b.append(Value::Int(2)).unwrap();
        assert_eq!(b.count().unwrap(), 2);
        let chunk = b.finalize().unwrap();
        assert_eq!(chunk.len(), 2);
        // Second finalize fails.
        assert!(b.finalize().is_err());
        assert!(b.append(Value::Int(3)).is_err());
    }

    #[test]
    fn test_chunk_buffer_capacity() {
        let b = ChunkBufferCell::new(1);
        b.append(Value::Int(1)).unwrap();
        assert!(b.append(Value::Int(2)).is_err());
    }

    #[test]
    fn test_lazy_seq_memoizes() {
        let ls = LazySeq::new(Value::Nil);
        assert!(ls.realized_value().is_none());
        ls.set_realized(Value::Int(42));
        assert_eq!(ls.realized_value(), Some(Value::Int(42)));
        assert!(ls.thunk.borrow().is_none());
    }
}
