//! Ordered multi-shape decoding.
//!
//! A document that can take several schema shapes is tried against each
//! shape in preference order. The first that parses wins; if none does, every
//! attempt is kept and the one that got furthest into the input is reported
//! as the cause.

use crate::error::{DecodeAttempt, DecodeError};

/// A named decoder for one schema shape
pub struct Shape<T> {
    pub name: &'static str,
    pub decode: fn(&str) -> serde_json::Result<T>,
}

impl<T> Shape<T> {
    pub const fn new(name: &'static str, decode: fn(&str) -> serde_json::Result<T>) -> Self {
        Self { name, decode }
    }
}

pub fn decode_first<T>(context: &str, input: &str, shapes: &[Shape<T>]) -> Result<T, DecodeError> {
    let mut attempts = Vec::with_capacity(shapes.len());
    for shape in shapes {
        match (shape.decode)(input) {
            Ok(value) => return Ok(value),
            Err(error) => {
                log::trace!("{} did not decode as {}: {}", context, shape.name, error);
                attempts.push(DecodeAttempt {
                    shape: shape.name,
                    error,
                });
            }
        }
    }
    Err(DecodeError::new(context, attempts))
}
