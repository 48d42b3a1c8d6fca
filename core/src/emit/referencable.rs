//! Write-once values for forward references.
//!
//! A [`Referencable`] stands for a 4-byte value that is not known yet,
//! usually a code address. Every place that needs the value before it is
//! known records its buffer offset; [`Referencable::set_value`] then
//! back-fills exactly those offsets. Writes after assignment go straight
//! to the buffer.

use smallvec::SmallVec;
use thiserror::Error;
use tracing::trace;

/// Values a [`Referencable`] can carry.
pub trait Payload: Copy + PartialEq + core::fmt::Debug {
    fn to_bytes(self) -> [u8; 4];
}

/// Absolute offset into the code buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeAddress(pub u32);

impl Payload for CodeAddress {
    fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

/// Offset into a function frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameOffset(pub u32);

impl Payload for FrameOffset {
    fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferencableError {
    #[error("value already assigned ({existing}), cannot assign {attempted}")]
    AlreadyAssigned { existing: String, attempted: String },

    #[error("disposed with {references} unresolved reference(s)")]
    Unresolved { references: usize },
}

#[derive(Debug)]
pub struct Referencable<T: Payload> {
    value: Option<T>,
    references: SmallVec<[usize; 4]>,
}

impl<T: Payload> Default for Referencable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload> Referencable<T> {
    pub fn new() -> Self {
        Referencable {
            value: None,
            references: SmallVec::new(),
        }
    }

    pub fn value(&self) -> Option<T> {
        self.value
    }

    pub fn is_assigned(&self) -> bool {
        self.value.is_some()
    }

    pub fn has_references(&self) -> bool {
        !self.references.is_empty()
    }

    /// Writes the value at `offset`, or placeholder bytes plus a patch
    /// record when the value is not known yet.
    pub fn write_at(&mut self, buffer: &mut [u8], offset: usize) {
        match self.value {
            Some(value) => buffer[offset..offset + 4].copy_from_slice(&value.to_bytes()),
            None => {
                buffer[offset..offset + 4].fill(0);
                self.references.push(offset);
            }
        }
    }

    /// Fixes the value and patches every recorded site.
    pub fn set_value(&mut self, value: T, buffer: &mut [u8]) -> Result<(), ReferencableError> {
        if let Some(existing) = self.value {
            return Err(ReferencableError::AlreadyAssigned {
                existing: format!("{:?}", existing),
                attempted: format!("{:?}", value),
            });
        }
        let bytes = value.to_bytes();
        for &offset in &self.references {
            trace!(offset, ?value, "Patching reference");
            buffer[offset..offset + 4].copy_from_slice(&bytes);
        }
        self.references.clear();
        self.value = Some(value);
        Ok(())
    }

    /// Moves the pending sites of `self` onto `other`. Afterwards `self`
    /// has no references and can be disposed unassigned.
    pub fn forward_to(&mut self, other: &mut Referencable<T>, buffer: &mut [u8]) {
        for offset in self.references.drain(..) {
            other.write_at(buffer, offset);
        }
    }

    /// Ends the value's life. Fails when sites are still waiting for a
    /// value that never came.
    pub fn dispose(mut self) -> Result<(), ReferencableError> {
        let references = self.references.len();
        self.references.clear();
        if self.value.is_none() && references > 0 {
            return Err(ReferencableError::Unresolved { references });
        }
        Ok(())
    }
}

impl<T: Payload> Drop for Referencable<T> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.value.is_some() || self.references.is_empty(),
                "referencable dropped with {} unresolved reference(s)",
                self.references.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_forward_reference_matches_direct_write() {
        let mut buffer = vec![0xAAu8; 12];
        let mut label = Referencable::new();
        label.write_at(&mut buffer, 0);
        label.write_at(&mut buffer, 8);
        label.set_value(CodeAddress(0x0102_0304), &mut buffer).unwrap();
        label.write_at(&mut buffer, 4);

        let bytes = 0x0102_0304u32.to_le_bytes();
        assert_eq!(&buffer[0..4], &bytes);
        assert_eq!(&buffer[4..8], &bytes);
        assert_eq!(&buffer[8..12], &bytes);
        label.dispose().unwrap();
    }

    #[test]
    fn test_second_assignment_is_rejected() {
        let mut buffer = vec![0u8; 4];
        let mut label = Referencable::new();
        label.set_value(CodeAddress(1), &mut buffer).unwrap();
        let err = label.set_value(CodeAddress(2), &mut buffer).unwrap_err();
        assert!(matches!(err, ReferencableError::AlreadyAssigned { .. }));
        assert_eq!(label.value(), Some(CodeAddress(1)));
        label.dispose().unwrap();
    }

    #[test]
    fn test_dispose_with_pending_references_fails() {
        let mut buffer = vec![0u8; 4];
        let mut label: Referencable<CodeAddress> = Referencable::new();
        label.write_at(&mut buffer, 0);
        assert_eq!(
            label.dispose(),
            Err(ReferencableError::Unresolved { references: 1 })
        );
    }

    #[test]
    fn test_forwarding_moves_sites() {
        let mut buffer = vec![0u8; 8];
        let mut pad: Referencable<CodeAddress> = Referencable::new();
        let mut handler = Referencable::new();
        pad.write_at(&mut buffer, 0);
        pad.forward_to(&mut handler, &mut buffer);
        handler.write_at(&mut buffer, 4);
        handler.set_value(CodeAddress(7), &mut buffer).unwrap();
        assert_eq!(buffer, vec![7, 0, 0, 0, 7, 0, 0, 0]);
        pad.dispose().unwrap();
        handler.dispose().unwrap();
    }
}
