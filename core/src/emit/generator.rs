//! The bytecode emitter.
//!
//! Owns the code buffer, the data segment and the string tables. Labels
//! are indices into a side table of [`Referencable`] code addresses; a jump
//! to a label that is not placed yet records a patch site on that label
//! only, so no whole-buffer fix-up pass is ever needed.

use hashbrown::HashMap;
use tracing::trace;

use super::instruction::{Opcode, ValueKind, encode_type};
use super::referencable::{CodeAddress, Payload, Referencable, ReferencableError};
use crate::types::CompilingType;

/// Index of a label in the emitter's label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

/// Fixed-width little-endian encoding of a code operand.
pub trait Encode {
    fn encode(self, out: &mut Vec<u8>);
}

macro_rules! impl_encode {
    ($($ty:ty),*) => {
        $(impl Encode for $ty {
            fn encode(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        })*
    };
}

impl_encode!(u8, u16, u32, i64, f64);

impl Encode for Opcode {
    fn encode(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}

impl Encode for ValueKind {
    fn encode(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}

impl Encode for bool {
    fn encode(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }
}

/// A string constant of the data segment and every address initialized
/// with it.
#[derive(Debug, Clone, PartialEq)]
pub struct DataString {
    pub value: String,
    pub addresses: Vec<u32>,
}

pub struct Generator {
    code: Vec<u8>,
    data: Vec<u8>,
    code_strings: Vec<String>,
    code_string_index: HashMap<String, u32>,
    data_strings: Vec<DataString>,
    data_string_index: HashMap<String, usize>,
    labels: Vec<Referencable<CodeAddress>>,
}

const INITIAL_CODE_SIZE: usize = 256;

impl Generator {
    pub fn new(data_size: usize) -> Self {
        Generator {
            code: Vec::with_capacity(INITIAL_CODE_SIZE),
            data: vec![0; data_size],
            code_strings: Vec::new(),
            code_string_index: HashMap::new(),
            data_strings: Vec::new(),
            data_string_index: HashMap::new(),
            labels: Vec::new(),
        }
    }

    /// Current write cursor.
    pub fn position(&self) -> CodeAddress {
        CodeAddress(self.code.len() as u32)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.code.len() + additional;
        if needed > self.code.capacity() {
            let doubled = (self.code.capacity() * 2).max(needed).max(INITIAL_CODE_SIZE);
            self.code.reserve_exact(doubled - self.code.len());
        }
    }

    /// WriteCode: appends one fixed-width value.
    pub fn write<T: Encode>(&mut self, value: T) {
        self.reserve(8);
        value.encode(&mut self.code);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.code.extend_from_slice(bytes);
    }

    pub fn write_type(&mut self, ty: &CompilingType) {
        self.write_bytes(&encode_type(ty));
    }

    /// Interns `value` into the code-string table and returns its index.
    pub fn code_string(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.code_string_index.get(value) {
            return index;
        }
        let index = self.code_strings.len() as u32;
        self.code_strings.push(value.to_string());
        self.code_string_index.insert(value.to_string(), index);
        index
    }

    /// Records that the data-segment slot at `address` holds `value`.
    pub fn data_string(&mut self, value: &str, address: u32) {
        match self.data_string_index.get(value) {
            Some(&index) => self.data_strings[index].addresses.push(address),
            None => {
                self.data_string_index
                    .insert(value.to_string(), self.data_strings.len());
                self.data_strings.push(DataString {
                    value: value.to_string(),
                    addresses: vec![address],
                });
            }
        }
    }

    /// Writes initialized bytes into the data segment, growing it as needed.
    pub fn write_data(&mut self, address: u32, bytes: &[u8]) {
        let start = address as usize;
        let end = start + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(Referencable::new());
        Label(self.labels.len() as u32 - 1)
    }

    fn label_mut(&mut self, label: Label) -> &mut Referencable<CodeAddress> {
        &mut self.labels[label.0 as usize]
    }

    /// Writes the address of `label`, patched later if it is not placed yet.
    pub fn write_label(&mut self, label: Label) {
        let offset = self.code.len();
        self.write_bytes(&[0; 4]);
        let Generator { code, labels, .. } = self;
        labels[label.0 as usize].write_at(code, offset);
    }

    /// SetCodeAddress: places `label` at the write cursor.
    pub fn set_label(&mut self, label: Label) -> Result<(), ReferencableError> {
        let position = self.position();
        trace!(label = label.0, position = position.0, "Placing label");
        let Generator { code, labels, .. } = self;
        labels[label.0 as usize].set_value(position, code)
    }

    pub fn label_address(&self, label: Label) -> Option<CodeAddress> {
        self.labels[label.0 as usize].value()
    }

    pub fn is_referenced(&self, label: Label) -> bool {
        let label = &self.labels[label.0 as usize];
        label.has_references() || label.is_assigned()
    }

    /// Redirects every pending jump to `from` onto `to`.
    pub fn forward_label(&mut self, from: Label, to: Label) {
        let mut source = core::mem::take(self.label_mut(from));
        let Generator { code, labels, .. } = self;
        source.forward_to(&mut labels[to.0 as usize], code);
        *self.label_mut(from) = source;
    }

    /// Patches a 4-byte operand written earlier through a foreign
    /// referencable (frame offsets of temporaries).
    pub fn patch<T: Payload>(&mut self, value: &mut Referencable<T>, payload: T) -> Result<(), ReferencableError> {
        value.set_value(payload, &mut self.code)
    }

    /// Writes a value owned outside the emitter, such as a frame offset.
    pub fn write_referencable<T: Payload>(&mut self, value: &mut Referencable<T>) {
        let offset = self.code.len();
        self.write_bytes(&[0; 4]);
        value.write_at(&mut self.code, offset);
    }

    /// Disposes every label of the function just emitted.
    pub fn release_labels(&mut self) -> Result<(), ReferencableError> {
        let count = self.labels.len();
        for label in self.labels.drain(..) {
            label.dispose()?;
        }
        trace!(count, "Released labels");
        Ok(())
    }

    pub fn into_parts(self) -> GeneratorOutput {
        debug_assert!(self.labels.is_empty(), "labels outlive their function");
        GeneratorOutput {
            code: self.code,
            data: self.data,
            code_strings: self.code_strings,
            data_strings: self.data_strings,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOutput {
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    pub code_strings: Vec<String>,
    pub data_strings: Vec<DataString>,
}

/// Length-prefixed (`u32` byte count) UTF-8 encoding of a code-string table.
pub fn encode_strings(strings: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    (strings.len() as u32).encode(&mut out);
    for string in strings {
        (string.len() as u32).encode(&mut out);
        out.extend_from_slice(string.as_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_forward_and_backward_jumps() {
        let mut generator = Generator::new(0);
        let head = generator.new_label();
        let end = generator.new_label();
        generator.set_label(head).unwrap();
        generator.write(Opcode::Jump);
        generator.write_label(end);
        generator.write(Opcode::Jump);
        generator.write_label(head);
        generator.set_label(end).unwrap();
        assert_eq!(generator.label_address(end), Some(CodeAddress(10)));
        generator.release_labels().unwrap();

        assert_eq!(
            generator.code(),
            &[0x30, 10, 0, 0, 0, 0x30, 0, 0, 0, 0][..]
        );
    }

    #[test]
    fn test_code_strings_are_deduplicated() {
        let mut generator = Generator::new(0);
        assert_eq!(generator.code_string("a"), 0);
        assert_eq!(generator.code_string("b"), 1);
        assert_eq!(generator.code_string("a"), 0);
        generator.data_string("s", 0);
        generator.data_string("s", 8);
        let output = generator.into_parts();
        assert_eq!(output.code_strings, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(output.data_strings[0].addresses, vec![0, 8]);
        assert_eq!(
            encode_strings(&output.code_strings),
            vec![2, 0, 0, 0, 1, 0, 0, 0, b'a', 1, 0, 0, 0, b'b']
        );
    }

    #[test]
    fn test_unplaced_label_fails_release() {
        let mut generator = Generator::new(0);
        let label = generator.new_label();
        generator.write(Opcode::Jump);
        generator.write_label(label);
        assert_eq!(
            generator.release_labels(),
            Err(ReferencableError::Unresolved { references: 1 })
        );
    }

    #[test]
    fn test_data_segment_grows() {
        let mut generator = Generator::new(4);
        generator.write_data(2, &7i64.to_le_bytes());
        let output = generator.into_parts();
        assert_eq!(output.data.len(), 10);
        assert_eq!(output.data[2], 7);
    }
}
