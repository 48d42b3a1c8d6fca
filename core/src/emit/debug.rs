//! Line and debug tables emitted next to the code.
//!
//! Both tables are positional: functions appear in module order and
//! locals in declaration order.

use crate::types::CompilingType;

/// Code offset to source line, in code order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTable {
    entries: Vec<(u32, u32)>,
}

impl LineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that code from `offset` on belongs to `line`. A second
    /// entry at the same offset replaces the first.
    pub fn add(&mut self, offset: u32, line: u32) {
        match self.entries.last_mut() {
            Some(last) if last.0 == offset => last.1 = line,
            Some(last) if last.1 == line => {}
            _ => self.entries.push((offset, line)),
        }
    }

    /// Source line of the instruction at `offset`.
    pub fn line_of(&self, offset: u32) -> Option<u32> {
        let index = self.entries.partition_point(|&(start, _)| start <= offset);
        index.checked_sub(1).map(|i| self.entries[i].1)
    }

    pub fn entries(&self) -> &[(u32, u32)] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugLocal {
    pub name: String,
    pub offset: u32,
    pub ty: CompilingType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugFunction {
    pub name: String,
    pub entry: u32,
    pub locals: Vec<DebugLocal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugTable {
    pub functions: Vec<DebugFunction>,
    /// Code offsets of `Breakpoint` instructions.
    pub breakpoints: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_lookup() {
        let mut lines = LineTable::new();
        lines.add(0, 1);
        lines.add(0, 2);
        lines.add(7, 2);
        lines.add(12, 4);
        assert_eq!(lines.entries(), &[(0, 2), (12, 4)]);
        assert_eq!(lines.line_of(5), Some(2));
        assert_eq!(lines.line_of(12), Some(4));
        assert_eq!(lines.line_of(100), Some(4));

        let empty = LineTable::new();
        assert_eq!(empty.line_of(0), None);
    }
}
