//! Compiled programs.

use std::collections::HashMap;
use std::sync::Arc;

use super::instruction::Instruction;

/// An immutable compiled program.
///
/// Programs are shared through [`Arc`]: every process spawned from a program,
/// and every child forked from those processes, points at the same
/// instruction list. Forking copies registers, never the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    source: String,
    instructions: Vec<Instruction>,
    labels: HashMap<String, usize>,
}

impl Program {
    /// Assemble a program from already-resolved parts.
    pub fn new(
        source: impl Into<String>,
        instructions: Vec<Instruction>,
        labels: HashMap<String, usize>,
    ) -> Self {
        Self {
            source: source.into(),
            instructions,
            labels,
        }
    }

    /// Wrap in an [`Arc`] for sharing between processes.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Text the program was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Instruction list.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Instruction at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Label table (lower-cased name to instruction index).
    pub fn labels(&self) -> &HashMap<String, usize> {
        &self.labels
    }

    /// Look up a label (case-insensitive).
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(&name.to_ascii_lowercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{Instruction, Register, Value};

    #[test]
    fn test_program_accessors() {
        let mut labels = HashMap::new();
        labels.insert("start".to_string(), 0);
        let program = Program::new(
            "start:\nmov eax, 1",
            vec![Instruction::Mov { dst: Register::Eax, src: Value::Immediate(1) }],
            labels,
        );

        assert_eq!(program.len(), 1);
        assert!(!program.is_empty());
        assert_eq!(program.label("START"), Some(0));
        assert_eq!(program.label("missing"), None);
        assert!(program.get(1).is_none());
        assert_eq!(program.source(), "start:\nmov eax, 1");
    }

    #[test]
    fn test_shared_program_is_not_copied() {
        let program = Program::new("", Vec::new(), HashMap::new()).shared();
        let alias = Arc::clone(&program);
        assert!(Arc::ptr_eq(&program, &alias));
        assert_eq!(Arc::strong_count(&program), 2);
    }
}
