//! Disassembler.

use std::collections::{BTreeMap, BTreeSet};

use crate::isa::Program;

/// Render a compiled program back to source text.
///
/// Each instruction is printed in its canonical form. Every label name a
/// branch refers to gets its own `name:` line just before the instruction it
/// targets; names on the same index are emitted in sorted order. Unused
/// labels are not preserved.
pub fn decompile(program: &Program) -> String {
    let mut labels: BTreeMap<usize, BTreeSet<&str>> = BTreeMap::new();
    for instruction in program.instructions() {
        if let Some(target) = instruction.target() {
            labels
                .entry(target.index)
                .or_default()
                .insert(target.label.as_str());
        }
    }

    let mut code: Vec<String> = program
        .instructions()
        .iter()
        .map(|instruction| instruction.to_string())
        .collect();

    // Insert from the highest index down so lower indices stay valid
    let end = code.len();
    for (index, names) in labels.iter().rev() {
        let at = (*index).min(end);
        for name in names.iter().rev() {
            code.insert(at, format!("{}:", name));
        }
    }

    code.join("\n")
}
