//! The textual disassembler: a human-readable dump of a [Chunk], used when
//! `DEBUG_PRINT_CODE`/`DEBUG_TRACE_EXECUTION` are enabled. Debug-only; no
//! other part of the core depends on its output.

use crate::chunk::{Chunk, OpCode};

/// Given a chunk, prints its disassembly to stdout.
pub fn disassemble_chunk(c: &Chunk, name: &str) {
    println!("== {name} ==");

    let mut offset = 0;
    while offset < c.len() {
        offset = disassemble_instruction(c, offset);
    }
}

/// Print one instruction from the [Chunk] to stdout, taking into account its operands.
pub fn disassemble_instruction(c: &Chunk, offset: usize) -> usize {
    print!("{offset:04} ");

    if offset > 0 && at_same_line_as_previous_offset(c, offset) {
        print!("   | ");
    } else {
        let line_no = c.line_number_for(offset).expect("offset has no line");
        print!("{line_no:4} ");
    }

    let instruction = c
        .get(offset)
        .expect("offset too large")
        .as_opcode()
        .expect("invalid byte for opcode");

    use OpCode::*;
    match instruction {
        Constant => constant_instruction("OP_CONSTANT", c, offset),
        Null => simple_instruction("OP_NULL", offset),
        True => simple_instruction("OP_TRUE", offset),
        False => simple_instruction("OP_FALSE", offset),
        Not => simple_instruction("OP_NOT", offset),
        Negate => simple_instruction("OP_NEGATE", offset),
        Add => simple_instruction("OP_ADD", offset),
        Subtract => simple_instruction("OP_SUBTRACT", offset),
        Multiply => simple_instruction("OP_MULTIPLY", offset),
        Divide => simple_instruction("OP_DIVIDE", offset),
        Equal => simple_instruction("OP_EQUAL", offset),
        Greater => simple_instruction("OP_GREATER", offset),
        Less => simple_instruction("OP_LESS", offset),
        Return => simple_instruction("OP_RETURN", offset),
    }
}

/////////////////////////////////////// Instruction printers ///////////////////////////////////////

fn simple_instruction(name: &str, offset: usize) -> usize {
    println!("{name:>14}");
    offset + 1
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    print!("{name:>14}");

    let (index, value) = chunk
        .get(offset + 1)
        .expect("ran out of bytes")
        .resolve_constant_with_index()
        .expect("invalid constant index");

    println!("{index:4} '{value}'");

    offset + 2
}

//////////////////////////////////////////// Utilities ////////////////////////////////////////////

/// Returns true if the given offset is at the same line number as the previous offset.
fn at_same_line_as_previous_offset(chunk: &Chunk, offset: usize) -> bool {
    assert!(offset > 0);

    chunk
        .line_number_for(offset)
        .zip(chunk.line_number_for(offset - 1))
        .map(|(current_line, previous_line)| current_line == previous_line)
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Value;

    #[test]
    fn disassembling_does_not_panic() {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::Number(1.2)).unwrap();
        chunk.write_opcode(OpCode::Constant, 1).with_operand(idx);
        chunk.write_opcode(OpCode::Negate, 1);
        chunk.write_opcode(OpCode::Return, 1);
        disassemble_chunk(&chunk, "test chunk");
    }
}
