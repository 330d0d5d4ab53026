use std::time::Instant;

use crate::{error::Error, interfaces::DisassemblerArgs};
use cvm_common::utils::strings::encode_hex;
use cvm_vm::core::opcodes::{opcode_name, push_size};
use tracing::{debug, info, warn};

/// Disassembles CVM bytecode into readable assembly instructions
///
/// Every line holds the program counter of an instruction, its name and, for PUSH1..PUSH32, the
/// bytes it pushes. A PUSH whose data runs past the end of the code ends the listing.
///
/// ```
/// use cvm_disassembler::{disassemble, DisassemblerArgsBuilder};
///
/// let args = DisassemblerArgsBuilder::new()
///     .target("0x6001600201".to_string())
///     .decimal_counter(true)
///     .build()
///     .expect("failed to build args");
///
/// let asm = disassemble(args).expect("failed to disassemble");
/// assert_eq!(asm, "0 PUSH1 01\n2 PUSH1 02\n4 ADD \n");
/// ```
pub fn disassemble(args: DisassemblerArgs) -> Result<String, Error> {
    let start_time = Instant::now();
    let mut program_counter = 0;
    let mut asm = String::new();

    let bytecode = args.get_bytecode()?;
    debug!("fetching target bytecode took {:?}", start_time.elapsed());

    // iterate over the bytecode, disassembling each instruction
    let start_disassemble_time = Instant::now();
    while program_counter < bytecode.len() {
        let offset = program_counter;
        let opcode = bytecode[offset];

        // PUSH1..PUSH32 carry their operand inline
        let size = push_size(opcode);
        let pushed_bytes = match bytecode.get(offset + 1..offset + 1 + size) {
            Some(bytes) => encode_hex(bytes),
            None => {
                warn!(
                    "{} at {offset} wants {size} bytes but only {} remain, stopping",
                    opcode_name(opcode),
                    bytecode.len() - offset - 1
                );
                break;
            }
        };

        asm.push_str(&format!(
            "{} {} {}\n",
            if args.decimal_counter { offset.to_string() } else { format!("{offset:06x}") },
            opcode_name(opcode),
            pushed_bytes
        ));
        program_counter += 1 + size;
    }
    debug!("disassembly took {:?}", start_disassemble_time.elapsed());

    info!("disassembled {} bytes successfully", program_counter);
    Ok(asm)
}
