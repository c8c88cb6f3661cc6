use pretty_assertions::assert_eq;

use cbpf::{compress, decompress, CodecError, DecodeError, Format, Instruction, InstructionRef, Opcode, Program};

fn mov(dst: u8, immediate: i32) -> Instruction {
  Instruction::new(Opcode::MovImm, dst, 0, 0, immediate)
}

fn add(dst: u8, src: u8) -> Instruction {
  Instruction::new(Opcode::AddReg, dst, src, 0, 0)
}

fn exit() -> Instruction {
  Instruction::new(Opcode::Exit, 0, 0, 0, 0)
}

/// `jeq r1, r2` over two register adds to an exit, linked.
fn branch_over_two_adds() -> Program {
  let mut program = Program::new(vec![
    Instruction::new(Opcode::JeqReg, 1, 2, 0, 0),
    add(1, 2),
    add(1, 3),
    exit(),
  ]);
  program.set_target(InstructionRef::new(0), InstructionRef::new(3)).unwrap();
  program
}

#[test]
fn branch_links_to_instruction_three_words_ahead(){
  let bytes = [
    0x1d, 0x21, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00,   // if r1 == r2 goto +2
    0x0f, 0x21, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,   // r1 += r2
    0x0f, 0x31, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,   // r1 += r3
    0x95, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,   // Return r0
  ];
  let program = Program::decode_canonical(&bytes).unwrap();

  let target = program.target_of(InstructionRef::new(0)).unwrap();
  assert_eq!(target.address(), 24);
  assert_eq!(target.opcode, Opcode::Exit);
  assert_eq!(program.instructions()[0].offset, 2);
  assert_eq!(program.encode_canonical().unwrap(), bytes.to_vec());
}

#[test]
fn formats_differ_in_size_but_agree_on_targets(){
  let program = branch_over_two_adds();

  let canonical  = program.encode(Format::Canonical).unwrap();
  let compressed = program.encode(Format::Compressed).unwrap();
  assert_eq!(canonical.len(), 32);
  assert_eq!(compressed.len(), 4 + 2 + 2 + 2);
  assert_eq!(&compressed[..4], &[0x1d, 0x21, 0x04, 0x00]);

  let from_canonical  = Program::decode_canonical(&canonical).unwrap();
  let from_compressed = Program::decode_compressed(&compressed).unwrap();
  assert_eq!(from_canonical.instructions()[0].target(), Some(InstructionRef::new(3)));
  assert_eq!(from_compressed.instructions()[0].target(), Some(InstructionRef::new(3)));
  assert_eq!(from_canonical, from_compressed);
}

#[test]
fn backward_branch_to_first_instruction(){
  let bytes = [
    0xb7, 0x01, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00,   // r1 = 5
    0x05, 0x00, 0xfe, 0xff, 0x00, 0x00, 0x00, 0x00,   // goto -2
  ];
  let program = Program::decode_canonical(&bytes).unwrap();

  let target = program.target_of(InstructionRef::new(1)).unwrap();
  assert_eq!(target, &mov(1, 5));
  assert_eq!(target.address(), 0);
  assert_eq!(program.instructions()[1].offset, -2);

  // A jump with offset -1 lands on itself.
  let bytes = [0x05, 0x00, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00];
  let program = Program::decode_canonical(&bytes).unwrap();
  assert_eq!(program.instructions()[0].target(), Some(InstructionRef::new(0)));
}

#[test]
fn double_width_load_image(){
  let bytes = [
    0x18, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00,
    0x00, 0x00,
  ];
  // The high half belongs in the last four bytes of the second record.
  let canonical = [
    0x18, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x78, 0x56, 0x34, 0x12,
  ];
  let instruction = Instruction::decode_canonical(&canonical).unwrap();
  assert_eq!(instruction.dst_register(), 1);
  assert_eq!(instruction.src_register(), 0);
  assert_eq!(instruction.wide_immediate(), 0x1234_5678_0000_0000);

  // Shifted two bytes early, the high half straddles the second record's offset field and
  // two stray bytes trail the load.
  let shifted = Instruction::decode_canonical(&bytes).unwrap();
  assert_eq!(shifted.wide_immediate(), 0x0000_1234_0000_0000);
  assert_eq!(
    Program::decode_canonical(&bytes),
    Err(DecodeError::UnknownOpcode {opcode: 0x00, offset: 16})
  );
}

#[test]
fn compress_and_decompress_a_whole_image(){
  let mut program = Program::new(vec![
    mov(0, 0),
    Instruction::wide(Opcode::LddwRodata, 2, 0x40),
    Instruction::new(Opcode::LdxB, 3, 2, 1, 0),
    Instruction::new(Opcode::JneImm, 3, 0, 0, 0x2a),
    Instruction::new(Opcode::StW, 10, 0, -4, 7),
    Instruction::new(Opcode::StxDw, 10, 3, -16, 0),
    Instruction::new(Opcode::Call, 0, 0, 0, 5),
    Instruction::new(Opcode::AddImm, 0, 0, 0, 1),
    Instruction::new(Opcode::Ja, 0, 0, 0, 0),
    exit(),
  ]);
  program.set_target(InstructionRef::new(3), InstructionRef::new(9)).unwrap();
  program.set_target(InstructionRef::new(8), InstructionRef::new(2)).unwrap();

  let canonical  = program.encode_canonical().unwrap();
  let compressed = compress(&canonical).unwrap();
  assert_eq!(compressed.len(), program.size(Format::Compressed));
  assert!(compressed.len() < canonical.len());

  assert_eq!(decompress(&compressed).unwrap(), canonical);
  assert_eq!(Program::decode_compressed(&compressed).unwrap(), program);
}

#[test]
fn disassemble_a_decoded_image(){
  let program = Program::decode_canonical(&[0x95, 0, 0, 0, 0, 0, 0, 0]).unwrap();
  let lines = program.disassemble(Format::Canonical).unwrap();
  assert_eq!(lines.len(), 1);
  assert!(lines[0].ends_with("Return r0"));
}

#[test]
fn conversion_errors_surface_from_either_half(){
  assert_eq!(
    compress(&[0x95, 0x00]),
    Err(CodecError::Decode(DecodeError::TruncatedRecord {expected: 8, available: 2, offset: 0}))
  );
  assert_eq!(
    decompress(&[0xEE, 0x00]),
    Err(CodecError::Decode(DecodeError::UnknownOpcode {opcode: 0xEE, offset: 0}))
  );
}

#[test]
fn images_convert_independently_on_separate_threads(){
  let image    = branch_over_two_adds().encode_canonical().unwrap();
  let expected = compress(&image).unwrap();

  let handles: Vec<_> = (0..4)
    .map(|_| {
      let image = image.clone();
      std::thread::spawn(move || compress(&image))
    })
    .collect();

  for handle in handles {
    assert_eq!(handle.join().unwrap(), Ok(expected.clone()));
  }
}
