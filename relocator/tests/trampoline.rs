use arm_relocator::{build_trampoline, can_relocate, DecodeError, RelocError};

const INPUT_PC: u32 = 0x1000;
const OUTPUT_PC: u32 = 0x8000;

fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn to_words(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn trampoline_rewrites_literal_load_and_jumps_back() {
    let code = to_bytes(&[
        0xe92d4010, // push {r4, lr}
        0xe59f3028, // ldr r3, [pc, #0x28]
        0xe1a04000, // mov r4, r0
    ]);

    let t = build_trampoline(&code, INPUT_PC, OUTPUT_PC, 8).unwrap();
    assert_eq!(t.base_pc, OUTPUT_PC);
    assert_eq!(t.relocated_bytes, 8);
    assert_eq!(t.resume_pc, Some(INPUT_PC + 8));
    assert_eq!(
        to_words(&t.code),
        vec![
            0xe92d4010, // push {r4, lr}
            0xe59f3008, // ldr r3, [pc, #8]
            0xe2833028, // add r3, r3, #0x28
            0xe5933000, // ldr r3, [r3]
            0xe59ff000, // ldr pc, [pc]
            INPUT_PC + 4 + 8,
            INPUT_PC + 8,
        ]
    );
}

#[test]
fn trampoline_ending_in_branch_has_no_jump_back() {
    let code = to_bytes(&[
        0xe1a0c00d, // mov ip, sp
        0xea000010, // b pc + 0x40
        0xe1a00000, // nop
        0xe1a00000, // nop
    ]);

    let t = build_trampoline(&code, INPUT_PC, OUTPUT_PC, 16).unwrap();
    assert_eq!(t.relocated_bytes, 8);
    assert_eq!(t.resume_pc, None);
    assert_eq!(to_words(&t.code), vec![0xe1a0c00d, 0xe51ff004, INPUT_PC + 4 + 8 + 0x40]);
}

#[test]
fn trampoline_rejects_short_input() {
    let code = to_bytes(&[0xe1a0c00d]);
    assert_eq!(
        build_trampoline(&code, INPUT_PC, OUTPUT_PC, 8),
        Err(RelocError::Decode(DecodeError::Truncated {
            address: INPUT_PC + 4,
            available: 0,
        }))
    );
}

#[test]
fn trampoline_rejects_unsupported_pc_read() {
    let code = to_bytes(&[
        0xe92d4010, // push {r4, lr}
        0xe150000f, // cmp r0, pc
    ]);
    assert!(matches!(
        build_trampoline(&code, INPUT_PC, OUTPUT_PC, 8),
        Err(RelocError::Unsupported { address, .. }) if address == INPUT_PC + 4
    ));
    assert_eq!(can_relocate(&code, INPUT_PC, 8).unwrap(), 4);
}

#[test]
fn trampoline_keeps_call_return_inside_trampoline() {
    let code = to_bytes(&[
        0xe92d4800, // push {fp, lr}
        0xebfffffe, // bl pc - 8 (to itself)
        0xe1a00000, // nop
    ]);

    let t = build_trampoline(&code, INPUT_PC, OUTPUT_PC, 8).unwrap();
    assert_eq!(t.resume_pc, Some(INPUT_PC + 8));
    assert_eq!(
        to_words(&t.code),
        vec![
            0xe92d4800,
            0xe59fe004, // ldr lr, [pc, #4]
            0xe59ff004, // ldr pc, [pc, #4]
            0xe59ff004, // ldr pc, [pc, #4]
            OUTPUT_PC + 12,
            INPUT_PC + 4,
            INPUT_PC + 8,
        ]
    );
}
