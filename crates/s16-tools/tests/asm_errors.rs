use pretty_assertions::assert_eq;
use s16_tools::{assemble, AsmError, AsmErrorKind};

fn err(src: &str) -> AsmError {
    assemble(src).unwrap_err()
}

#[test]
fn unknown_mnemonic() {
    assert_eq!(
        err("halt\nfrob r0"),
        AsmError { line: 2, kind: AsmErrorKind::UnknownMnemonic("frob".into()) }
    );
}

#[test]
fn missing_and_bad_operands() {
    assert_eq!(err("mov r0").kind, AsmErrorKind::MissingOperand { mnemonic: "mov".into() });
    assert_eq!(err(".word").kind, AsmErrorKind::MissingOperand { mnemonic: ".word".into() });
    assert_eq!(err("mov r0,").kind, AsmErrorKind::MissingOperand { mnemonic: "mov".into() });
    assert_eq!(
        err("halt\nadd r0, , r1"),
        AsmError { line: 2, kind: AsmErrorKind::MissingOperand { mnemonic: "add".into() } }
    );
    assert_eq!(
        err("mov r0, [r1]").kind,
        AsmErrorKind::BadOperands { mnemonic: "mov".into(), operands: "r0, [r1]".into() }
    );
    assert_eq!(
        err("jmp [r1, r2]").kind,
        AsmErrorKind::BadOperands { mnemonic: "jmp".into(), operands: "[r1, r2]".into() }
    );
    assert!(matches!(err("halt r0").kind, AsmErrorKind::BadOperands { .. }));
}

#[test]
fn bad_tokens() {
    assert_eq!(err("mov r9, #1").kind, AsmErrorKind::BadRegister("r9".into()));
    assert_eq!(err("ldr r1, [x2]").kind, AsmErrorKind::BadRegister("x2".into()));
    assert_eq!(err("mov r0, #0xZZ").kind, AsmErrorKind::BadNumber("0xZZ".into()));
    assert_eq!(err("1abc: halt").kind, AsmErrorKind::BadLabel("1abc".into()));
}

#[test]
fn immediates_out_of_range() {
    assert_eq!(
        err("mov r0, #256").kind,
        AsmErrorKind::OutOfRange { token: "256".into(), value: 256, width: 8 }
    );
    assert_eq!(
        err("add r0, #-1").kind,
        AsmErrorKind::OutOfRange { token: "-1".into(), value: -1, width: 7 }
    );
    assert_eq!(
        err(".word 0x10000").kind,
        AsmErrorKind::OutOfRange { token: "0x10000".into(), value: 0x10000, width: 16 }
    );
    assert!(matches!(err("ldr r0, [r1, #16]").kind, AsmErrorKind::OutOfRange { width: 4, .. }));
}

#[test]
fn label_errors() {
    assert_eq!(
        err("b nowhere").kind,
        AsmErrorKind::UndefinedLabel("nowhere".into())
    );
    assert_eq!(
        err("a: halt\n\na: halt"),
        AsmError { line: 3, kind: AsmErrorKind::DuplicateLabel("a".into()) }
    );
    // a label past 0x7ff cannot be a conditional branch target
    let mut src = String::from("beq far\n");
    for _ in 0..0x800 {
        src.push_str("halt\n");
    }
    src.push_str("far: halt\n");
    assert!(matches!(err(&src).kind, AsmErrorKind::OutOfRange { width: 11, .. }));
}

#[test]
fn program_too_large() {
    let src = "halt\n".repeat(0x1_0001);
    assert_eq!(err(&src), AsmError { line: 0x1_0001, kind: AsmErrorKind::TooLarge });
    assert_eq!(assemble(&"halt\n".repeat(0x1_0000)).unwrap().len(), 0x1_0000);
}

#[test]
fn comments_and_blank_lines_keep_numbering() {
    let src = "# header\n\n  ; note\nhalt ; stop\nmov r0, #1z";
    let e = err(src);
    assert_eq!(e.line, 5);
    assert_eq!(e.to_string(), "line 5: bad number `1z`");
}
