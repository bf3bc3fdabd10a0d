//! Two-pass assembler for the s16 instruction set.
//!
//! Source is line oriented: an optional `label:`, then an instruction or a
//! `.word` directive. `;` starts a comment anywhere, `#` only at the start of
//! a line (elsewhere it prefixes an immediate). Mnemonics and registers are
//! case-insensitive, labels are not. Operand layouts come from the core
//! encoding table, so anything the disassembler prints assembles back to the
//! same word.

use std::collections::BTreeMap;

use s16_rs::decoder::Op;
use s16_rs::instructions::{self, AddrMode, Field, Form};
use s16_rs::isa::s16::encode;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct AsmError {
    /// 1-based source line.
    pub line: usize,
    pub kind: AsmErrorKind,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmErrorKind {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("`{mnemonic}` is missing an operand")]
    MissingOperand { mnemonic: String },
    #[error("`{mnemonic}` does not accept operands `{operands}`")]
    BadOperands { mnemonic: String, operands: String },
    #[error("bad register `{0}`")]
    BadRegister(String),
    #[error("bad number `{0}`")]
    BadNumber(String),
    #[error("bad label `{0}`")]
    BadLabel(String),
    #[error("`{token}` ({value}) does not fit in {width} bits")]
    OutOfRange { token: String, value: i64, width: u8 },
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
    #[error("program exceeds the 64K-word address space")]
    TooLarge,
}

/// Assembled program with its symbols and a word-to-line map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub words: Vec<u16>,
    pub labels: BTreeMap<String, u16>,
    /// Source line of each emitted word.
    pub lines: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Num { value: i64, token: String },
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Index {
    Reg(u8),
    Imm(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Reg(u8),
    Imm(Value),
    Bare(Value),
    Mem { base: u8, index: Option<Index> },
}

#[derive(Debug, Clone)]
enum Item {
    Instr { mnemonic: String, operands: Vec<Operand>, text: String },
    Word(Value),
}

#[derive(Debug, Clone)]
struct Line {
    no: usize,
    label: Option<String>,
    item: Option<Item>,
}

/// Assembles `src` into machine words.
pub fn assemble(src: &str) -> Result<Vec<u16>, AsmError> {
    assemble_full(src).map(|a| a.words)
}

pub fn assemble_full(src: &str) -> Result<Assembly, AsmError> {
    let mut lines = Vec::new();
    for (i, text) in src.lines().enumerate() {
        let no = i + 1;
        let line = parse_line(text).map_err(|kind| AsmError { line: no, kind })?;
        if let Some((label, item)) = line {
            lines.push(Line { no, label, item });
        }
    }

    // Pass 1: labels
    let mut labels = BTreeMap::new();
    let mut addr = 0usize;
    for l in &lines {
        if let Some(name) = &l.label {
            if addr > 0xFFFF {
                return Err(AsmError { line: l.no, kind: AsmErrorKind::TooLarge });
            }
            if labels.insert(name.clone(), addr as u16).is_some() {
                return Err(AsmError { line: l.no, kind: AsmErrorKind::DuplicateLabel(name.clone()) });
            }
        }
        if l.item.is_some() {
            addr += 1;
            if addr > 0x1_0000 {
                return Err(AsmError { line: l.no, kind: AsmErrorKind::TooLarge });
            }
        }
    }

    // Pass 2: encode
    let mut out = Assembly { labels, ..Default::default() };
    for l in &lines {
        let Some(item) = &l.item else { continue };
        let word = encode_item(item, &out.labels).map_err(|kind| AsmError { line: l.no, kind })?;
        out.words.push(word);
        out.lines.push(l.no);
    }
    Ok(out)
}

fn parse_line(text: &str) -> Result<Option<(Option<String>, Option<Item>)>, AsmErrorKind> {
    if text.trim_start().starts_with('#') {
        return Ok(None);
    }
    let mut s = text;
    if let Some(p) = s.find(';') {
        s = &s[..p];
    }
    let mut s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }

    let mut label = None;
    if let Some(p) = s.find(':') {
        let name = s[..p].trim();
        if !is_label(name) {
            return Err(AsmErrorKind::BadLabel(name.to_string()));
        }
        label = Some(name.to_string());
        s = s[p + 1..].trim();
    }
    if s.is_empty() {
        return Ok(Some((label, None)));
    }

    let (head, rest) = match s.find(char::is_whitespace) {
        Some(p) => (&s[..p], s[p..].trim()),
        None => (s, ""),
    };
    let mnemonic = head.to_lowercase();
    if mnemonic == ".word" {
        if rest.is_empty() {
            return Err(AsmErrorKind::MissingOperand { mnemonic });
        }
        return Ok(Some((label, Some(Item::Word(parse_value(rest)?)))));
    }
    let tokens = split_operands(rest);
    // `mov r0,` leaves an empty token behind the comma
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(AsmErrorKind::MissingOperand { mnemonic });
    }
    let operands = tokens
        .iter()
        .map(|t| parse_operand(t))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some((label, Some(Item::Instr { mnemonic, operands, text: rest.to_string() }))))
}

fn is_label(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Splits on commas that are not inside brackets.
fn split_operands(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for c in s.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                out.push(cur.trim().to_string());
                cur.clear();
                continue;
            }
            _ => {}
        }
        cur.push(c);
    }
    if !cur.trim().is_empty() || !out.is_empty() {
        out.push(cur.trim().to_string());
    }
    out
}

pub fn parse_register(s: &str) -> Option<u8> {
    let t = s.trim().to_lowercase();
    match t.as_str() {
        "sp" => Some(5),
        "lr" => Some(6),
        "psr" => Some(7),
        _ => t
            .strip_prefix('r')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|&n| n < 8),
    }
}

fn looks_like_register(s: &str) -> bool {
    let t = s.to_lowercase();
    matches!(t.as_str(), "sp" | "lr" | "psr")
        || t.strip_prefix('r').is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn parse_num(s: &str) -> Option<i64> {
    let t = s.trim();
    let (neg, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let v = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else {
        t.parse::<i64>().ok()?
    };
    Some(if neg { -v } else { v })
}

fn parse_value(s: &str) -> Result<Value, AsmErrorKind> {
    let t = s.trim();
    if t.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        let value = parse_num(t).ok_or_else(|| AsmErrorKind::BadNumber(t.to_string()))?;
        Ok(Value::Num { value, token: t.to_string() })
    } else if is_label(t) {
        Ok(Value::Label(t.to_string()))
    } else {
        Err(AsmErrorKind::BadNumber(t.to_string()))
    }
}

fn parse_reg_strict(s: &str) -> Result<u8, AsmErrorKind> {
    parse_register(s).ok_or_else(|| AsmErrorKind::BadRegister(s.trim().to_string()))
}

fn parse_operand(t: &str) -> Result<Operand, AsmErrorKind> {
    let t = t.trim();
    if let Some(inner) = t.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| AsmErrorKind::BadRegister(t.to_string()))?;
        let mut parts = inner.splitn(2, ',');
        let base = parse_reg_strict(parts.next().unwrap_or(""))?;
        let index = match parts.next().map(str::trim) {
            None => None,
            Some(ix) => match ix.strip_prefix('#') {
                Some(imm) => Some(Index::Imm(parse_value(imm)?)),
                None => Some(Index::Reg(parse_reg_strict(ix)?)),
            },
        };
        return Ok(Operand::Mem { base, index });
    }
    if let Some(imm) = t.strip_prefix('#') {
        return Ok(Operand::Imm(parse_value(imm)?));
    }
    if looks_like_register(t) {
        return Ok(Operand::Reg(parse_reg_strict(t)?));
    }
    Ok(Operand::Bare(parse_value(t)?))
}

fn operand_count(addr: AddrMode) -> usize {
    match addr {
        AddrMode::None => 0,
        AddrMode::Target | AddrMode::Reg | AddrMode::JumpIndirect => 1,
        AddrMode::ThreeReg | AddrMode::RegRegImm => 3,
        _ => 2,
    }
}

/// Operand bindings for `form`, or `None` when the operand shapes differ.
fn bind<'a>(op: Op, form: &Form, operands: &'a [Operand]) -> Option<Vec<(Field, Binding<'a>)>> {
    use Binding::{Reg, Val};
    use Operand as O;
    let store = op == Op::Store;
    let b = match (form.addr, operands) {
        (AddrMode::None, []) => vec![],
        (AddrMode::Target, [O::Bare(v) | O::Imm(v)]) => vec![(Field::Imm, Val(v))],
        (AddrMode::Reg, [O::Reg(r)]) => {
            let field = if op == Op::Push { Field::Rs } else { Field::Rd };
            vec![(field, Reg(*r))]
        }
        (AddrMode::RegReg, [O::Reg(d), O::Reg(s)]) => vec![(Field::Rd, Reg(*d)), (Field::Rs, Reg(*s))],
        (AddrMode::RegImm | AddrMode::Immediate, [O::Reg(d), O::Imm(v)]) => {
            vec![(Field::Rd, Reg(*d)), (Field::Imm, Val(v))]
        }
        (AddrMode::ThreeReg, [O::Reg(d), O::Reg(s), O::Reg(t)]) => {
            vec![(Field::Rd, Reg(*d)), (Field::Rs, Reg(*s)), (Field::Rt, Reg(*t))]
        }
        (AddrMode::RegRegImm, [O::Reg(d), O::Reg(s), O::Imm(v)]) => {
            vec![(Field::Rd, Reg(*d)), (Field::Rs, Reg(*s)), (Field::Imm, Val(v))]
        }
        (AddrMode::Indirect | AddrMode::IndirectIndexed | AddrMode::IndirectOffset, [O::Reg(r), O::Mem { base, index }]) => {
            let (reg_field, base_field) = if store { (Field::Rs, Field::Rd) } else { (Field::Rd, Field::Rs) };
            let mut v = vec![(reg_field, Reg(*r)), (base_field, Reg(*base))];
            match (form.addr, index) {
                (AddrMode::Indirect, None) => {}
                (AddrMode::IndirectIndexed, Some(Index::Reg(t))) => v.push((Field::Rt, Reg(*t))),
                (AddrMode::IndirectOffset, Some(Index::Imm(imm))) => v.push((Field::Imm, Val(imm))),
                _ => return None,
            }
            v
        }
        (AddrMode::JumpIndirect, [O::Mem { base, index }]) => match index {
            None => vec![(Field::Rd, Reg(*base)), (Field::Imm, Binding::Zero)],
            Some(Index::Imm(v)) => vec![(Field::Rd, Reg(*base)), (Field::Imm, Val(v))],
            Some(Index::Reg(_)) => return None,
        },
        _ => return None,
    };
    Some(b)
}

enum Binding<'a> {
    Reg(u8),
    Val(&'a Value),
    Zero,
}

fn resolve(v: &Value, labels: &BTreeMap<String, u16>) -> Result<(i64, String), AsmErrorKind> {
    match v {
        Value::Num { value, token } => Ok((*value, token.clone())),
        Value::Label(name) => labels
            .get(name)
            .map(|&a| (a as i64, name.clone()))
            .ok_or_else(|| AsmErrorKind::UndefinedLabel(name.clone())),
    }
}

fn encode_item(item: &Item, labels: &BTreeMap<String, u16>) -> Result<u16, AsmErrorKind> {
    let (mnemonic, operands, text) = match item {
        Item::Word(v) => {
            let (value, token) = resolve(v, labels)?;
            if !(-0x8000..=0xFFFF).contains(&value) {
                return Err(AsmErrorKind::OutOfRange { token, value, width: 16 });
            }
            return Ok(value as u16);
        }
        Item::Instr { mnemonic, operands, text } => (mnemonic, operands, text),
    };

    let forms: Vec<(Op, &Form)> = instructions::lookup(mnemonic).collect();
    if forms.is_empty() {
        return Err(AsmErrorKind::UnknownMnemonic(mnemonic.clone()));
    }
    let Some((op, form, bindings)) = forms
        .iter()
        .find_map(|&(op, form)| bind(op, form, operands).map(|b| (op, form, b)))
    else {
        let min = forms.iter().map(|(_, f)| operand_count(f.addr)).min().unwrap_or(0);
        return Err(if operands.len() < min {
            AsmErrorKind::MissingOperand { mnemonic: mnemonic.clone() }
        } else {
            AsmErrorKind::BadOperands { mnemonic: mnemonic.clone(), operands: text.clone() }
        });
    };

    let mut fields = Vec::with_capacity(bindings.len());
    for (field, binding) in bindings {
        let value = match binding {
            Binding::Reg(r) => r as u16,
            Binding::Zero => 0,
            Binding::Val(v) => {
                let (value, token) = resolve(v, labels)?;
                let width = form.slot(field).map_or(0, |s| s.width);
                if value < 0 || value > ((1i64 << width) - 1) {
                    return Err(AsmErrorKind::OutOfRange { token, value, width });
                }
                value as u16
            }
        };
        fields.push((field, value));
    }
    encode(op, form.mode, &fields).map_err(|e| AsmErrorKind::BadOperands {
        mnemonic: mnemonic.clone(),
        operands: format!("{text} ({e})"),
    })
}
