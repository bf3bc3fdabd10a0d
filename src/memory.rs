use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Word-addressed memory as seen by the CPU. Addresses are `u32` so that an
/// effective address past the end of the space is reported instead of wrapping.
pub trait Bus {
    fn read(&mut self, addr: u32) -> Result<u16>;
    fn write(&mut self, addr: u32, val: u16) -> Result<()>;

    /// Number of addressable words, when the bus knows it.
    fn capacity(&self) -> Option<u32> {
        None
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address {addr:#06x} outside memory of {size:#x} words")]
    OutOfRange { addr: u32, size: u32 },
    #[error("write to ROM at {addr:#06x}")]
    ReadOnly { addr: u32 },
    #[error("program of {len} words exceeds ROM capacity of {capacity} words")]
    ProgramTooLarge { len: usize, capacity: u32 },
    #[error("invalid memory map: {reason}")]
    InvalidMap { reason: &'static str },
    #[error("image has an odd number of bytes ({len})")]
    OddImage { len: usize },
}

/// Layout of the address space: ROM at the bottom, stack at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryMap {
    /// Total words of storage.
    pub size: u32,
    /// Words reserved for the program, starting at address 0.
    pub rom_words: u32,
    /// Initial stack pointer; the first push lands one below it.
    pub stack_base: u16,
    /// Lowest address the stack pointer may reach.
    pub stack_floor: u16,
    /// Reject instruction writes into ROM.
    pub protect_rom: bool,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            size: 0x1_0000,
            rom_words: 0x2000,
            stack_base: 0xFFFF,
            stack_floor: 0xF000,
            protect_rom: false,
        }
    }
}

impl MemoryMap {
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.size > 0x1_0000 {
            return Err(MemoryError::InvalidMap { reason: "size exceeds 65536 words" });
        }
        if u32::from(self.stack_base) >= self.size {
            return Err(MemoryError::InvalidMap { reason: "stack base outside memory" });
        }
        if self.stack_floor > self.stack_base {
            return Err(MemoryError::InvalidMap { reason: "stack floor above stack base" });
        }
        if self.rom_words > u32::from(self.stack_floor) {
            return Err(MemoryError::InvalidMap { reason: "ROM overlaps the stack" });
        }
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WordMemory {
    pub mem: Vec<u16>,
    pub map: MemoryMap,
}

impl WordMemory {
    /// Zeroed storage laid out per `map`. Rejects maps that fail [`MemoryMap::validate`].
    pub fn new(map: MemoryMap) -> Result<Self, MemoryError> {
        map.validate()?;
        Ok(Self {
            mem: vec![0; map.size as usize],
            map,
        })
    }

    /// Copies `program` to the bottom of memory. Loading ignores `protect_rom`.
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), MemoryError> {
        // `mem` and `map` are public, so the ROM may not fit the storage
        let capacity = self.map.rom_words.min(self.mem.len() as u32);
        if program.len() > capacity as usize {
            return Err(MemoryError::ProgramTooLarge {
                len: program.len(),
                capacity,
            });
        }
        self.mem[..program.len()].copy_from_slice(program);
        Ok(())
    }

    fn check(&self, addr: u32) -> Result<usize, MemoryError> {
        if addr < self.map.size && (addr as usize) < self.mem.len() {
            Ok(addr as usize)
        } else {
            Err(MemoryError::OutOfRange {
                addr,
                size: self.map.size,
            })
        }
    }
}

impl Default for WordMemory {
    fn default() -> Self {
        let map = MemoryMap::default();
        Self {
            mem: vec![0; map.size as usize],
            map,
        }
    }
}

impl std::fmt::Debug for WordMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordMemory")
            .field("words", &self.mem.len())
            .field("map", &self.map)
            .finish()
    }
}

impl Bus for WordMemory {
    fn read(&mut self, addr: u32) -> Result<u16> {
        let off = self.check(addr)?;
        Ok(self.mem[off])
    }
    fn write(&mut self, addr: u32, val: u16) -> Result<()> {
        let off = self.check(addr)?;
        if self.map.protect_rom && addr < self.map.rom_words {
            return Err(MemoryError::ReadOnly { addr }.into());
        }
        self.mem[off] = val;
        Ok(())
    }
    fn capacity(&self) -> Option<u32> {
        Some(self.map.size)
    }
}

/// Decodes a little-endian image into words.
pub fn words_from_le(bytes: &[u8]) -> Result<Vec<u16>, MemoryError> {
    if bytes.len() % 2 != 0 {
        return Err(MemoryError::OddImage { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect())
}

pub fn words_to_le(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
