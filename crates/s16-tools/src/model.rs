use anyhow::Result;
use serde::Serialize;
use std::path::Path;

pub use s16_rs::memory::{words_from_le, words_to_le};

/// A run of words placed at a word address.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub name: String,
    pub base: u16,
    pub words: Vec<u16>,
    pub perms: &'static str, // e.g., "r-x"
    pub kind: &'static str,  // e.g., "raw"
}

#[derive(Debug, Clone, Serialize)]
pub struct Image {
    pub segments: Vec<Segment>,
}

/// Loads a raw word image. `skip` and `len` count words, not bytes.
pub fn load_raw_image(path: &Path, base: u16, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    let words = words_from_le(&file)?;
    anyhow::ensure!(skip <= words.len(), "--skip exceeds image size");
    let mut payload = &words[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining image size after skip");
        payload = &payload[..lim];
    }
    anyhow::ensure!(
        base as usize + payload.len() <= 0x1_0000,
        "image does not fit the 64K-word address space at {base:#06x}"
    );
    let seg = Segment { name: "segment0".into(), base, words: payload.to_vec(), perms: "r-x", kind: "raw" };
    Ok(Image { segments: vec![seg] })
}

pub fn read_word(img: &Image, addr: u16) -> Option<u16> {
    for s in &img.segments {
        let start = s.base as u32;
        let end = start + s.words.len() as u32;
        let a = addr as u32;
        if a >= start && a < end {
            return Some(s.words[(a - start) as usize]);
        }
    }
    None
}
