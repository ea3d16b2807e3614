use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path};

/// Returns `block` zero-padded on the right to `block_size` bytes.
/// Input longer than `block_size` is returned unchanged.
pub fn pad_block(block: &[u8], block_size: usize) -> Vec<u8> {
    let mut padded = Vec::with_capacity(block_size.max(block.len()));
    padded.extend_from_slice(block);
    if padded.len() < block_size {
        padded.resize(block_size, 0);
    }
    padded
}

/// XOR `source` into `target` byte by byte. Bytes of `source` past the end of
/// `target` are ignored, missing bytes count as zero.
pub fn xor_into(target: &mut [u8], source: &[u8]) {
    for (t, s) in target.iter_mut().zip(source) {
        *t ^= s;
    }
}

/// Write `val` in "both-endian" form: 4 bytes little-endian followed by 4 bytes big-endian.
pub fn put_u32_both(buf: &mut [u8], val: u32) {
    buf[0..4].copy_from_slice(&val.to_le_bytes());
    buf[4..8].copy_from_slice(&val.to_be_bytes());
}

/// Write `val` in "both-endian" form: 2 bytes little-endian followed by 2 bytes big-endian.
pub fn put_u16_both(buf: &mut [u8], val: u16) {
    buf[0..2].copy_from_slice(&val.to_le_bytes());
    buf[2..4].copy_from_slice(&val.to_be_bytes());
}

/// Reads a both-endian u32, returning `None` if the two halves disagree.
pub fn get_u32_both(buf: &[u8]) -> Option<u32> {
    let le = u32::from_le_bytes(buf[0..4].try_into().ok()?);
    let be = u32::from_be_bytes(buf[4..8].try_into().ok()?);
    (le == be).then_some(le)
}

/// Reads a both-endian u16, returning `None` if the two halves disagree.
pub fn get_u16_both(buf: &[u8]) -> Option<u16> {
    let le = u16::from_le_bytes(buf[0..2].try_into().ok()?);
    let be = u16::from_be_bytes(buf[2..4].try_into().ok()?);
    (le == be).then_some(le)
}

/// Copy `text` into `field`, padding the rest of the field with `pad`.
/// Text longer than the field is truncated.
pub fn put_padded(field: &mut [u8], text: &[u8], pad: u8) {
    field.fill(pad);
    let len = text.len().min(field.len());
    field[..len].copy_from_slice(&text[..len]);
}

/// True when `name` is a single normal path component (no separators, `.` or `..`).
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

/// Writes `data` to `path`, creating parent directories as needed.
pub fn write_file<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

/// Reads `path`, mapping "not found" to `None`.
pub fn read_optional<P: AsRef<Path>>(path: P) -> Result<Option<Vec<u8>>> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}
