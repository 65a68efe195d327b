use crate::cell::CellRecord;
use crate::error::BridgeError;
use crate::grid::{Grid, Size};

/// Packed per-cell visual attributes, filled by the simulation once per step
/// and read back by [`apply_buffer`] on the same call stack.
#[derive(Debug, Clone)]
pub struct RenderBuffer {
    bytes: Vec<u8>,
    size: Size,
}

impl RenderBuffer {
    pub fn new(size: Size) -> Self {
        Self {
            bytes: vec![0; size.area() * CellRecord::BYTES],
            size,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn record(&self, x: usize, y: usize) -> Option<CellRecord> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }

        let offset = (y * self.size.width + x) * CellRecord::BYTES;

        CellRecord::from_bytes(&self.bytes[offset..])
    }
}

/// Decodes every record of `buffer` onto the matching cell of `pool`.
///
/// Cells are rewritten unconditionally, in row-major order; there is no diff
/// against the previous frame.
pub fn apply_buffer<T, F>(buffer: &[u8], pool: &Grid<T>, mut paint: F) -> Result<(), BridgeError>
where
    F: FnMut(&T, &CellRecord) -> Result<(), BridgeError>,
{
    let expected = pool.size() * CellRecord::BYTES;

    if buffer.len() != expected {
        return Err(BridgeError::BufferSize {
            expected,
            actual: buffer.len(),
        });
    }

    for (cell, chunk) in pool.values().zip(buffer.chunks_exact(CellRecord::BYTES)) {
        if let Some(record) = CellRecord::from_bytes(chunk) {
            paint(cell, &record)?;
        }
    }

    Ok(())
}
