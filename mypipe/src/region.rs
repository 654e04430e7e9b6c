//! Caller-supplied byte regions
//!
//! A write copies bytes out of a [`SourceRegion`], a read copies bytes into a
//! [`DestRegion`]. The region is owned by whoever invoked the transfer and may
//! sit on the far side of a trust boundary, so every copy can fail with a
//! [`RegionFault`]. Plain byte slices are regions that fault when the
//! requested range runs past their end.

use std::fmt;

/// A copy touched bytes the caller did not make accessible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionFault {
    /// Offset into the caller's region where the failed copy started
    pub offset: usize,
    /// Length of the failed copy
    pub len: usize,
}

impl fmt::Display for RegionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot access {} bytes at offset {} of caller region",
            self.len, self.offset
        )
    }
}

impl std::error::Error for RegionFault {}

/// Region the pipe copies from during a write
pub trait SourceRegion {
    /// Fill `dst` with the bytes at `offset..offset + dst.len()`
    ///
    /// # Errors
    /// Returns [`RegionFault`] if any byte of that range is inaccessible.
    fn copy_out(&self, offset: usize, dst: &mut [u8]) -> Result<(), RegionFault>;
}

/// Region the pipe copies into during a read
pub trait DestRegion {
    /// Store `src` at `offset..offset + src.len()`
    ///
    /// # Errors
    /// Returns [`RegionFault`] if any byte of that range is inaccessible.
    fn copy_in(&mut self, offset: usize, src: &[u8]) -> Result<(), RegionFault>;
}

fn span(offset: usize, len: usize) -> Result<std::ops::Range<usize>, RegionFault> {
    let end = offset
        .checked_add(len)
        .ok_or(RegionFault { offset, len })?;
    Ok(offset..end)
}

impl SourceRegion for [u8] {
    fn copy_out(&self, offset: usize, dst: &mut [u8]) -> Result<(), RegionFault> {
        let fault = RegionFault {
            offset,
            len: dst.len(),
        };
        let src = self.get(span(offset, dst.len())?).ok_or(fault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl DestRegion for [u8] {
    fn copy_in(&mut self, offset: usize, src: &[u8]) -> Result<(), RegionFault> {
        let fault = RegionFault {
            offset,
            len: src.len(),
        };
        let dst = self.get_mut(span(offset, src.len())?).ok_or(fault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}
