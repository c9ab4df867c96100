//! Address decoding for a 24-bit bus.
//!
//! A board describes its address space as a list of regions, each backed by
//! an arena the board owns (identified by a small id) or by a bank window
//! whose page can be moved at runtime. [`MemoryMap::resolve`] turns a bus
//! address into the backing and the offset inside it; addresses no region
//! covers are open bus.

use std::ops::RangeInclusive;

/// What a mapped region is backed by. The `u8` is a board-defined id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backing {
    /// Read/write storage.
    Ram(u8),
    /// Read-only image.
    Rom(u8),
    /// Paged window onto a large image. The id is the window number.
    Window(u8),
    /// Peripheral register block.
    Io(u8),
}

/// A resolved access: the backing, and the byte offset inside it.
///
/// For windows the offset already includes the selected page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapped {
    pub backing: Backing,
    pub offset: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Region {
    range: RangeInclusive<u32>,
    backing: Backing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryMap {
    regions: Vec<Region>,
    /// Selected page per window.
    pages: Vec<u32>,
    page_size: u32,
}

impl MemoryMap {
    /// An empty map whose bank windows move in units of `page_size` bytes.
    pub fn new(page_size: u32) -> Self {
        assert!(page_size > 0, "bank page size must be non-zero");
        Self {
            regions: Vec::new(),
            pages: Vec::new(),
            page_size,
        }
    }

    /// Map `range` to `backing`. A later mapping shadows earlier ones where they overlap.
    pub fn map_region(&mut self, range: RangeInclusive<u32>, backing: Backing) {
        if let Backing::Window(w) = backing {
            let w = w as usize;
            if self.pages.len() <= w {
                self.pages.resize(w + 1, 0);
            }
        }
        self.regions.push(Region { range, backing });
    }

    /// Point `window` at `page`. Unknown windows are ignored.
    pub fn set_bank_window(&mut self, window: u8, page: u32) {
        if let Some(slot) = self.pages.get_mut(window as usize) {
            if *slot != page {
                tracing::debug!(window, page, "bank switch");
            }
            *slot = page;
        }
    }

    pub fn bank_page(&self, window: u8) -> Option<u32> {
        self.pages.get(window as usize).copied()
    }

    /// Decode `addr`, or `None` for open bus.
    pub fn resolve(&self, addr: u32) -> Option<Mapped> {
        let addr = addr & 0x00FF_FFFF;
        let region = self.regions.iter().rev().find(|r| r.range.contains(&addr))?;
        let local = addr - region.range.start();
        let offset = match region.backing {
            Backing::Window(w) => {
                let page = self.pages.get(w as usize).copied().unwrap_or(0);
                page.wrapping_mul(self.page_size).wrapping_add(local)
            }
            _ => local,
        };
        Some(Mapped {
            backing: region.backing,
            offset,
        })
    }

    pub fn save_pages(&self) -> &[u32] {
        &self.pages
    }

    /// Restore window pages saved with [`save_pages`](Self::save_pages).
    pub fn restore_pages(&mut self, pages: &[u32]) {
        for (slot, &page) in self.pages.iter_mut().zip(pages) {
            *slot = page;
        }
    }
}
