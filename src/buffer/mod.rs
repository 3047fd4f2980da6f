use std::sync::Arc;

use crate::buffer::directory::PageDirectory;
use crate::buffer::frame::{FrameDesc, FrameId};
use crate::error::{Error, Result};
use crate::storage::page::{Page, PageData};
use crate::storage::{PageFile, PageNo};

pub mod directory;
pub mod frame;

/// The buffer manager mediates between page files on disk and in-memory
/// callers. It owns a fixed pool of page-sized frames, keeps at most one
/// resident copy of any page, and evicts with a clock approximation of
/// LRU.
///
/// Callers borrow resident pages through shared Page handles and declare
/// the end of each use with unpin_page; while a page holds pins its
/// frame is never recycled. The manager is built for a single-threaded
/// caller and does not serialize itself.
pub struct BufMgr {
    /// Per-frame bookkeeping, indexed by frame number.
    descriptors: Vec<FrameDesc>,
    /// The page images backing the descriptors, same indexing.
    pool: Vec<Arc<Page>>,
    /// Maps (file, page number) to the frame holding that page.
    directory: PageDirectory,
    /// Rotating index of the clock replacement sweep.
    clock_hand: usize,
}

impl BufMgr {
    pub fn new(num_frames: u32) -> BufMgr {
        assert!(num_frames > 0, "buffer pool needs at least one frame");
        let num_frames = num_frames as usize;
        BufMgr {
            descriptors: (0..num_frames).map(FrameDesc::new).collect(),
            pool: (0..num_frames).map(|_| Arc::new(Page::new(PageData::empty()))).collect(),
            directory: PageDirectory::new(num_frames),
            clock_hand: num_frames - 1,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.descriptors.len()
    }

    /// Borrow the page with the given number, faulting it in from the
    /// file on a directory miss. The page comes back pinned; the caller
    /// must hand the pin back with exactly one unpin_page.
    pub fn read_page(&mut self, file: &Arc<dyn PageFile>, page_no: PageNo) -> Result<Arc<Page>> {
        match self.directory.lookup(file.id(), page_no) {
            Ok(frame_no) => {
                let desc = &mut self.descriptors[frame_no];
                desc.ref_bit = true;
                desc.pin_count += 1;
                Ok(Arc::clone(&self.pool[frame_no]))
            }
            Err(Error::HashNotFound { .. }) => {
                let frame_no = self.alloc_buf()?;
                let data = file.read_page(page_no)?;
                self.directory.insert(file.id(), page_no, frame_no)?;
                self.descriptors[frame_no].set(Arc::clone(file), page_no);
                *self.pool[frame_no].write()? = data;
                Ok(Arc::clone(&self.pool[frame_no]))
            }
            Err(err) => Err(err),
        }
    }

    /// Give back one pin taken by read_page or alloc_page. A true dirty
    /// argument marks the page modified; the mark sticks until the page
    /// is written back, regardless of later clean unpins.
    pub fn unpin_page(&mut self, file: &Arc<dyn PageFile>, page_no: PageNo, dirty: bool) -> Result<()> {
        let frame_no = self.directory.lookup(file.id(), page_no)?;
        let desc = &mut self.descriptors[frame_no];
        if dirty {
            desc.dirty = true;
        }
        if desc.pin_count == 0 {
            return Err(Error::PageNotPinned {
                filename: file.filename().to_string(),
                page_no,
                frame_no,
            });
        }
        desc.pin_count -= 1;
        Ok(())
    }

    /// Create a fresh page in the file and install it in the pool,
    /// pinned. Returns the new page number along with the page handle.
    pub fn alloc_page(&mut self, file: &Arc<dyn PageFile>) -> Result<(PageNo, Arc<Page>)> {
        let data = file.allocate_page()?;
        let page_no = data.page_number();
        let frame_no = self.alloc_buf()?;
        self.directory.insert(file.id(), page_no, frame_no)?;
        self.descriptors[frame_no].set(Arc::clone(file), page_no);
        *self.pool[frame_no].write()? = data;
        Ok((page_no, Arc::clone(&self.pool[frame_no])))
    }

    /// Drop every in-memory trace of the page, then delete it from the
    /// file. A page that is not resident is deleted from the file only.
    pub fn dispose_page(&mut self, file: &Arc<dyn PageFile>, page_no: PageNo) -> Result<()> {
        match self.directory.lookup(file.id(), page_no) {
            Ok(frame_no) => {
                self.descriptors[frame_no].clear();
                self.directory.remove(file.id(), page_no)?;
            }
            Err(Error::HashNotFound { .. }) => {}
            Err(err) => return Err(err),
        }
        file.delete_page(page_no)
    }

    /// Write back and evict every frame belonging to the file. Runs a
    /// precheck pass first so that a PagePinned or BadBuffer failure
    /// leaves the pool untouched.
    pub fn flush_file(&mut self, file: &Arc<dyn PageFile>) -> Result<()> {
        let file_id = file.id();
        for desc in &self.descriptors {
            if desc.file_id() != Some(file_id) {
                continue;
            }
            if desc.pin_count > 0 {
                return Err(Error::PagePinned {
                    filename: file.filename().to_string(),
                    page_no: desc.page_no,
                    frame_no: desc.frame_no,
                });
            }
            if !desc.valid {
                return Err(Error::BadBuffer {
                    frame_no: desc.frame_no,
                    dirty: desc.dirty,
                    valid: desc.valid,
                    ref_bit: desc.ref_bit,
                });
            }
        }
        for frame_no in 0..self.descriptors.len() {
            if self.descriptors[frame_no].file_id() != Some(file_id) {
                continue;
            }
            if self.descriptors[frame_no].dirty {
                file.write_page(&*self.pool[frame_no].read()?)?;
                self.descriptors[frame_no].dirty = false;
            }
            self.directory.remove(file_id, self.descriptors[frame_no].page_no)?;
            self.descriptors[frame_no].clear();
        }
        Ok(())
    }

    /// Log the state of every frame.
    pub fn print_self(&self) {
        let valid_frames = self.descriptors.iter().filter(|desc| desc.valid).count();
        for desc in &self.descriptors {
            log::debug!("{}", desc);
        }
        log::debug!("{} of {} frames valid", valid_frames, self.descriptors.len());
    }

    /// Select and prepare an empty frame for a page about to become
    /// resident. The returned frame is invalid, unpinned and absent from
    /// the directory; a dirty victim has been written back first.
    fn alloc_buf(&mut self) -> Result<FrameId> {
        // the sweep below cannot terminate when every frame is pinned,
        // so that case fails up front
        if self.descriptors.iter().all(|desc| desc.pin_count > 0) {
            return Err(Error::BufferExceeded);
        }

        let num_frames = self.descriptors.len();
        let mut found = false;
        let mut ticks = 0;
        while ticks < 2 * num_frames && !found {
            self.advance_clock();
            let desc = &mut self.descriptors[self.clock_hand];
            if !desc.valid {
                found = true;
            } else if desc.ref_bit {
                desc.ref_bit = false;
                if desc.pin_count == 0 {
                    found = true;
                }
            } else if desc.pin_count == 0 {
                found = true;
            }
            ticks += 1;
        }
        if !found {
            return Err(Error::BufferExceeded);
        }

        let victim = self.clock_hand;
        if let Some(file) = self.descriptors[victim].file.clone() {
            if self.descriptors[victim].dirty {
                file.write_page(&*self.pool[victim].read()?)?;
                self.descriptors[victim].dirty = false;
            }
            self.directory.remove(file.id(), self.descriptors[victim].page_no)?;
        }
        self.descriptors[victim].clear();
        Ok(victim)
    }

    fn advance_clock(&mut self) {
        self.clock_hand = (self.clock_hand + 1) % self.descriptors.len();
    }
}

impl Drop for BufMgr {
    /// Teardown writes back whatever is still dirty, best effort: a file
    /// that cannot be flushed is logged and skipped.
    fn drop(&mut self) {
        for frame_no in 0..self.descriptors.len() {
            if !(self.descriptors[frame_no].valid && self.descriptors[frame_no].dirty) {
                continue;
            }
            let Some(file) = self.descriptors[frame_no].file.clone() else {
                continue;
            };
            if let Err(err) = self.flush_file(&file) {
                log::error!("teardown flush of file {} failed: {}", file.filename(), err);
            }
        }
    }
}

#[cfg(test)]
impl BufMgr {
    /// Asserts the documented consistency between the directory and the
    /// descriptor table.
    fn check_invariants(&self) {
        use std::collections::HashSet;

        let mut mapped_frames = HashSet::new();
        let mut mapped_keys = HashSet::new();
        for (file_id, page_no, frame_no) in self.directory.entries() {
            let desc = &self.descriptors[frame_no];
            assert!(desc.valid, "directory maps to invalid frame {}", frame_no);
            assert_eq!(Some(file_id), desc.file_id());
            assert_eq!(page_no, desc.page_no);
            assert!(mapped_frames.insert(frame_no), "frame {} mapped twice", frame_no);
            assert!(mapped_keys.insert((file_id, page_no)), "key mapped twice");
        }
        for desc in &self.descriptors {
            if desc.valid {
                let file_id = desc.file_id().expect("valid frame without file");
                assert_eq!(
                    Ok(desc.frame_no),
                    self.directory.lookup(file_id, desc.page_no),
                    "valid frame {} missing from directory",
                    desc.frame_no
                );
            } else {
                assert!(!mapped_frames.contains(&desc.frame_no));
                assert_eq!(0, desc.pin_count);
                assert!(!desc.dirty);
                assert!(!desc.ref_bit);
            }
        }
    }
}
