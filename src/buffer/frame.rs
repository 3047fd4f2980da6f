use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::storage::{FileId, PageFile, PageNo, INVALID_PAGE_NO};

/// Index of a frame in the buffer pool. Assigned at construction and
/// stable for the lifetime of the pool.
pub type FrameId = usize;

/// Bookkeeping for one frame: which page it holds, how many callers have
/// it pinned, whether the in-memory copy diverged from disk, and the
/// reference bit consulted by the clock sweep.
pub(crate) struct FrameDesc {
    pub(crate) frame_no: FrameId,
    pub(crate) valid: bool,
    /// Shared handle of the owning file; None while the frame is empty.
    /// The handle is kept only for directory keying and write-back, the
    /// file itself stays owned by the caller.
    pub(crate) file: Option<Arc<dyn PageFile>>,
    pub(crate) page_no: PageNo,
    pub(crate) pin_count: u32,
    pub(crate) dirty: bool,
    pub(crate) ref_bit: bool,
}

impl FrameDesc {
    pub(crate) fn new(frame_no: FrameId) -> FrameDesc {
        FrameDesc {
            frame_no,
            valid: false,
            file: None,
            page_no: INVALID_PAGE_NO,
            pin_count: 0,
            dirty: false,
            ref_bit: false,
        }
    }

    /// Bind the frame to a newly resident page: one pin, clean, recently
    /// referenced.
    pub(crate) fn set(&mut self, file: Arc<dyn PageFile>, page_no: PageNo) {
        self.valid = true;
        self.file = Some(file);
        self.page_no = page_no;
        self.pin_count = 1;
        self.dirty = false;
        self.ref_bit = true;
    }

    /// Return the frame to its empty state, keeping only frame_no.
    pub(crate) fn clear(&mut self) {
        self.valid = false;
        self.file = None;
        self.page_no = INVALID_PAGE_NO;
        self.pin_count = 0;
        self.dirty = false;
        self.ref_bit = false;
    }

    pub(crate) fn file_id(&self) -> Option<FileId> {
        self.file.as_ref().map(|file| file.id())
    }
}

impl Display for FrameDesc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.valid {
            return write!(f, "frame {}: empty", self.frame_no);
        }
        let filename = self.file.as_ref().map(|file| file.filename().to_string()).unwrap_or_default();
        write!(
            f,
            "frame {}: file {} page {} pin_count {} dirty {} ref_bit {}",
            self.frame_no, filename, self.page_no, self.pin_count, self.dirty, self.ref_bit
        )
    }
}
