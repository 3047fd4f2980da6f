use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::storage::page::PageData;

pub mod file;
pub mod memory;
pub mod page;

/// A page number within a single file. Page 0 is reserved for file
/// metadata, so data pages are numbered from 1.
pub type PageNo = u32;

/// Process-unique identity of an open page file. The buffer manager keys
/// its page directory on (FileId, PageNo), so two handles onto the same
/// path are treated as distinct files.
pub type FileId = u64;

/// Size of a page in bytes.
pub const PAGE_SIZE: usize = 8192;

/// Page number that never names an allocated page.
pub const INVALID_PAGE_NO: PageNo = 0;

/// A store of fixed-size pages, one per file. The buffer manager never
/// owns a file; it holds shared handles and uses them for read-through
/// and write-back only.
/// The trait is designed as `trait object` compatible so the manager can
/// cache pages of disk-backed and in-memory files alike.
pub trait PageFile: Debug + Send + Sync {
    /// The identity of this handle, used for page directory keys.
    fn id(&self) -> FileId;

    /// The name of the file, used in error messages only.
    fn filename(&self) -> &str;

    /// Reads the page image with the given page number.
    /// Fails with InvalidPage if the page is not allocated.
    fn read_page(&self, page_no: PageNo) -> Result<PageData>;

    /// Writes a page image back to the store. The page identifies itself
    /// by its page_number(). Durable on return as far as the buffer
    /// manager is concerned.
    fn write_page(&self, page: &PageData) -> Result<()>;

    /// Allocates a fresh zeroed page and returns its image. Page numbers
    /// freed by delete_page may be reused.
    fn allocate_page(&self) -> Result<PageData>;

    /// Deletes an allocated page from the store.
    /// Fails with InvalidPage if the page is not allocated.
    fn delete_page(&self, page_no: PageNo) -> Result<()>;
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Disk,
    Memory,
}

pub fn open_page_file(typ: StorageType, path: &str) -> Result<Arc<dyn PageFile>> {
    match typ {
        StorageType::Disk => Ok(Arc::new(file::DiskFile::open(path)?)),
        StorageType::Memory => Ok(Arc::new(memory::MemFile::new(path))),
    }
}

pub(crate) fn next_file_id() -> FileId {
    static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed)
}
