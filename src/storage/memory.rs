use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::storage::page::PageData;
use crate::storage::{next_file_id, FileId, PageFile, PageNo};

/// An in-memory page store with the same contract as DiskFile. Backs
/// tests and throwaway runs, and counts per-page I/O so callers can
/// observe read-through and write-back traffic.
#[derive(Debug)]
pub struct MemFile {
    id: FileId,
    filename: String,
    inner: Mutex<MemInner>,
}

#[derive(Debug)]
struct MemInner {
    next_page_no: PageNo,
    free: Vec<PageNo>,
    pages: BTreeMap<PageNo, Vec<u8>>,
    reads: HashMap<PageNo, u64>,
    writes: HashMap<PageNo, u64>,
}

impl MemFile {
    pub fn new(name: &str) -> MemFile {
        MemFile {
            id: next_file_id(),
            filename: name.to_string(),
            inner: Mutex::new(MemInner {
                next_page_no: 1,
                free: Vec::new(),
                pages: BTreeMap::new(),
                reads: HashMap::new(),
                writes: HashMap::new(),
            }),
        }
    }

    /// Number of times read_page returned the given page.
    pub fn read_count(&self, page_no: PageNo) -> u64 {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.reads.get(&page_no).copied().unwrap_or(0)
    }

    /// Number of times write_page stored the given page.
    pub fn write_count(&self, page_no: PageNo) -> u64 {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.writes.get(&page_no).copied().unwrap_or(0)
    }

    fn invalid(&self, page_no: PageNo) -> Error {
        Error::InvalidPage { page_no, filename: self.filename.clone() }
    }
}

impl PageFile for MemFile {
    fn id(&self) -> FileId {
        self.id
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn read_page(&self, page_no: PageNo) -> Result<PageData> {
        let mut inner = self.inner.lock()?;
        let image = match inner.pages.get(&page_no) {
            Some(image) => image.clone(),
            None => return Err(self.invalid(page_no)),
        };
        *inner.reads.entry(page_no).or_insert(0) += 1;
        PageData::from_bytes(image)
    }

    fn write_page(&self, page: &PageData) -> Result<()> {
        let page_no = page.page_number();
        let mut inner = self.inner.lock()?;
        if !inner.pages.contains_key(&page_no) {
            return Err(self.invalid(page_no));
        }
        inner.pages.insert(page_no, page.as_bytes().to_vec());
        *inner.writes.entry(page_no).or_insert(0) += 1;
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageData> {
        let mut inner = self.inner.lock()?;
        let page_no = match inner.free.pop() {
            Some(page_no) => page_no,
            None => {
                let page_no = inner.next_page_no;
                inner.next_page_no += 1;
                page_no
            }
        };
        let page = PageData::new(page_no);
        inner.pages.insert(page_no, page.as_bytes().to_vec());
        Ok(page)
    }

    fn delete_page(&self, page_no: PageNo) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if inner.pages.remove(&page_no).is_none() {
            return Err(self.invalid(page_no));
        }
        inner.free.push(page_no);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_lifecycle() -> Result<()> {
        let file = MemFile::new("lifecycle");

        let mut page = file.allocate_page()?;
        assert_eq!(1, page.page_number());
        let rid = page.insert_record(b"in memory")?;
        file.write_page(&page)?;

        let read = file.read_page(1)?;
        assert_eq!(b"in memory", read.get_record(rid)?);
        assert_eq!(1, file.read_count(1));
        assert_eq!(1, file.write_count(1));

        file.delete_page(1)?;
        assert!(matches!(file.read_page(1), Err(Error::InvalidPage { .. })));
        // the freed number comes back on the next allocation
        assert_eq!(1, file.allocate_page()?.page_number());
        Ok(())
    }

    #[test]
    fn test_write_requires_allocation() -> Result<()> {
        let file = MemFile::new("unallocated");
        let page = PageData::new(4);
        assert!(matches!(file.write_page(&page), Err(Error::InvalidPage { .. })));
        Ok(())
    }
}
