use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::storage::page::PageData;
use crate::storage::{next_file_id, FileId, PageFile, PageNo, PAGE_SIZE};

/// File metadata persisted in block 0: the next page number to hand out
/// and the numbers freed by delete_page, eligible for reuse.
#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    next_page_no: PageNo,
    free: Vec<PageNo>,
}

impl FileHeader {
    fn is_allocated(&self, page_no: PageNo) -> bool {
        page_no != 0 && page_no < self.next_page_no && !self.free.contains(&page_no)
    }
}

/// A file-backed page store. Data page n lives at byte offset
/// n * PAGE_SIZE; block 0 holds the bincode-encoded header behind a
/// length prefix. Reads and writes use positioned I/O on a shared
/// handle.
#[derive(Debug)]
pub struct DiskFile {
    id: FileId,
    filename: String,
    file: File,
    header: Mutex<FileHeader>,
}

impl DiskFile {
    /// Opens the file at the given path, creating it if absent. A fresh
    /// file gets an empty header written immediately.
    pub fn open(path: impl AsRef<Path>) -> Result<DiskFile> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let header = if file.metadata()?.len() == 0 {
            let header = FileHeader { next_page_no: 1, free: Vec::new() };
            write_header(&file, &header)?;
            header
        } else {
            read_header(&file)?
        };
        Ok(DiskFile {
            id: next_file_id(),
            filename: path.to_string_lossy().into_owned(),
            file,
            header: Mutex::new(header),
        })
    }

    fn check_allocated(&self, header: &FileHeader, page_no: PageNo) -> Result<()> {
        if !header.is_allocated(page_no) {
            return Err(Error::InvalidPage { page_no, filename: self.filename.clone() });
        }
        Ok(())
    }
}

fn page_offset(page_no: PageNo) -> u64 {
    page_no as u64 * PAGE_SIZE as u64
}

fn write_header(file: &File, header: &FileHeader) -> Result<()> {
    let encoded = bincode::serialize(header)?;
    if encoded.len() + 4 > PAGE_SIZE {
        return Err(Error::Internal(format!(
            "file header of {} bytes exceeds a page",
            encoded.len()
        )));
    }
    let mut block = vec![0u8; PAGE_SIZE];
    block[0..4].copy_from_slice(&(encoded.len() as u32).to_le_bytes());
    block[4..4 + encoded.len()].copy_from_slice(&encoded);
    file.write_all_at(&block, 0)?;
    Ok(())
}

fn read_header(file: &File) -> Result<FileHeader> {
    let mut block = vec![0u8; PAGE_SIZE];
    file.read_exact_at(&mut block, 0)?;
    let len = u32::from_le_bytes([block[0], block[1], block[2], block[3]]) as usize;
    if len + 4 > PAGE_SIZE {
        return Err(Error::Internal("corrupt file header".to_string()));
    }
    Ok(bincode::deserialize(&block[4..4 + len])?)
}

impl PageFile for DiskFile {
    fn id(&self) -> FileId {
        self.id
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn read_page(&self, page_no: PageNo) -> Result<PageData> {
        let header = self.header.lock()?;
        self.check_allocated(&header, page_no)?;
        drop(header);
        let mut buf = vec![0u8; PAGE_SIZE];
        self.file.read_exact_at(&mut buf, page_offset(page_no))?;
        PageData::from_bytes(buf)
    }

    fn write_page(&self, page: &PageData) -> Result<()> {
        let page_no = page.page_number();
        let header = self.header.lock()?;
        self.check_allocated(&header, page_no)?;
        drop(header);
        self.file.write_all_at(page.as_bytes(), page_offset(page_no))?;
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageData> {
        let mut header = self.header.lock()?;
        let page_no = match header.free.pop() {
            Some(page_no) => page_no,
            None => {
                let page_no = header.next_page_no;
                header.next_page_no += 1;
                page_no
            }
        };
        let page = PageData::new(page_no);
        // write the fresh image up front so the file extent always covers
        // every allocated page
        self.file.write_all_at(page.as_bytes(), page_offset(page_no))?;
        write_header(&self.file, &header)?;
        Ok(page)
    }

    fn delete_page(&self, page_no: PageNo) -> Result<()> {
        let mut header = self.header.lock()?;
        self.check_allocated(&header, page_no)?;
        header.free.push(page_no);
        write_header(&self.file, &header)
    }
}
