use std::ops::Deref;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::storage::{PageNo, INVALID_PAGE_NO, PAGE_SIZE};

/// A slot index within a page.
pub type SlotNo = u16;

/// Header bytes at the front of every page image: page number (u32),
/// slot count (u16) and free-space pointer (u16).
pub const HEADER_SIZE: usize = 8;

/// Bytes per slot array entry: record offset (u16) and length (u16).
/// An offset of zero marks a deleted slot.
pub const SLOT_SIZE: usize = 4;

/// Identifies a record by the page holding it and its slot in that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId {
    pub page_no: PageNo,
    pub slot_no: SlotNo,
}

/// A page image with a slotted record layout: the slot array grows down
/// from the header while record bytes grow up from the end of the page,
/// the two meeting at the free-space pointer.
#[derive(Debug)]
pub struct PageData {
    data: Vec<u8>,
}

impl PageData {
    /// Allocate a zeroed page image carrying the given page number.
    pub fn new(page_no: PageNo) -> PageData {
        let mut page = PageData { data: vec![0; PAGE_SIZE] };
        page.write_u32(0, page_no);
        page.set_free_ptr(PAGE_SIZE as u16);
        page
    }

    pub fn empty() -> PageData {
        PageData::new(INVALID_PAGE_NO)
    }

    /// Wrap a raw image read back from a page file.
    pub fn from_bytes(data: Vec<u8>) -> Result<PageData> {
        if data.len() != PAGE_SIZE {
            return Err(Error::Internal(format!(
                "page image of {} bytes, expected {}",
                data.len(),
                PAGE_SIZE
            )));
        }
        Ok(PageData { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn page_number(&self) -> PageNo {
        self.read_u32(0)
    }

    pub fn slot_count(&self) -> u16 {
        self.read_u16(4)
    }

    /// Bytes still available between the slot array and the record area.
    pub fn free_space(&self) -> usize {
        self.free_ptr() as usize - (HEADER_SIZE + self.slot_count() as usize * SLOT_SIZE)
    }

    /// Store a record in this page, reusing a deleted slot when one
    /// exists. Fails with InsufficientSpace when the record (plus a slot
    /// entry, if a new one is needed) does not fit.
    pub fn insert_record(&mut self, record: &[u8]) -> Result<RecordId> {
        let len = record.len();
        let reused = (0..self.slot_count()).find(|&slot_no| self.slot(slot_no).0 == 0);
        let needed = len + if reused.is_none() { SLOT_SIZE } else { 0 };
        if needed > self.free_space() {
            return Err(Error::InsufficientSpace {
                page_no: self.page_number(),
                needed,
                available: self.free_space(),
            });
        }
        let offset = self.free_ptr() - len as u16;
        self.data[offset as usize..offset as usize + len].copy_from_slice(record);
        self.set_free_ptr(offset);
        let slot_no = match reused {
            Some(slot_no) => slot_no,
            None => {
                let slot_no = self.slot_count();
                self.write_u16(4, slot_no + 1);
                slot_no
            }
        };
        self.set_slot(slot_no, offset, len as u16);
        Ok(RecordId { page_no: self.page_number(), slot_no })
    }

    /// Fetch a record previously stored in this page.
    pub fn get_record(&self, rid: RecordId) -> Result<&[u8]> {
        self.check_record(rid)?;
        let (offset, len) = self.slot(rid.slot_no);
        Ok(&self.data[offset as usize..offset as usize + len as usize])
    }

    /// Drop a record from this page. The record bytes are not compacted;
    /// the slot becomes reusable by a later insert.
    pub fn delete_record(&mut self, rid: RecordId) -> Result<()> {
        self.check_record(rid)?;
        self.set_slot(rid.slot_no, 0, 0);
        Ok(())
    }

    fn check_record(&self, rid: RecordId) -> Result<()> {
        let valid = rid.page_no == self.page_number()
            && rid.slot_no < self.slot_count()
            && self.slot(rid.slot_no).0 != 0;
        if !valid {
            return Err(Error::InvalidRecord { page_no: rid.page_no, slot_no: rid.slot_no });
        }
        Ok(())
    }

    fn free_ptr(&self) -> u16 {
        self.read_u16(6)
    }

    fn set_free_ptr(&mut self, free_ptr: u16) {
        self.write_u16(6, free_ptr)
    }

    fn slot(&self, slot_no: SlotNo) -> (u16, u16) {
        let at = HEADER_SIZE + slot_no as usize * SLOT_SIZE;
        (self.read_u16(at), self.read_u16(at + 2))
    }

    fn set_slot(&mut self, slot_no: SlotNo, offset: u16, len: u16) {
        let at = HEADER_SIZE + slot_no as usize * SLOT_SIZE;
        self.write_u16(at, offset);
        self.write_u16(at + 2, len);
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.data[at], self.data[at + 1]])
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.data[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn read_u32(&self, at: usize) -> u32 {
        u32::from_le_bytes([self.data[at], self.data[at + 1], self.data[at + 2], self.data[at + 3]])
    }

    fn write_u32(&mut self, at: usize, value: u32) {
        self.data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Page acts as the container of the actual page image for handing out
/// shared references from the buffer pool.
#[derive(Debug)]
pub struct Page {
    inner: RwLock<PageData>,
}

impl Page {
    pub fn new(data: PageData) -> Page {
        Page { inner: RwLock::new(data) }
    }
}

impl Deref for Page {
    type Target = RwLock<PageData>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
