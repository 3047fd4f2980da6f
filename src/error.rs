use std::fmt::{Display, Formatter};
use std::num::TryFromIntError;
use std::sync::PoisonError;

use config::ConfigError;

use crate::buffer::frame::FrameId;
use crate::storage::page::SlotNo;
use crate::storage::{FileId, PageNo};

pub type Result<T> = std::result::Result<T, Error>;

// All except Internal are considered user-facing.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    Internal(String),
    /// Every frame in the pool is pinned, nothing can be evicted.
    BufferExceeded,
    /// Unpin was requested for a page that holds no pins.
    PageNotPinned { filename: String, page_no: PageNo, frame_no: FrameId },
    /// A file flush ran into a page that is still pinned.
    PagePinned { filename: String, page_no: PageNo, frame_no: FrameId },
    /// A frame claimed by a file turned out to hold no resident page.
    BadBuffer { frame_no: FrameId, dirty: bool, valid: bool, ref_bit: bool },
    /// The page directory has no entry for the given key.
    HashNotFound { file_id: FileId, page_no: PageNo },
    /// The page directory already has an entry for the given key.
    HashAlreadyPresent { file_id: FileId, page_no: PageNo },
    /// The page is not allocated in the file.
    InvalidPage { page_no: PageNo, filename: String },
    /// The slot does not hold a record.
    InvalidRecord { page_no: PageNo, slot_no: SlotNo },
    /// The record does not fit in the page's free space.
    InsufficientSpace { page_no: PageNo, needed: usize, available: usize },
}

impl Error {
    pub fn internal<E: ToString>(msg: E) -> Error {
        Error::Internal(msg.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Internal(s) => write!(f, "{}", s),
            Error::BufferExceeded => {
                write!(f, "buffer pool exceeded: all frames are pinned")
            }
            Error::PageNotPinned { filename, page_no, frame_no } => {
                write!(f, "page {} of file {} is not pinned (frame {})", page_no, filename, frame_no)
            }
            Error::PagePinned { filename, page_no, frame_no } => {
                write!(f, "page {} of file {} is still pinned (frame {})", page_no, filename, frame_no)
            }
            Error::BadBuffer { frame_no, dirty, valid, ref_bit } => {
                write!(
                    f,
                    "frame {} holds no resident page (valid={}, dirty={}, ref_bit={})",
                    frame_no, valid, dirty, ref_bit
                )
            }
            Error::HashNotFound { file_id, page_no } => {
                write!(f, "page {} of file {} is not in the page directory", page_no, file_id)
            }
            Error::HashAlreadyPresent { file_id, page_no } => {
                write!(f, "page {} of file {} is already in the page directory", page_no, file_id)
            }
            Error::InvalidPage { page_no, filename } => {
                write!(f, "page {} is not allocated in file {}", page_no, filename)
            }
            Error::InvalidRecord { page_no, slot_no } => {
                write!(f, "slot {} of page {} does not hold a record", slot_no, page_no)
            }
            Error::InsufficientSpace { page_no, needed, available } => {
                write!(
                    f,
                    "page {} cannot fit a record of {} bytes ({} available)",
                    page_no, needed, available
                )
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::internal(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::internal(err)
    }
}

impl From<Box<bincode::ErrorKind>> for Error {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        Error::internal(err)
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Self {
        Error::internal(err)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::internal(err)
    }
}

impl From<log::ParseLevelError> for Error {
    fn from(err: log::ParseLevelError) -> Self {
        Error::internal(err)
    }
}

impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self {
        Error::internal(err)
    }
}
