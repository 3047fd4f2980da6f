use crate::buffer::frame::FrameId;
use crate::error::{Error, Result};
use crate::storage::{FileId, PageNo};

struct DirEntry {
    file_id: FileId,
    page_no: PageNo,
    frame_no: FrameId,
}

/// The page directory: a chained hash table from (file, page number) to
/// the frame holding that page. The bucket count is fixed at
/// construction (the smallest prime of at least twice the pool size)
/// and collisions chain within a bucket; the table never resizes.
pub(crate) struct PageDirectory {
    buckets: Vec<Vec<DirEntry>>,
}

impl PageDirectory {
    pub(crate) fn new(num_frames: usize) -> PageDirectory {
        let bucket_count = next_prime(2 * num_frames.max(1));
        let buckets = (0..bucket_count).map(|_| Vec::new()).collect();
        PageDirectory { buckets }
    }

    fn bucket(&self, file_id: FileId, page_no: PageNo) -> usize {
        let hash = file_id.wrapping_mul(31).wrapping_add(page_no as u64);
        (hash % self.buckets.len() as u64) as usize
    }

    /// Look up the frame holding the given page.
    /// Fails with HashNotFound when the page is not resident.
    pub(crate) fn lookup(&self, file_id: FileId, page_no: PageNo) -> Result<FrameId> {
        self.buckets[self.bucket(file_id, page_no)]
            .iter()
            .find(|entry| entry.file_id == file_id && entry.page_no == page_no)
            .map(|entry| entry.frame_no)
            .ok_or(Error::HashNotFound { file_id, page_no })
    }

    /// Record that the given page is resident in frame_no.
    /// Fails with HashAlreadyPresent when the key is already mapped.
    pub(crate) fn insert(&mut self, file_id: FileId, page_no: PageNo, frame_no: FrameId) -> Result<()> {
        if self.lookup(file_id, page_no).is_ok() {
            return Err(Error::HashAlreadyPresent { file_id, page_no });
        }
        let bucket = self.bucket(file_id, page_no);
        self.buckets[bucket].push(DirEntry { file_id, page_no, frame_no });
        Ok(())
    }

    /// Drop the entry for the given page.
    /// Fails with HashNotFound when the page is not mapped.
    pub(crate) fn remove(&mut self, file_id: FileId, page_no: PageNo) -> Result<()> {
        let bucket = self.bucket(file_id, page_no);
        let entries = &mut self.buckets[bucket];
        match entries.iter().position(|entry| entry.file_id == file_id && entry.page_no == page_no) {
            Some(at) => {
                entries.swap_remove(at);
                Ok(())
            }
            None => Err(Error::HashNotFound { file_id, page_no }),
        }
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> impl Iterator<Item = (FileId, PageNo, FrameId)> + '_ {
        self.buckets
            .iter()
            .flatten()
            .map(|entry| (entry.file_id, entry.page_no, entry.frame_no))
    }
}

fn next_prime(n: usize) -> usize {
    let mut candidate = n.max(2);
    loop {
        if is_prime(candidate) {
            return candidate;
        }
        candidate += 1;
    }
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_prime() {
        assert_eq!(2, next_prime(1));
        assert_eq!(2, next_prime(2));
        assert_eq!(7, next_prime(7));
        assert_eq!(11, next_prime(8));
        assert_eq!(127, next_prime(122));
    }

    #[test]
    fn test_insert_lookup_remove() -> Result<()> {
        let mut dir = PageDirectory::new(4);

        dir.insert(1, 10, 0)?;
        dir.insert(1, 11, 1)?;
        dir.insert(2, 10, 2)?;

        assert_eq!(0, dir.lookup(1, 10)?);
        assert_eq!(1, dir.lookup(1, 11)?);
        // same page number under another file is a distinct key
        assert_eq!(2, dir.lookup(2, 10)?);

        dir.remove(1, 10)?;
        assert_eq!(
            Err(Error::HashNotFound { file_id: 1, page_no: 10 }),
            dir.lookup(1, 10)
        );
        assert_eq!(1, dir.lookup(1, 11)?);
        Ok(())
    }

    #[test]
    fn test_duplicate_insert_fails() -> Result<()> {
        let mut dir = PageDirectory::new(4);
        dir.insert(1, 10, 0)?;
        assert_eq!(
            Err(Error::HashAlreadyPresent { file_id: 1, page_no: 10 }),
            dir.insert(1, 10, 5)
        );
        // the existing mapping is untouched
        assert_eq!(0, dir.lookup(1, 10)?);
        Ok(())
    }

    #[test]
    fn test_remove_missing_fails() {
        let mut dir = PageDirectory::new(4);
        assert_eq!(
            Err(Error::HashNotFound { file_id: 9, page_no: 9 }),
            dir.remove(9, 9)
        );
    }

    #[test]
    fn test_chaining_in_tiny_table() -> Result<()> {
        // a one-frame directory has very few buckets, so most of these
        // keys collide and chain
        let mut dir = PageDirectory::new(1);
        for page_no in 0..50 {
            dir.insert(1, page_no, page_no as FrameId)?;
        }
        for page_no in 0..50 {
            assert_eq!(page_no as FrameId, dir.lookup(1, page_no)?);
        }
        for page_no in (0..50).step_by(2) {
            dir.remove(1, page_no)?;
        }
        for page_no in 0..50 {
            let found = dir.lookup(1, page_no);
            if page_no % 2 == 0 {
                assert!(found.is_err());
            } else {
                assert_eq!(page_no as FrameId, found?);
            }
        }
        Ok(())
    }
}
