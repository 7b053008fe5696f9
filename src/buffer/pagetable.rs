use std::rc::Rc;

use thiserror::Error;

use super::entity::BufferId;
use crate::storage::entity::PageId;
use crate::storage::manager::FileRef;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("page {page_no:?} of file {file:?} is already in the page table")]
    AlreadyPresent { file: FileKey, page_no: PageId },
    #[error("page {page_no:?} of file {file:?} is not in the page table")]
    NotFound { file: FileKey, page_no: PageId },
}

// ファイルの同一性はハンドルのアドレスで表す
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FileKey(usize);

impl FileKey {
    pub fn of<F>(file: &FileRef<F>) -> Self {
        Self(Rc::as_ptr(file) as *const () as usize)
    }
}

struct Entry {
    file: FileKey,
    page_no: PageId,
    frame_no: BufferId,
}

// (ファイル, ページID) からフレーム番号を引くチェイン法のハッシュ表
pub struct PageTable {
    buckets: Vec<Vec<Entry>>,
}

impl PageTable {
    // バケット数はプールサイズの約 1.2 倍を奇数に丸めたもの
    pub fn new(pool_size: usize) -> Self {
        let num_buckets = (pool_size * 6 / 5) | 1;
        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, Vec::new);
        Self { buckets }
    }

    fn bucket_of(&self, file: FileKey, page_no: PageId) -> usize {
        file.0.wrapping_add(page_no.to_u64() as usize) % self.buckets.len()
    }

    pub fn insert(
        &mut self,
        file: FileKey,
        page_no: PageId,
        frame_no: BufferId,
    ) -> Result<(), Error> {
        let index = self.bucket_of(file, page_no);
        let bucket = &mut self.buckets[index];
        if bucket
            .iter()
            .any(|entry| entry.file == file && entry.page_no == page_no)
        {
            return Err(Error::AlreadyPresent { file, page_no });
        }
        bucket.push(Entry {
            file,
            page_no,
            frame_no,
        });
        Ok(())
    }

    pub fn lookup(&self, file: FileKey, page_no: PageId) -> Option<BufferId> {
        let index = self.bucket_of(file, page_no);
        self.buckets[index]
            .iter()
            .find(|entry| entry.file == file && entry.page_no == page_no)
            .map(|entry| entry.frame_no)
    }

    pub fn remove(&mut self, file: FileKey, page_no: PageId) -> Result<(), Error> {
        let index = self.bucket_of(file, page_no);
        let bucket = &mut self.buckets[index];
        let pos = bucket
            .iter()
            .position(|entry| entry.file == file && entry.page_no == page_no)
            .ok_or(Error::NotFound { file, page_no })?;
        bucket.swap_remove(pos);
        Ok(())
    }
}
