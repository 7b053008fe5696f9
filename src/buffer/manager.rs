use std::io;
use std::rc::Rc;

use super::entity::{Buffer, BufferId};
use super::pagetable;
use crate::storage::entity::PageId;
use crate::storage::manager::{FileRef, PageFile};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    PageTable(#[from] pagetable::Error),
    #[error("all buffers in the pool are pinned")]
    BufferExceeded,
    #[error("page {page_no:?} of file {filename} is not pinned (frame {frame_no:?})")]
    PageNotPinned {
        filename: String,
        page_no: PageId,
        frame_no: BufferId,
    },
    #[error("page {page_no:?} of file {filename} is still pinned (frame {frame_no:?})")]
    PagePinned {
        filename: String,
        page_no: PageId,
        frame_no: BufferId,
    },
    #[error("frame {frame_no:?} is in a bad state (dirty={dirty}, valid={valid}, refbit={refbit})")]
    BadBuffer {
        frame_no: BufferId,
        dirty: bool,
        valid: bool,
        refbit: bool,
    },
}

pub trait BufferPoolManager<F: PageFile> {
    // ページを取得してピンする
    fn fetch_page(&mut self, file: &FileRef<F>, page_no: PageId) -> Result<Rc<Buffer>, Error>;
    // 新たにページを生成してピンする
    fn create_page(&mut self, file: &FileRef<F>) -> Result<(PageId, Rc<Buffer>), Error>;
    // ピンを一つ外す
    fn unpin_page(&mut self, file: &FileRef<F>, page_no: PageId, dirty: bool) -> Result<(), Error>;
    // ファイルに属するページをすべて書き戻して追い出す
    fn flush_file(&mut self, file: &FileRef<F>) -> Result<(), Error>;
    // ページをプールとファイルの両方から破棄する
    fn dispose_page(&mut self, file: &FileRef<F>, page_no: PageId) -> Result<(), Error>;
}
