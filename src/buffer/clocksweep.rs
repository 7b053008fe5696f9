use std::ops::{Index, IndexMut};
use std::rc::Rc;

use tracing::debug;

use super::entity::{Buffer, BufferId};
use super::manager::{BufferPoolManager, Error};
use super::pagetable::{FileKey, PageTable};
use super::stats::BufStats;
use crate::storage::entity::PageId;
use crate::storage::manager::{FileRef, PageFile};

pub struct Frame<F: PageFile> {
    frame_no: BufferId,
    file: Option<FileRef<F>>,
    page_no: PageId,
    pin_cnt: u64,
    dirty: bool,
    valid: bool,
    refbit: bool,
    buffer: Rc<Buffer>,
}

impl<F: PageFile> Frame<F> {
    fn new(frame_no: BufferId) -> Self {
        Self {
            frame_no,
            file: None,
            page_no: PageId::INVALID_PAGE_ID,
            pin_cnt: 0,
            dirty: false,
            valid: false,
            refbit: false,
            buffer: Rc::new(Buffer::default()),
        }
    }

    // ページをこのフレームに据え付けて一回ピンする
    fn set(&mut self, file: FileRef<F>, page_no: PageId, buffer: Rc<Buffer>) {
        self.file = Some(file);
        self.page_no = page_no;
        self.pin_cnt = 1;
        self.dirty = false;
        self.valid = true;
        self.refbit = false;
        self.buffer = buffer;
    }

    // フレームを未使用状態に戻す。古いバッファはここで切り離される
    fn clear(&mut self) {
        self.file = None;
        self.page_no = PageId::INVALID_PAGE_ID;
        self.pin_cnt = 0;
        self.dirty = false;
        self.valid = false;
        self.refbit = false;
        self.buffer = Rc::new(Buffer::default());
    }

    pub fn print(&self) {
        let filename = match &self.file {
            Some(file) => file.borrow().filename(),
            None => "-".to_string(),
        };
        println!(
            "file:{} page_no:{:?} pin_cnt:{} dirty:{} valid:{} refbit:{}",
            filename, self.page_no, self.pin_cnt, self.dirty, self.valid, self.refbit
        );
    }
}

pub struct BufferPool<F: PageFile> {
    frames: Vec<Frame<F>>,
    clock_hand: BufferId,
}

impl<F: PageFile> Index<BufferId> for BufferPool<F> {
    type Output = Frame<F>;
    fn index(&self, index: BufferId) -> &Self::Output {
        &self.frames[index.0]
    }
}

impl<F: PageFile> IndexMut<BufferId> for BufferPool<F> {
    fn index_mut(&mut self, index: BufferId) -> &mut Self::Output {
        &mut self.frames[index.0]
    }
}

impl<F: PageFile> BufferPool<F> {
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0);
        let frames = (0..pool_size).map(|i| Frame::new(BufferId(i))).collect();
        Self {
            frames,
            clock_hand: BufferId(pool_size - 1),
        }
    }

    fn size(&self) -> usize {
        self.frames.len()
    }

    // 時計の針を一つ進め、針の指すフレーム番号を返す
    fn advance_clock(&mut self) -> BufferId {
        self.clock_hand = BufferId((self.clock_hand.0 + 1) % self.size());
        self.clock_hand
    }
}

pub struct ClockSweepManager<F: PageFile> {
    pool: BufferPool<F>,
    page_table: PageTable,
    stats: BufStats,
}

impl<F: PageFile> ClockSweepManager<F> {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool: BufferPool::new(pool_size),
            page_table: PageTable::new(pool_size),
            stats: BufStats::default(),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn stats(&self) -> BufStats {
        self.stats
    }

    pub fn clear_stats(&mut self) {
        self.stats.clear();
    }

    // Clock-sweep でフレームを一つ確保する。
    // 返ったフレームは必ず未使用状態になっている
    fn alloc_buf(&mut self) -> Result<BufferId, Error> {
        let pool_size = self.pool.size();
        let mut steps = 0;
        while steps < pool_size * 2 {
            let frame_no = self.pool.advance_clock();
            let frame = &mut self.pool[frame_no];
            // 未使用のフレームはそのまま使える
            if !frame.valid {
                return Ok(frame_no);
            }
            // 参照ビットが立っていれば一度だけ見逃す
            if frame.refbit {
                frame.refbit = false;
                steps += 1;
                continue;
            }
            // ピンされているフレームは追い出せない
            if frame.pin_cnt != 0 {
                steps += 1;
                continue;
            }
            // 犠牲フレームが決まった。ダーティなら書き戻してから追い出す
            if let Some(file) = frame.file.clone() {
                if frame.dirty {
                    let page = frame.buffer.page.borrow();
                    file.borrow_mut().write_page(frame.page_no, page.as_ref())?;
                    drop(page);
                    self.stats.diskwrites += 1;
                    self.stats.accesses += 1;
                }
                debug!(
                    frame_no = frame_no.0,
                    page_no = frame.page_no.to_u64(),
                    dirty = frame.dirty,
                    "evicting page"
                );
                self.page_table.remove(FileKey::of(&file), frame.page_no)?;
            }
            self.pool[frame_no].clear();
            return Ok(frame_no);
        }
        Err(Error::BufferExceeded)
    }

    pub fn print_self(&self) {
        let mut valid_frames = 0;
        for frame in self.pool.frames.iter() {
            print!("frame_no:{} ", frame.frame_no.0);
            frame.print();
            if frame.valid {
                valid_frames += 1;
            }
        }
        println!("total number of valid frames:{}", valid_frames);
    }
}

impl<F: PageFile> BufferPoolManager<F> for ClockSweepManager<F> {
    fn fetch_page(&mut self, file: &FileRef<F>, page_no: PageId) -> Result<Rc<Buffer>, Error> {
        // ページテーブルにあればそのフレームをピンして返す
        if let Some(frame_no) = self.page_table.lookup(FileKey::of(file), page_no) {
            let frame = &mut self.pool[frame_no];
            frame.refbit = true;
            frame.pin_cnt += 1;
            self.stats.accesses += 1;
            return Ok(Rc::clone(&frame.buffer));
        }
        // プールにないのでフレームを確保してファイルから読み込む
        let frame_no = self.alloc_buf()?;
        let mut buffer = Buffer::new(page_no);
        file.borrow_mut().read_page(page_no, buffer.page.get_mut())?;
        self.stats.diskreads += 1;
        self.stats.accesses += 1;
        self.page_table.insert(FileKey::of(file), page_no, frame_no)?;
        let frame = &mut self.pool[frame_no];
        frame.set(Rc::clone(file), page_no, Rc::new(buffer));
        Ok(Rc::clone(&frame.buffer))
    }

    fn create_page(&mut self, file: &FileRef<F>) -> Result<(PageId, Rc<Buffer>), Error> {
        // ページを採番してからフレームを確保する
        let page_no = file.borrow_mut().allocate_page();
        let frame_no = self.alloc_buf()?;
        self.page_table.insert(FileKey::of(file), page_no, frame_no)?;
        let frame = &mut self.pool[frame_no];
        frame.set(Rc::clone(file), page_no, Rc::new(Buffer::new(page_no)));
        self.stats.accesses += 1;
        Ok((page_no, Rc::clone(&frame.buffer)))
    }

    fn unpin_page(&mut self, file: &FileRef<F>, page_no: PageId, dirty: bool) -> Result<(), Error> {
        // プールに存在しないページの unpin は黙って無視する
        let frame_no = match self.page_table.lookup(FileKey::of(file), page_no) {
            Some(frame_no) => frame_no,
            None => return Ok(()),
        };
        let frame = &mut self.pool[frame_no];
        if frame.pin_cnt == 0 {
            return Err(Error::PageNotPinned {
                filename: file.borrow().filename(),
                page_no,
                frame_no,
            });
        }
        frame.pin_cnt -= 1;
        // ダーティビットは立てるだけで、ここで落とすことはない
        if dirty {
            frame.dirty = true;
        }
        Ok(())
    }

    fn flush_file(&mut self, file: &FileRef<F>) -> Result<(), Error> {
        let key = FileKey::of(file);
        // フレーム番号の昇順に処理する。途中で失敗したら処理済みの分はそのまま
        for i in 0..self.pool.size() {
            let frame_no = BufferId(i);
            let frame = &mut self.pool[frame_no];
            let same_file = match &frame.file {
                Some(frame_file) => Rc::ptr_eq(frame_file, file),
                None => false,
            };
            if !same_file {
                continue;
            }
            if !frame.valid {
                return Err(Error::BadBuffer {
                    frame_no,
                    dirty: frame.dirty,
                    valid: frame.valid,
                    refbit: frame.refbit,
                });
            }
            if frame.pin_cnt > 0 {
                return Err(Error::PagePinned {
                    filename: file.borrow().filename(),
                    page_no: frame.page_no,
                    frame_no,
                });
            }
            if frame.dirty {
                let page = frame.buffer.page.borrow();
                file.borrow_mut().write_page(frame.page_no, page.as_ref())?;
                drop(page);
                self.stats.diskwrites += 1;
                frame.dirty = false;
                debug!(frame_no = frame_no.0, page_no = frame.page_no.to_u64(), "flushed page");
            }
            self.page_table.remove(key, frame.page_no)?;
            self.pool[frame_no].clear();
        }
        Ok(())
    }

    fn dispose_page(&mut self, file: &FileRef<F>, page_no: PageId) -> Result<(), Error> {
        let key = FileKey::of(file);
        // プールにあればエントリを外す。破棄するページなので書き戻しはしない
        if let Some(frame_no) = self.page_table.lookup(key, page_no) {
            debug!(frame_no = frame_no.0, page_no = page_no.to_u64(), "disposing cached page");
            self.page_table.remove(key, page_no)?;
            self.pool[frame_no].clear();
        }
        // プールに載っていてもいなくてもファイルからは削除する
        file.borrow_mut().delete_page(page_no)?;
        Ok(())
    }
}
