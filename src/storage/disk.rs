use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{self, prelude::*, SeekFrom};
use std::path::Path;

use crate::buffer::entity::PAGE_SIZE;
use crate::storage::entity::PageId;
use crate::storage::manager::PageFile;

pub struct DiskManager {
    // ヒープファイルのファイルディスクリプタ
    heap_file: File,
    // 採番するページを決めるカウンタ
    next_page_id: u64,
    // 削除済みページの集合。次の採番で再利用する
    // TODO: 削除済み集合をヒープファイル側に永続化する
    freed: BTreeSet<u64>,
    // 診断表示用のファイル名
    name: String,
}

impl DiskManager {
    pub fn new(heap_file: File) -> io::Result<Self> {
        let heap_file_size = heap_file.metadata()?.len();
        let next_page_id = heap_file_size / PAGE_SIZE as u64;
        Ok(Self {
            heap_file,
            next_page_id,
            freed: BTreeSet::new(),
            name: "<unnamed>".to_string(),
        })
    }

    pub fn open(heap_file_path: impl AsRef<Path>) -> io::Result<Self> {
        let heap_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&heap_file_path)?;
        let mut disk = Self::new(heap_file)?;
        disk.name = heap_file_path.as_ref().display().to_string();
        Ok(disk)
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.heap_file.flush()?;
        self.heap_file.sync_all()
    }

    fn check_page(&self, page_no: PageId) -> io::Result<()> {
        if page_no.to_u64() >= self.next_page_id || self.freed.contains(&page_no.to_u64()) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such page: {:?} in {}", page_no, self.name),
            ));
        }
        Ok(())
    }
}

impl PageFile for DiskManager {
    fn allocate_page(&mut self) -> PageId {
        // 削除済みページがあれば再利用する
        if let Some(&page_id) = self.freed.iter().next() {
            self.freed.remove(&page_id);
            return PageId(page_id);
        }
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        PageId(page_id)
    }
    fn read_page(&mut self, page_no: PageId, data: &mut [u8]) -> io::Result<()> {
        self.check_page(page_no)?;
        // オフセットを計算
        let offset = PAGE_SIZE as u64 * page_no.to_u64();
        // ページ先頭へシーク
        self.heap_file.seek(SeekFrom::Start(offset))?;
        // データを読み出す
        self.heap_file.read_exact(data)
    }
    fn write_page(&mut self, page_no: PageId, data: &[u8]) -> io::Result<()> {
        self.check_page(page_no)?;
        // オフセットを計算
        let offset = PAGE_SIZE as u64 * page_no.to_u64();
        // ページ先頭へシーク
        self.heap_file.seek(SeekFrom::Start(offset))?;
        // データを書きこむ
        self.heap_file.write_all(data)
    }
    fn delete_page(&mut self, page_no: PageId) -> io::Result<()> {
        self.check_page(page_no)?;
        self.freed.insert(page_no.to_u64());
        // ファイル上の領域が既にあればゼロで潰しておく
        let offset = PAGE_SIZE as u64 * page_no.to_u64();
        if offset < self.heap_file.metadata()?.len() {
            self.heap_file.seek(SeekFrom::Start(offset))?;
            self.heap_file.write_all(&[0u8; PAGE_SIZE])?;
        }
        Ok(())
    }
    fn filename(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn unit_test() {
        use super::{DiskManager, *};
        use tempfile::NamedTempFile;

        let (data_file, data_file_path) = NamedTempFile::new().unwrap().into_parts();
        let mut disk = DiskManager::new(data_file).unwrap();
        let mut hello = Vec::with_capacity(PAGE_SIZE);
        hello.extend_from_slice(b"hello");
        hello.resize(PAGE_SIZE, 0);
        let hello_page_id = disk.allocate_page();
        disk.write_page(hello_page_id, &hello).unwrap();
        let mut world = Vec::with_capacity(PAGE_SIZE);
        world.extend_from_slice(b"world");
        world.resize(PAGE_SIZE, 0);
        let world_page_id = disk.allocate_page();
        disk.write_page(world_page_id, &world).unwrap();
        drop(disk);
        let mut disk2 = DiskManager::open(&data_file_path).unwrap();
        let mut buf = vec![0; PAGE_SIZE];
        disk2.read_page(hello_page_id, &mut buf).unwrap();
        assert_eq!(hello, buf);
        disk2.read_page(world_page_id, &mut buf).unwrap();
        assert_eq!(world, buf);
    }

    #[test]
    fn delete_page_test() {
        use super::{DiskManager, *};
        use tempfile::tempfile;

        let mut disk = DiskManager::new(tempfile().unwrap()).unwrap();
        let mut page = Vec::with_capacity(PAGE_SIZE);
        page.extend_from_slice(b"doomed");
        page.resize(PAGE_SIZE, 0);
        let page_id = disk.allocate_page();
        let survivor_id = disk.allocate_page();
        disk.write_page(page_id, &page).unwrap();
        disk.write_page(survivor_id, &page).unwrap();

        disk.delete_page(page_id).unwrap();
        let mut buf = vec![0; PAGE_SIZE];
        assert!(disk.read_page(page_id, &mut buf).is_err());
        assert!(disk.delete_page(page_id).is_err());
        // 生き残りのページは読める
        disk.read_page(survivor_id, &mut buf).unwrap();
        assert_eq!(page, buf);

        // 削除済みのページIDは次の採番で再利用される
        let reused_id = disk.allocate_page();
        assert_eq!(page_id, reused_id);
    }

    #[test]
    fn integration_test() {
        use super::{DiskManager, *};
        use crate::buffer::clocksweep::ClockSweepManager;
        use crate::buffer::manager::BufferPoolManager;
        use std::cell::RefCell;
        use std::rc::Rc;
        use tempfile::tempfile;

        let mut hello = Vec::with_capacity(PAGE_SIZE);
        hello.extend_from_slice(b"hello");
        hello.resize(PAGE_SIZE, 0);
        let mut world = Vec::with_capacity(PAGE_SIZE);
        world.extend_from_slice(b"world");
        world.resize(PAGE_SIZE, 0);

        let file = Rc::new(RefCell::new(DiskManager::new(tempfile().unwrap()).unwrap()));
        let mut bufmgr = ClockSweepManager::new(1);
        let page1_id = {
            let (page_id, buffer) = bufmgr.create_page(&file).unwrap();
            assert!(bufmgr.create_page(&file).is_err());
            buffer.page.borrow_mut().copy_from_slice(&hello);
            bufmgr.unpin_page(&file, page_id, true).unwrap();
            page_id
        };
        {
            let buffer = bufmgr.fetch_page(&file, page1_id).unwrap();
            let page = buffer.page.borrow();
            assert_eq!(&hello, page.as_ref());
            bufmgr.unpin_page(&file, page1_id, false).unwrap();
        }
        let page2_id = {
            let (page_id, buffer) = bufmgr.create_page(&file).unwrap();
            buffer.page.borrow_mut().copy_from_slice(&world);
            bufmgr.unpin_page(&file, page_id, true).unwrap();
            page_id
        };
        {
            let buffer = bufmgr.fetch_page(&file, page1_id).unwrap();
            let page = buffer.page.borrow();
            assert_eq!(&hello, page.as_ref());
            drop(page);
            bufmgr.unpin_page(&file, page1_id, false).unwrap();
        }
        {
            let buffer = bufmgr.fetch_page(&file, page2_id).unwrap();
            let page = buffer.page.borrow();
            assert_eq!(&world, page.as_ref());
            drop(page);
            bufmgr.unpin_page(&file, page2_id, false).unwrap();
        }
    }
}
