use std::collections::BTreeSet;
use std::io::{self, Read, Result, Write};

use zerocopy::AsBytes;

use crate::buffer::entity::PAGE_SIZE;
use crate::storage::entity::PageId;
use crate::storage::manager::PageFile;

pub struct MemoryManager {
    next_page_id: u64,
    heap: Vec<[u8; PAGE_SIZE]>,
    freed: BTreeSet<u64>,
}

impl MemoryManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            next_page_id: 0,
            heap: vec![],
            freed: BTreeSet::new(),
        })
    }

    fn check_page(&self, page_no: PageId) -> Result<()> {
        if page_no.to_u64() >= self.next_page_id || self.freed.contains(&page_no.to_u64()) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such page: {:?} in {}", page_no, self.filename()),
            ));
        }
        Ok(())
    }
}

impl PageFile for MemoryManager {
    fn allocate_page(&mut self) -> PageId {
        // 削除済みページがあれば再利用する
        if let Some(&page_id) = self.freed.iter().next() {
            self.freed.remove(&page_id);
            self.heap[page_id as usize] = [0; PAGE_SIZE];
            return PageId(page_id);
        }
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        self.heap.push([0; PAGE_SIZE]);
        PageId(page_id)
    }
    fn read_page(&mut self, page_no: PageId, data: &mut [u8]) -> Result<()> {
        self.check_page(page_no)?;
        let mut row: &[u8] = self.heap[page_no.to_u64() as usize].as_bytes();
        row.read_exact(data)?;
        Ok(())
    }
    fn write_page(&mut self, page_no: PageId, data: &[u8]) -> Result<()> {
        self.check_page(page_no)?;
        let mut row: &mut [u8] = self.heap[page_no.to_u64() as usize].as_bytes_mut();
        row.write_all(data)?;
        Ok(())
    }
    fn delete_page(&mut self, page_no: PageId) -> Result<()> {
        self.check_page(page_no)?;
        self.freed.insert(page_no.to_u64());
        self.heap[page_no.to_u64() as usize] = [0; PAGE_SIZE];
        Ok(())
    }
    fn filename(&self) -> String {
        "<memory>".to_string()
    }
}
