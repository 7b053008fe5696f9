use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use badgerdb::buffer::clocksweep::ClockSweepManager;
use badgerdb::buffer::manager::BufferPoolManager;
use badgerdb::storage::disk::DiskManager;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // config
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample-db.bdg".to_string());
    let file = Rc::new(RefCell::new(DiskManager::open(&path)?));
    let mut bufmgr = ClockSweepManager::new(10);

    // ページを二つ作って書き込む
    let (hello_page_no, buffer) = bufmgr.create_page(&file)?;
    buffer.page.borrow_mut()[..5].copy_from_slice(b"hello");
    bufmgr.unpin_page(&file, hello_page_no, true)?;

    let (world_page_no, buffer) = bufmgr.create_page(&file)?;
    buffer.page.borrow_mut()[..5].copy_from_slice(b"world");
    bufmgr.unpin_page(&file, world_page_no, true)?;

    bufmgr.print_self();
    bufmgr.flush_file(&file)?;
    file.borrow_mut().sync()?;

    // 読み戻して表示
    for page_no in [hello_page_no, world_page_no] {
        let buffer = bufmgr.fetch_page(&file, page_no)?;
        let page = buffer.page.borrow();
        println!(
            "{:?}: {}",
            page_no,
            String::from_utf8_lossy(&page[..5])
        );
        drop(page);
        bufmgr.unpin_page(&file, page_no, false)?;
    }

    println!("{:?}", bufmgr.stats());
    Ok(())
}
