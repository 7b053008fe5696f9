use std::cell::RefCell;
use std::io::Result;
use std::rc::Rc;

use super::entity::PageId;

// ファイルの同一性はハンドル (Rc) の同一性で判定する
pub type FileRef<F> = Rc<RefCell<F>>;

pub trait PageFile {
    // 新しいページIDを採番する
    fn allocate_page(&mut self) -> PageId;
    // ページのデータを読み出す
    fn read_page(&mut self, page_no: PageId, data: &mut [u8]) -> Result<()>;
    // データをページに書き出す
    fn write_page(&mut self, page_no: PageId, data: &[u8]) -> Result<()>;
    // ページをファイルから削除する
    fn delete_page(&mut self, page_no: PageId) -> Result<()>;
    // 診断表示用のファイル名
    fn filename(&self) -> String;
}
