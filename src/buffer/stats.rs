// アクセス統計。マネージャだけが更新する
#[derive(Debug, Default, Clone, Copy)]
pub struct BufStats {
    // バッファプールへのアクセス回数
    pub accesses: u64,
    // ディスクからの読み出し回数
    pub diskreads: u64,
    // ディスクへの書き込み回数
    pub diskwrites: u64,
}

impl BufStats {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
