use serde::{Deserialize, Serialize};

/// ページ番号ベースの取得要求（offset/limit に変換して使う）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: u32,
    pub page_size: usize,
}

impl PageRequest {
    pub fn offset(&self) -> usize {
        self.page_index as usize * self.page_size
    }

    pub fn limit(&self) -> usize {
        self.page_size
    }
}

/// コメント一覧の「続きがあるか」カーソル。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageCursor {
    next_page: u32,
    page_size: usize,
    total_count: Option<u64>,
    has_more: bool,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            next_page: 0,
            page_size: page_size.max(1),
            total_count: None,
            has_more: true,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.page_size);
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// 次に取得すべきページ。これ以上ない場合は `None`
    pub fn next_request(&self) -> Option<PageRequest> {
        if !self.has_more {
            return None;
        }
        Some(PageRequest {
            page_index: self.next_page,
            page_size: self.page_size,
        })
    }

    /// 取得済みページの件数と総件数（わかれば）でカーソルを進める。
    ///
    /// 端数ページは常に終端として扱う。満杯のページでは総件数が
    /// あればそれを優先し、なければ続きがあるものと推定する。
    pub fn advance(&mut self, fetched: usize, total_count: Option<u64>) {
        self.next_page += 1;
        if total_count.is_some() {
            self.total_count = total_count;
        }

        self.has_more = if fetched < self.page_size {
            false
        } else if let Some(total) = self.total_count {
            (self.next_page as u64) * (self.page_size as u64) < total
        } else {
            true
        };
    }
}
