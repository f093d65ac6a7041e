use crate::error::{AppError, AppResult};

/// Validated 1-indexed page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_size: usize,
    pub page_num: usize,
}

impl Pagination {
    /// Rejects non-positive sizes or page numbers
    pub fn new(page_size: i64, page_num: i64) -> AppResult<Self> {
        if page_size <= 0 || page_num <= 0 {
            return Err(AppError::InvalidInput(format!(
                "page_size and page_num must be positive (got {}, {})",
                page_size, page_num
            )));
        }

        Ok(Self {
            page_size: page_size as usize,
            page_num: page_num as usize,
        })
    }

    pub fn offset(&self) -> usize {
        (self.page_num - 1).saturating_mul(self.page_size)
    }

    /// Cuts the requested page out of a fully ordered list
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.page_size)
            .collect()
    }
}
