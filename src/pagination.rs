//! Splits line items into fixed-height printed pages.

/// One table row on a printed page.
#[derive(Debug, PartialEq)]
pub enum PageRow<'a, T> {
    /// `number` is the 1-based position in the whole document.
    Item { number: usize, item: &'a T },
    Blank,
}

impl<T> Clone for PageRow<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PageRow<'_, T> {}

impl<T> PageRow<'_, T> {
    pub fn is_blank(&self) -> bool {
        matches!(self, PageRow::Blank)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    /// 1-based.
    pub number: usize,
    pub rows: Vec<PageRow<'a, T>>,
    /// Totals and signatures are printed only here.
    pub is_last: bool,
}

impl<T> Page<'_, T> {
    pub fn item_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_blank()).count()
    }
}

/// Chunks `items` into pages of exactly `capacity` rows, padding the last one
/// with blanks. Always returns at least one page. A zero capacity is treated as one.
pub fn paginate<T>(items: &[T], capacity: usize) -> Vec<Page<'_, T>> {
    let capacity = capacity.max(1);

    if items.is_empty() {
        return vec![Page {
            number: 1,
            rows: vec![PageRow::Blank; capacity],
            is_last: true,
        }];
    }

    let total_pages = items.len().div_ceil(capacity);
    items
        .chunks(capacity)
        .enumerate()
        .map(|(page_idx, chunk)| {
            let mut rows: Vec<PageRow<'_, T>> = chunk
                .iter()
                .enumerate()
                .map(|(i, item)| PageRow::Item {
                    number: page_idx * capacity + i + 1,
                    item,
                })
                .collect();
            rows.resize(capacity, PageRow::Blank);
            Page {
                number: page_idx + 1,
                rows,
                is_last: page_idx + 1 == total_pages,
            }
        })
        .collect()
}
