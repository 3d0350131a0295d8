//! List responses.
//!
//! List endpoints answer either with a bare JSON array or with a paginated
//! envelope `{data: [...], pagination: {...}}`. Both decode into [`Page`].

use serde::Deserialize;

/// Pagination block of an enveloped list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageRepr<T> {
    Wrapped {
        data: Vec<T>,
        #[serde(default)]
        pagination: Option<Pagination>,
    },
    Bare(Vec<T>),
}

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "PageRepr<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Absent when the backend returned a bare array.
    pub pagination: Option<Pagination>,
}

impl<T> From<PageRepr<T>> for Page<T> {
    fn from(repr: PageRepr<T>) -> Self {
        match repr {
            PageRepr::Wrapped { data, pagination } => Self {
                items: data,
                pagination,
            },
            PageRepr::Bare(items) => Self {
                items,
                pagination: None,
            },
        }
    }
}

impl<T> Page<T> {
    /// Returns true if the backend reported more pages.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.pagination.is_some_and(|p| p.has_next)
    }
}
