use marquee_types::Validator;

use crate::query::QueryParams;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

/// Listing parameters, checked but not yet applied to the listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
}

impl Default for Filters {
    fn default() -> Self {
        Filters {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: "id".to_string(),
        }
    }
}

impl Filters {
    pub fn read(query: &QueryParams, v: &mut Validator) -> Self {
        let defaults = Filters::default();
        Filters {
            page: query.read_int("page", defaults.page, v),
            page_size: query.read_int("page_size", defaults.page_size, v),
            sort: query.read_string("sort", &defaults.sort),
        }
    }

    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(
            self.page_size <= MAX_PAGE_SIZE,
            "page_size",
            "must be a maximum of 100",
        );
        v.check(
            SORT_SAFELIST.contains(&self.sort.as_str()),
            "sort",
            "invalid sort value",
        );
    }
}
