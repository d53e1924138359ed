//! Paginated listings.
//!
//! A record whose model enables pagination is split into
//! `ceil(children / per_page)` pages (at least one). Page 1 lives at the
//! record URL, page `n` at `<url>page/<n>/`.

use std::sync::Arc;

use crate::config::ProjectConfig;
use crate::content::{Pad, Page, Record};
use crate::core::url_join;

/// Page size if the record's model paginates.
pub fn per_page(record: &Record, config: &ProjectConfig) -> Option<usize> {
    config
        .model(&record.model)
        .filter(|m| m.pagination.enabled)
        .map(|m| m.pagination.per_page.max(1))
}

pub fn page_count(items: usize, per_page: usize) -> usize {
    items.div_ceil(per_page.max(1)).max(1)
}

pub fn page_url(base: &str, number: usize) -> String {
    if number <= 1 {
        base.to_string()
    } else {
        url_join(base, &format!("page/{number}"))
    }
}

/// Page `number` of `record`, `None` when out of range or not paginated.
pub fn page(pad: &Pad, record: &Arc<Record>, number: usize) -> Option<Page> {
    let size = per_page(record, pad.config())?;
    let children = pad.children_of(&record.path, &record.alt);
    let total = page_count(children.len(), size);
    if number == 0 || number > total {
        return None;
    }

    let slice = children
        .into_iter()
        .skip((number - 1) * size)
        .take(size)
        .collect();
    Some(Page {
        record: Arc::clone(record),
        number,
        total,
        url: page_url(&record.url, number),
        children: slice,
    })
}

/// All pages of `record`; empty when not paginated.
pub fn pages(pad: &Pad, record: &Arc<Record>) -> Vec<Page> {
    let Some(size) = per_page(record, pad.config()) else {
        return Vec::new();
    };
    let children = pad.children_of(&record.path, &record.alt);
    let total = page_count(children.len(), size);

    children
        .chunks(size)
        .map(<[Arc<Record>]>::to_vec)
        .chain(std::iter::once(Vec::new()))
        .take(total)
        .enumerate()
        .map(|(index, slice)| Page {
            record: Arc::clone(record),
            number: index + 1,
            total,
            url: page_url(&record.url, index + 1),
            children: slice,
        })
        .collect()
}
