use askama_actix::Template;

/// Fixed page size for every post listing.
pub const POSTS_PER_PAGE: usize = 10;

const PAGINATOR_LOOK_AHEAD: i32 = 2;

/// [1] 2 3 ... 13
/// 1 2 [3] 4 5 ... 13
/// 1 ... 4 5 [6] 7 8 ... 13
/// 1 ... 9 10 [11] 12 13
/// 1 ... 11 12 [13]
#[derive(Debug)]
pub struct Paginator {
    pub base_url: String,
    pub this_page: i32,
    pub page_count: i32,
}

/// One rendered element of the page strip.
#[derive(Debug, PartialEq)]
pub struct PageLink {
    pub number: i32,
    pub is_current: bool,
    pub is_gap: bool,
}

impl PageLink {
    fn page(number: i32, this_page: i32) -> Self {
        Self {
            number,
            is_current: number == this_page,
            is_gap: false,
        }
    }

    fn gap() -> Self {
        Self {
            number: 0,
            is_current: false,
            is_gap: true,
        }
    }
}

#[derive(Template)]
#[template(path = "util/paginator.html")]
struct PaginatorTemplate<'a> {
    paginator: &'a Paginator,
}

impl Paginator {
    pub fn new(base_url: &str, this_page: usize, page_count: usize) -> Self {
        Self {
            base_url: base_url.to_owned(),
            this_page: this_page as i32,
            page_count: page_count as i32,
        }
    }

    fn near_start(&self) -> bool {
        self.this_page - PAGINATOR_LOOK_AHEAD <= 1 + PAGINATOR_LOOK_AHEAD
    }

    fn near_end(&self) -> bool {
        self.this_page + PAGINATOR_LOOK_AHEAD >= self.page_count - PAGINATOR_LOOK_AHEAD
    }

    pub fn has_pages(&self) -> bool {
        self.page_count > 1
    }

    pub fn get_first_pages(&self) -> Vec<i32> {
        if self.near_start() && self.near_end() {
            // Both windows meet, every page fits in one block.
            (1..=self.page_count).collect()
        } else if self.near_start() {
            // The cursor's window merges into the leading block.
            (1..=(self.this_page + PAGINATOR_LOOK_AHEAD)).collect()
        } else {
            vec![1]
        }
    }

    pub fn get_inner_pages(&self) -> Option<Vec<i32>> {
        if self.near_start() || self.near_end() {
            None
        } else {
            Some(
                ((self.this_page - PAGINATOR_LOOK_AHEAD)..=(self.this_page + PAGINATOR_LOOK_AHEAD))
                    .collect(),
            )
        }
    }

    pub fn get_last_pages(&self) -> Option<Vec<i32>> {
        if self.near_start() && self.near_end() {
            None
        } else if self.near_end() {
            // The cursor's window merges into the trailing block.
            Some(((self.this_page - PAGINATOR_LOOK_AHEAD)..=self.page_count).collect())
        } else {
            Some(vec![self.page_count])
        }
    }

    /// The full strip: page blocks separated by gap markers.
    pub fn page_links(&self) -> Vec<PageLink> {
        let mut links: Vec<PageLink> = self
            .get_first_pages()
            .into_iter()
            .map(|n| PageLink::page(n, self.this_page))
            .collect();
        if let Some(pages) = self.get_inner_pages() {
            links.push(PageLink::gap());
            links.extend(pages.into_iter().map(|n| PageLink::page(n, self.this_page)));
        }
        if let Some(pages) = self.get_last_pages() {
            links.push(PageLink::gap());
            links.extend(pages.into_iter().map(|n| PageLink::page(n, self.this_page)));
        }
        links
    }

    pub fn as_html(&self) -> String {
        if self.has_pages() {
            let mut buffer = String::new();
            let template = PaginatorTemplate { paginator: self };
            if template.render_into(&mut buffer).is_err() {
                "[Paginator Util Error]".to_owned()
            } else {
                buffer
            }
        } else {
            "".to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(this_page: i32, page_count: i32) -> (Vec<i32>, Option<Vec<i32>>, Option<Vec<i32>>) {
        let p = Paginator {
            base_url: "/".to_owned(),
            this_page,
            page_count,
        };
        (p.get_first_pages(), p.get_inner_pages(), p.get_last_pages())
    }

    #[test]
    fn first_page_of_thirteen() {
        // [1] 2 3 ... 13
        assert_eq!(windows(1, 13), (vec![1, 2, 3], None, Some(vec![13])));
    }

    #[test]
    fn third_page_of_thirteen() {
        // 1 2 [3] 4 5 ... 13
        assert_eq!(windows(3, 13), (vec![1, 2, 3, 4, 5], None, Some(vec![13])));
    }

    #[test]
    fn middle_page_of_thirteen() {
        // 1 ... 4 5 [6] 7 8 ... 13
        assert_eq!(
            windows(6, 13),
            (vec![1], Some(vec![4, 5, 6, 7, 8]), Some(vec![13]))
        );
    }

    #[test]
    fn near_last_page_of_thirteen() {
        // 1 ... 9 10 [11] 12 13
        assert_eq!(
            windows(11, 13),
            (vec![1], None, Some(vec![9, 10, 11, 12, 13]))
        );
    }

    #[test]
    fn last_page_of_thirteen() {
        // 1 ... 11 12 [13]
        assert_eq!(windows(13, 13), (vec![1], None, Some(vec![11, 12, 13])));
    }

    #[test]
    fn small_listing_is_one_block() {
        assert_eq!(windows(3, 5), (vec![1, 2, 3, 4, 5], None, None));
    }

    #[test]
    fn page_links_mark_cursor_and_gaps() {
        let p = Paginator {
            base_url: "/".to_owned(),
            this_page: 6,
            page_count: 13,
        };
        let links = p.page_links();
        // 1 ... 4 5 [6] 7 8 ... 13
        assert_eq!(links.len(), 9);
        assert!(links[1].is_gap);
        assert!(links[7].is_gap);
        assert!(links[4].is_current);
        assert_eq!(links[4].number, 6);
        assert_eq!(links[8].number, 13);
    }

    #[test]
    fn single_page_has_no_links() {
        let p = Paginator {
            base_url: "/".to_owned(),
            this_page: 1,
            page_count: 1,
        };
        assert!(!p.has_pages());
        assert_eq!(p.as_html(), "");
    }
}
