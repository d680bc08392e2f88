//! Search screen: term, filters and page cursor.
//!
//! Any change to the term or a filter brings the cursor back to page 1.

use inventaire_shared::constants::PAGE_SIZE;
use inventaire_shared::search::{filter_articles, total_pages, PageInfo};
use inventaire_shared::Article;

use super::App;
use crate::backend::Backend;

impl<B: Backend> App<B> {
    pub fn set_search_term(&mut self, term: &str) {
        self.state.filters.search_term = term.to_string();
        self.state.page = 1;
    }

    pub fn set_deposit_filter(&mut self, nature: &str) {
        self.state.filters.deposit_nature = nature.trim().to_string();
        self.state.page = 1;
    }

    pub fn set_location_filter(&mut self, location: &str) {
        self.state.filters.location = location.trim().to_string();
        self.state.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.state.filters = Default::default();
        self.state.page = 1;
    }

    /// Catalog entries passing the current term and filters.
    pub fn filtered_articles(&self) -> Vec<&Article> {
        filter_articles(&self.state.articles, &self.state.filters)
    }

    /// Entries of the current page and the cursor position.
    pub fn current_page(&self) -> (Vec<&Article>, PageInfo) {
        let filtered = self.filtered_articles();
        let info = PageInfo::new(self.state.page, filtered.len(), PAGE_SIZE);
        let items = filtered[info.start..info.end].to_vec();
        (items, info)
    }

    fn page_count(&self) -> usize {
        total_pages(self.filtered_articles().len(), PAGE_SIZE)
    }

    /// Returns whether the cursor moved.
    pub fn next_page(&mut self) -> bool {
        if self.state.page < self.page_count() {
            self.state.page += 1;
            return true;
        }
        false
    }

    pub fn previous_page(&mut self) -> bool {
        if self.state.page > 1 {
            self.state.page -= 1;
            return true;
        }
        false
    }

    /// Jump to `page`, clamped to the existing pages.
    pub fn go_to_page(&mut self, page: usize) -> usize {
        self.state.page = page.clamp(1, self.page_count().max(1));
        self.state.page
    }

    /// Keep the cursor on an existing page after the catalog shrank.
    pub(super) fn clamp_page(&mut self) {
        let last = self.page_count().max(1);
        if self.state.page > last {
            self.state.page = last;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::memory::MemoryBackend;
    use crate::commands::testing::{app_with, login, DOMAIN};
    use inventaire_shared::{ArticleDraft, Profile, Status};

    async fn catalog_of(count: usize) -> crate::commands::App<MemoryBackend> {
        let backend = MemoryBackend::new(DOMAIN);
        backend.add_user("7654321C", "Chloé", Profile::Consultant, Status::Actif, "pass", Some("1357"));
        for n in 0..count {
            backend.add_article(&ArticleDraft {
                symbol: format!("{:07}", n + 1),
                designation: format!("Pièce {n}"),
                deposit_nature: Some(if n % 3 == 0 { "SR" } else { "BDL" }.into()),
                location: if n < 30 { "Matelots" } else { "Plaisir" }.into(),
                rack: None,
                level: None,
                slot: None,
                comment: None,
            });
        }
        let mut app = app_with(backend);
        login(&mut app, "7654321C", "pass").await;
        app
    }

    #[tokio::test]
    async fn test_pages_of_twenty() {
        let mut app = catalog_of(45).await;

        let (items, info) = app.current_page();
        assert_eq!(items.len(), 20);
        assert_eq!(info.total_pages, 3);
        assert!(!info.has_previous());

        assert!(app.next_page());
        assert!(app.next_page());
        assert!(!app.next_page());
        let (items, info) = app.current_page();
        assert_eq!(items.len(), 5);
        assert!(!info.has_next());
        assert_eq!(items[0].symbol, "0000041");

        assert!(app.previous_page());
        assert_eq!(app.state().page, 2);
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let mut app = catalog_of(45).await;
        app.go_to_page(3);

        app.set_location_filter("Plaisir");
        assert_eq!(app.state().page, 1);
        assert_eq!(app.filtered_articles().len(), 15);

        app.go_to_page(2);
        assert_eq!(app.state().page, 1);

        app.set_search_term("pièce 4");
        assert_eq!(app.state().page, 1);
    }

    #[tokio::test]
    async fn test_go_to_page_clamps() {
        let mut app = catalog_of(45).await;
        assert_eq!(app.go_to_page(0), 1);
        assert_eq!(app.go_to_page(99), 3);
    }

    #[tokio::test]
    async fn test_empty_result_disables_navigation() {
        let mut app = catalog_of(5).await;
        app.set_search_term("introuvable");
        let (items, info) = app.current_page();
        assert!(items.is_empty());
        assert_eq!(info.total_pages, 0);
        assert!(!app.next_page());
        assert!(!app.previous_page());
    }

    #[tokio::test]
    async fn test_leading_zero_search_through_controller() {
        let mut app = catalog_of(45).await;
        app.set_search_term("12");
        let symbols: Vec<&str> = app
            .filtered_articles()
            .iter()
            .map(|a| a.symbol.as_str())
            .collect();
        assert!(symbols.contains(&"0000012"));
    }
}
