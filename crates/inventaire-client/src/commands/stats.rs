use inventaire_shared::stats::{self, Statistics};
use inventaire_shared::UserRecord;

use super::App;
use crate::backend::Backend;

impl<B: Backend> App<B> {
    /// Counters over the loaded catalog. User counters stay at zero unless
    /// the directory is visible to the current user.
    pub fn statistics(&self) -> Statistics {
        let admin = self.current_user().is_some_and(|u| u.is_admin());
        let users: &[UserRecord] = if admin { &self.state.users } else { &[] };
        stats::aggregate(&self.state.articles, users)
    }

    /// Choices offered by the location filter and the article form.
    pub fn locations(&self) -> Vec<String> {
        stats::locations(&self.state.articles)
    }

    pub fn deposit_natures(&self) -> Vec<String> {
        stats::deposit_natures(&self.state.articles)
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::{fixture, login};

    #[tokio::test]
    async fn test_statistics_by_profile() {
        let mut f = fixture();
        login(&mut f.app, "7408443F", "admin-pass").await;
        let stats = f.app.statistics();
        assert_eq!(stats.total_articles, 3);
        assert_eq!(stats.total_users, 5);
        assert_eq!(stats.blocked_users, 1);
        assert_eq!(stats.users_with_pin, 4);

        let mut f = fixture();
        login(&mut f.app, "7654321C", "viewer-pass").await;
        let stats = f.app.statistics();
        assert_eq!(stats.total_articles, 3);
        assert_eq!(stats.total_users, 0);
    }

    #[tokio::test]
    async fn test_filter_choices_follow_catalog() {
        let mut f = fixture();
        assert_eq!(f.app.locations(), vec!["Porte de Buc", "Matelots", "Plaisir"]);

        login(&mut f.app, "7654321C", "viewer-pass").await;
        assert_eq!(f.app.locations(), vec!["Matelots", "Plaisir", "Porte de Buc"]);
        assert_eq!(f.app.deposit_natures(), vec!["BDL", "SR"]);
    }
}
