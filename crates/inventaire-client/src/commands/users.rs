//! User directory: staged role changes, committed one row at a time.

use inventaire_shared::Profile;
use tracing::{error, info};
use uuid::Uuid;

use super::App;
use crate::backend::Backend;
use crate::error::ClientError;

impl<B: Backend> App<B> {
    /// Stage a new role for the row `numero_cp`. Nothing is sent yet.
    pub fn stage_profile(&mut self, numero_cp: &str, profile: Profile) -> Result<(), ClientError> {
        let user = self.require_admin()?;
        let Some(row) = self.state.user_by_cp(numero_cp) else {
            return Err(ClientError::UserNotFound);
        };
        if !user.can_edit_role(row) {
            return Err(ClientError::SelfRoleEdit);
        }
        self.state
            .pending_profiles
            .insert(numero_cp.to_string(), profile);
        Ok(())
    }

    pub fn pending_profile(&self, numero_cp: &str) -> Option<Profile> {
        self.state.pending_profiles.get(numero_cp).copied()
    }

    pub fn discard_profile(&mut self, numero_cp: &str) {
        self.state.pending_profiles.remove(numero_cp);
    }

    /// Send the staged role of `numero_cp` for the user `user_id`.
    pub async fn commit_profile(&mut self, numero_cp: &str, user_id: Uuid) -> Result<(), ClientError> {
        let user = self.require_admin()?;
        if user_id == user.id {
            return Err(self.fail(ClientError::SelfRoleEdit));
        }
        let Some(profile) = self.pending_profile(numero_cp) else {
            return Err(ClientError::NoPendingChange);
        };

        self.begin();
        let result = self.backend.update_profile(user_id, profile).await;
        self.end();

        if let Err(e) = result {
            error!(numero_cp, error = %e, "Profile update failed");
            self.notifier.error(format!("Erreur: {}", e.friendly()));
            return Err(e.into());
        }

        if let Some(row) = self.state.users.iter_mut().find(|u| u.id == user_id) {
            row.profile = profile;
        }
        self.state.pending_profiles.remove(numero_cp);
        info!(numero_cp, %profile, by = %user.numero_cp, "Profile updated");
        self.notifier
            .success("Profil de l'utilisateur mis à jour avec succès !");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::Operation;
    use crate::commands::testing::{fixture, login};

    #[tokio::test]
    async fn test_stage_and_commit() {
        let mut f = fixture();
        login(&mut f.app, "7408443F", "admin-pass").await;

        f.app.stage_profile("7654321C", Profile::Gestionnaire).unwrap();
        assert_eq!(f.app.pending_profile("7654321C"), Some(Profile::Gestionnaire));
        assert!(!f.backend.called(Operation::UpdateProfile));

        f.app.commit_profile("7654321C", f.viewer).await.unwrap();
        assert_eq!(f.app.pending_profile("7654321C"), None);
        assert_eq!(f.app.state().user_by_cp("7654321C").unwrap().profile, Profile::Gestionnaire);
        assert_eq!(f.backend.user(f.viewer).unwrap().record.profile, Profile::Gestionnaire);
        assert_eq!(
            f.app.notifier().last().unwrap().message,
            "Profil de l'utilisateur mis à jour avec succès !"
        );
    }

    #[tokio::test]
    async fn test_own_row_is_never_editable() {
        let mut f = fixture();
        login(&mut f.app, "7408443F", "admin-pass").await;

        assert!(matches!(
            f.app.stage_profile("7408443F", Profile::Consultant),
            Err(ClientError::SelfRoleEdit)
        ));
        assert!(matches!(
            f.app.commit_profile("7408443F", f.admin).await,
            Err(ClientError::SelfRoleEdit)
        ));
        assert!(!f.backend.called(Operation::UpdateProfile));
    }

    #[tokio::test]
    async fn test_commit_without_staged_change_is_silent() {
        let mut f = fixture();
        login(&mut f.app, "7408443F", "admin-pass").await;
        let before = f.app.notifier().sequence();

        assert!(matches!(
            f.app.commit_profile("7654321C", f.viewer).await,
            Err(ClientError::NoPendingChange)
        ));
        assert_eq!(f.app.notifier().sequence(), before);
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_staged_value() {
        let mut f = fixture();
        login(&mut f.app, "7408443F", "admin-pass").await;
        f.backend.fail(Operation::UpdateProfile);

        f.app.stage_profile("1234567G", Profile::Administrateur).unwrap();
        assert!(f.app.commit_profile("1234567G", f.manager).await.is_err());
        assert_eq!(f.app.pending_profile("1234567G"), Some(Profile::Administrateur));
        assert_eq!(f.app.state().user_by_cp("1234567G").unwrap().profile, Profile::Gestionnaire);
        assert!(f.app.notifier().last().unwrap().message.starts_with("Erreur: "));
    }

    #[tokio::test]
    async fn test_non_admin_is_refused() {
        let mut f = fixture();
        login(&mut f.app, "1234567G", "manager-pass").await;

        assert!(matches!(
            f.app.commit_profile("7654321C", f.viewer).await,
            Err(ClientError::Forbidden)
        ));
        assert_eq!(
            f.app.notifier().last().unwrap().message,
            "Vous n'avez pas les droits pour effectuer cette action."
        );
    }

    #[tokio::test]
    async fn test_discard() {
        let mut f = fixture();
        login(&mut f.app, "7408443F", "admin-pass").await;
        f.app.stage_profile("7654321C", Profile::Administrateur).unwrap();
        f.app.discard_profile("7654321C");
        assert_eq!(f.app.pending_profile("7654321C"), None);
    }
}
