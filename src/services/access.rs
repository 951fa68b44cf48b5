//! Fast-fail checks mirroring the backend's row policies for KB entries.
//!
//! The backend stays authoritative; these checks only turn the common
//! violations into clear `403` responses before a round trip is made.

use crate::{
    error::ApiError,
    models::{CurrentUser, KbEntry},
};

/// Only admins may publish entries
pub fn ensure_can_create(user: &CurrentUser, is_public: bool) -> Result<(), ApiError> {
    if is_public && !user.is_admin() {
        return Err(ApiError::forbidden("Only admins can create public entries"));
    }
    Ok(())
}

/// Owners may change their private entries; admins may change any entry
pub fn ensure_can_modify(user: &CurrentUser, entry: &KbEntry) -> Result<(), ApiError> {
    if user.is_admin() {
        return Ok(());
    }
    if entry.is_public {
        return Err(ApiError::forbidden("Only admins can modify public entries"));
    }
    if entry.user_id != user.id {
        return Err(ApiError::forbidden("You can only modify your own entries"));
    }
    Ok(())
}

/// Only admins may set or clear the public flag
pub fn ensure_can_change_visibility(
    user: &CurrentUser,
    entry: &KbEntry,
    requested: Option<bool>,
) -> Result<(), ApiError> {
    match requested {
        Some(is_public) if is_public != entry.is_public && !user.is_admin() => Err(
            ApiError::forbidden("Only admins can change the visibility of an entry"),
        ),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: None,
            role,
        }
    }

    fn entry(owner: Uuid, is_public: bool) -> KbEntry {
        KbEntry {
            id: Uuid::new_v4(),
            user_id: owner,
            title: "t".to_string(),
            url_original: "https://example.com".to_string(),
            url_canonical: None,
            tags: vec![],
            is_public,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_public_requires_admin() {
        assert!(ensure_can_create(&user(Role::User), false).is_ok());
        assert!(matches!(
            ensure_can_create(&user(Role::User), true),
            Err(ApiError::Forbidden { .. })
        ));
        assert!(ensure_can_create(&user(Role::Admin), true).is_ok());
    }

    #[test]
    fn test_modify_rules() {
        let owner = user(Role::User);
        let other = user(Role::User);
        let admin = user(Role::Admin);

        let private = entry(owner.id, false);
        assert!(ensure_can_modify(&owner, &private).is_ok());
        assert!(ensure_can_modify(&other, &private).is_err());
        assert!(ensure_can_modify(&admin, &private).is_ok());

        let public = entry(owner.id, true);
        assert!(ensure_can_modify(&owner, &public).is_err());
        assert!(ensure_can_modify(&admin, &public).is_ok());
    }

    #[test]
    fn test_visibility_change_rules() {
        let owner = user(Role::User);
        let private = entry(owner.id, false);
        assert!(ensure_can_change_visibility(&owner, &private, None).is_ok());
        assert!(ensure_can_change_visibility(&owner, &private, Some(false)).is_ok());
        assert!(ensure_can_change_visibility(&owner, &private, Some(true)).is_err());
        assert!(ensure_can_change_visibility(&user(Role::Admin), &private, Some(true)).is_ok());
    }
}
