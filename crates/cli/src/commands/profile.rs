//! Profile commands.

use atelier_storefront::models::ProfileUpdate;
use atelier_storefront::state::AppState;

use super::CommandError;

/// Print the stored profile of the signed-in user.
///
/// # Errors
///
/// Returns `CommandError` without a user or when the profile cannot be read.
#[allow(clippy::print_stdout)]
pub async fn show(state: &AppState) -> Result<(), CommandError> {
    let identity = state.tracker().current().ok_or(CommandError::NotSignedIn)?;
    let Some(profile) = state.accounts().get_profile(&identity.uid).await? else {
        println!("No profile stored for {}.", identity.uid);
        return Ok(());
    };

    println!("User:     {} ({})", identity.uid, identity.avatar_initial());
    if let Some(email) = &profile.email {
        println!("Email:    {email}");
    }
    if let Some(name) = profile.display_name.as_deref().filter(|n| !n.is_empty()) {
        println!("Name:     {name}");
    }
    if let Some(theme) = &profile.theme_preference {
        println!("Theme:    {theme}");
    }
    if let Some(last_login) = profile.last_login {
        println!("Last login: {}", last_login.to_rfc3339());
    }
    Ok(())
}

/// Update profile fields of the signed-in user.
///
/// # Errors
///
/// Returns `CommandError` without a user or when the update fails.
pub async fn update(
    state: &AppState,
    display_name: Option<String>,
    theme_preference: Option<String>,
) -> Result<(), CommandError> {
    if state.tracker().current().is_none() {
        return Err(CommandError::NotSignedIn);
    }
    state
        .accounts()
        .update_profile(ProfileUpdate {
            display_name,
            theme_preference,
            ..ProfileUpdate::default()
        })
        .await?;
    tracing::info!("profile updated");
    Ok(())
}
