use std::io::{self, IsTerminal, Write};

use crate::auth::{AuthLoginResult, AuthStatus, OAuthClient, TokenStore};
use crate::cli::AuthCommand;
use crate::config::{self, Settings};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

pub async fn run(ctx: &AppContext, command: AuthCommand) -> AppResult<()> {
    match command {
        AuthCommand::Login => {
            let settings = ensure_login_settings(ctx)?;
            let result = match login(ctx, &settings).await {
                Err(AppError::Authorization(message)) if missing_client_secret_error(&message) => {
                    let settings = prompt_for_missing_client_secret(ctx, &settings, &message)?;
                    login(ctx, &settings).await?
                }
                other => other?,
            };

            let text = match result.email.as_ref() {
                Some(email) => format!("{}: logged in as {email}", result.profile),
                None => format!("{}: {}", result.profile, result.note),
            };
            ctx.output.emit(&text, &result)
        }
        AuthCommand::Status => {
            let status = AuthStatus::from_store(&ctx.profile, &ctx.token_store)?;
            let text = if status.logged_in {
                let refresh_hint = match status.has_refresh_token {
                    Some(true) => " (refresh available)",
                    Some(false) => " (no refresh token)",
                    None => "",
                };
                format!(
                    "{}: logged in{}{refresh_hint}",
                    status.profile,
                    status
                        .email
                        .as_ref()
                        .map(|email| format!(" as {email}"))
                        .unwrap_or_default(),
                )
            } else {
                format!("{}: logged out", status.profile)
            };

            ctx.output.emit(&text, &status)
        }
        AuthCommand::Logout => {
            ctx.gateway.revoke(None).await;
            ctx.token_store.clear(&ctx.profile)?;
            let status = AuthStatus::logged_out(&ctx.profile, "local credentials removed");
            let text = format!("{}: logged out", status.profile);
            ctx.output.emit(&text, &status)
        }
    }
}

async fn login(ctx: &AppContext, settings: &Settings) -> AppResult<AuthLoginResult> {
    let outcome = OAuthClient::from_settings(settings)?.login().await?;
    ctx.token_store.save(&ctx.profile, &outcome.token)?;

    Ok(AuthLoginResult {
        profile: ctx.profile.clone(),
        opened_browser: outcome.opened_browser,
        authorization_url: outcome.authorization_url,
        email: outcome.token.email.clone(),
        note: "token saved to local store".to_string(),
    })
}

fn ensure_login_settings(ctx: &AppContext) -> AppResult<Settings> {
    let mut settings = ctx.settings.clone();
    let missing_client_id = is_blank(settings.client_id.as_deref());
    let missing_client_secret = is_blank(settings.client_secret.as_deref());

    if !missing_client_id && !missing_client_secret {
        return Ok(settings);
    }

    let settings_path = ctx.paths.settings_file(&ctx.profile);
    if !io::stdin().is_terminal() {
        let missing = match (missing_client_id, missing_client_secret) {
            (true, true) => "client_id and client_secret",
            (true, false) => "client_id",
            _ => "client_secret",
        };
        return Err(AppError::Config(format!(
            "missing oauth {missing} in {}. run `pgpmail auth login` in an interactive terminal to be prompted, or add the values manually",
            settings_path.display(),
        )));
    }

    println!("OAuth client config is missing for profile `{}`.", ctx.profile);
    println!("Settings will be saved to {}.", settings_path.display());

    if missing_client_id {
        settings.client_id = Some(prompt_required("OAuth client_id: ")?);
    }
    if missing_client_secret {
        settings.client_secret = Some(prompt_required("OAuth client_secret: ")?);
    }

    let default_redirect = settings.redirect_uri();
    let redirect_uri = prompt_line(&format!("OAuth redirect_uri [{default_redirect}]: "))?;
    settings.redirect_uri = Some(if redirect_uri.is_empty() {
        default_redirect
    } else {
        redirect_uri
    });

    config::save_settings(&ctx.paths, &ctx.profile, &settings)?;
    println!("Saved profile settings to {}.", settings_path.display());

    Ok(settings)
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(str::trim).is_none_or(str::is_empty)
}

fn prompt_required(prompt: &str) -> AppResult<String> {
    loop {
        let value = prompt_line(prompt)?;
        if !value.is_empty() {
            return Ok(value);
        }
        eprintln!("value is required");
    }
}

fn prompt_line(prompt: &str) -> AppResult<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

fn missing_client_secret_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("client_secret is missing") || lower.contains("client secret is missing")
}

fn prompt_for_missing_client_secret(
    ctx: &AppContext,
    settings: &Settings,
    original_error: &str,
) -> AppResult<Settings> {
    if !is_blank(settings.client_secret.as_deref()) {
        return Err(AppError::Authorization(original_error.to_string()));
    }

    let settings_path = ctx.paths.settings_file(&ctx.profile);
    if !io::stdin().is_terminal() {
        return Err(AppError::Authorization(format!(
            "{original_error}. add client_secret to {}",
            settings_path.display()
        )));
    }

    println!("Google requires a client_secret for this OAuth client.");
    let mut updated = settings.clone();
    updated.client_secret = Some(prompt_required("OAuth client_secret: ")?);
    config::save_settings(&ctx.paths, &ctx.profile, &updated)?;
    println!("Updated profile settings at {}.", settings_path.display());

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_missing_secret_errors() {
        assert!(missing_client_secret_error("invalid_request: client_secret is missing."));
        assert!(!missing_client_secret_error("invalid_grant: bad code"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        assert!(is_blank(None));
        assert!(is_blank(Some("  ")));
        assert!(!is_blank(Some("id")));
    }
}
