//! `careplan login`, `careplan signup`, `careplan logout`, `careplan whoami`.

use anyhow::{Context, Result};

use careplan_core::auth::SignupRequest;

use crate::context::AppContext;

pub const PASSWORD_ENV: &str = "CAREPLAN_PASSWORD";

fn password_or_env(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => std::env::var(PASSWORD_ENV)
            .with_context(|| format!("no password given; pass --password or set {PASSWORD_ENV}")),
    }
}

pub async fn cmd_login(ctx: &mut AppContext, email: &str, password: Option<String>) -> Result<()> {
    let password = password_or_env(password)?;

    let session = ctx.auth.sign_in(email, &password).await?;
    println!(
        "Signed in as {} ({}){}",
        session.profile.full_name,
        session.profile.role,
        if session.demo { " [demo account]" } else { "" }
    );
    ctx.persist_session()?;
    Ok(())
}

pub async fn cmd_signup(
    ctx: &AppContext,
    email: String,
    full_name: String,
    role: String,
    password: Option<String>,
) -> Result<()> {
    let request = SignupRequest {
        password: password_or_env(password)?,
        email,
        full_name,
        role,
    };
    let outcome = ctx.auth.sign_up(&request).await?;

    println!("Account created for {} ({}).", request.full_name.trim(), request.email.trim());
    println!("  User ID: {}", outcome.user_id);
    if outcome.confirmation_required {
        println!("メールを確認してアカウントを有効化してください。");
    }
    println!();
    println!("Next: run `careplan login --email {}`.", request.email.trim());
    Ok(())
}

pub async fn cmd_logout(ctx: &mut AppContext) -> Result<()> {
    match ctx.auth.sign_out().await {
        Some(session) => println!("Signed out {}.", session.email),
        None => println!("Not signed in."),
    }
    ctx.persist_session()
}

pub fn cmd_whoami(ctx: &AppContext) -> Result<()> {
    let session = ctx.require_session()?;
    println!("{} ({})", session.profile.full_name, session.profile.role);
    println!("  Email:   {}", session.email);
    println!("  User ID: {}", session.user_id);
    println!("  Mode:    {}", ctx.mode());
    Ok(())
}
