use super::*;

pub(super) async fn handle_login_command(
    ctx: &DevspaceContext,
    username: String,
    password: Option<String>,
) -> Result<()> {
    let password = read_password(password)?;
    let session = ctx.session.login(&username, &password).await?;
    if session.is_admin {
        println!("Logged in as {} (admin)", session.username);
    } else {
        println!("Logged in as {}", session.username);
    }
    Ok(())
}

pub(super) async fn handle_logout_command(ctx: &DevspaceContext) -> Result<()> {
    ctx.session.logout().await;
    println!("Logged out");
    Ok(())
}

pub(super) async fn handle_register_command(
    ctx: &DevspaceContext,
    username: String,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let password = read_password(password)?;
    ctx.session.register(&username, &email, &password).await?;
    println!("Registered {}; run `devspace login` to sign in", username);
    Ok(())
}

pub(super) fn handle_whoami_command(ctx: &DevspaceContext, json: bool) -> Result<()> {
    require_login(ctx)?;
    let state = ctx.session.current();
    let session = state.session().context("no active session")?;
    if json {
        let value = serde_json::json!({
            "username": session.username,
            "email": session.email,
            "is_admin": session.is_admin,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serialize whoami json")?
        );
    } else {
        println!("user: {}", session.username);
        println!("email: {}", session.email);
        println!("admin: {}", session.is_admin);
        println!("server: {}", ctx.config().base_url);
    }
    Ok(())
}
