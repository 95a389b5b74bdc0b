use crate::core::ledger::{Ledger, RegisteredUser};
use anyhow::Result;

fn registered_message(user: &RegisteredUser) -> String {
    format!(
        "User '{}' registered (id={}). Log in with: login --username {} --password ****",
        user.username, user.user_id, user.username
    )
}

pub fn register(ledger: &Ledger, username: &str, password: &str) -> Result<()> {
    let user = ledger.register(username, password)?;
    println!("{}", registered_message(&user));
    Ok(())
}

pub fn login(ledger: &Ledger, username: &str, password: &str) -> Result<()> {
    let user = ledger.login(username, password)?;
    println!("Logged in as '{}'", user.username);
    Ok(())
}

pub fn logout(ledger: &Ledger) -> Result<()> {
    match ledger.logout()? {
        Some(session) => println!("Logged out '{}'", session.username),
        None => println!("Nobody is logged in"),
    }
    Ok(())
}
