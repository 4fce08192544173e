use b2c_core::{Account, Policy};
use b2c_session::{CancellationToken, Session, SessionController};

use crate::cli_args::Command;

pub(crate) async fn handle_command(
    command: Command,
    controller: &SessionController,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Command::Authorities => {
            for policy in Policy::ALL {
                let authority = controller.resolver().for_policy(policy)?;
                println!("{policy}\t{authority}");
            }
        }
        Command::Accounts => {
            let accounts = controller.cached_accounts()?;
            if accounts.is_empty() {
                println!("No cached accounts");
            }
            for account in &accounts {
                let policy = controller
                    .account_store()
                    .decode(&account.home_account_id)
                    .map_or_else(|| "-".to_string(), |key| key.policy.to_string());
                println!(
                    "{}\t{}\t{}",
                    account.home_account_id,
                    policy,
                    account.display_name.as_deref().unwrap_or("-")
                );
            }
        }
        Command::SignIn => {
            let session = controller.sign_in(cancel).await?;
            print_session("Signed in", &session);
        }
        Command::EditProfile => {
            let session = controller.restore()?;
            let result = controller.edit_profile(&session, cancel).await?;
            println!("Profile updated for {}", describe(&result.account));
        }
        Command::Refresh => {
            let session = controller.restore()?;
            let session = controller.refresh(&session, cancel).await?;
            print_session("Token refreshed", &session);
        }
        Command::SignOut => {
            let session = controller.restore()?;
            controller.sign_out(&session)?;
            println!("Signed out");
        }
        Command::CallApi(args) => {
            let session = controller.restore()?;
            let body = match args.uri {
                Some(uri) => controller.call_protected_resource(&session, &uri).await?,
                None => controller.call_api(&session).await?,
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn print_session(label: &str, session: &Session) {
    match session.token() {
        Some(token) => println!(
            "{label} as {} (token expires {})",
            describe(&token.account),
            token.expires_on.to_rfc3339()
        ),
        None => println!("{label}"),
    }
}

fn describe(account: &Account) -> String {
    match account.display_name.as_deref() {
        Some(name) => format!("{name} <{}>", account.home_account_id),
        None => account.home_account_id.to_string(),
    }
}
