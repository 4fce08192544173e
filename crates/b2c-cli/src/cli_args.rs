use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "b2c")]
#[command(about = "Azure AD B2C policy-scoped sign-in client")]
pub struct Cli {
    #[arg(long, env = "B2C_CONFIG", help = "YAML config (default: ~/.b2c/config.yaml)")]
    pub config: Option<PathBuf>,
    #[arg(long, env = "B2C_CACHE", help = "Token cache file (default: ~/.b2c/token_cache.json)")]
    pub cache: Option<PathBuf>,
    #[arg(long, help = "Store tokens in the macOS keychain instead of a file")]
    pub keychain: bool,
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(about = "Print the authority of every configured policy")]
    Authorities,
    #[command(about = "List cached accounts and the policy each was minted under")]
    Accounts,
    SignIn,
    EditProfile,
    Refresh,
    SignOut,
    #[command(about = "Call the protected API with the cached access token")]
    CallApi(CallApiArgs),
}

#[derive(Args)]
pub struct CallApiArgs {
    #[arg(long, help = "Override the configured api_endpoint")]
    pub uri: Option<String>,
}
