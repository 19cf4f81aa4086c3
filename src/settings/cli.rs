use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tokenward", about = "Token issuance and session lifecycle tool")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// With the `memory` store backend every invocation starts from an empty
/// store, so `refresh`, `logout`, `logout-all` and `sessions` only see state
/// written by the same process. Point `[store]` at Redis to carry sessions
/// across invocations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Issue a token pair for the given principal without a password check.
    /// The pair can only be refreshed if the principal is also listed under
    /// `[[principals]]`.
    Issue {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Log in against the configured principal directory
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Verify an access token and print its claims
    Verify { token: String },
    /// Rotate a refresh token into a new pair
    Refresh { token: String },
    /// Revoke an access token
    Logout { token: String },
    /// Revoke every refresh token of a subject
    LogoutAll { id: i64 },
    /// List live sessions of a subject
    Sessions { id: i64 },
    /// Produce a PHC password hash for a `[[principals]]` entry
    HashPassword { password: String },
}
