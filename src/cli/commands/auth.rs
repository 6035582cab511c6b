use anyhow::Context;
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, validate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Mint a bearer token for a user id")]
    Token {
        #[arg(long, help = "User id the token speaks for (random if omitted)")]
        user: Option<Uuid>,
        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Verify a bearer token and show its claims")]
    Verify {
        #[arg(help = "Token to verify")]
        token: String,
    },
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config::config().security;

    match cmd {
        AuthCommands::Token { user, hours } => {
            let user_id = user.unwrap_or_else(Uuid::new_v4);
            let hours = hours.unwrap_or(security.jwt_expiry_hours);
            let claims = Claims::new(user_id, hours).context("invalid token lifetime")?;
            let token = generate_jwt(&claims, &security.jwt_secret).context("failed to mint token")?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token issued",
                    Some(json!({ "token": token, "user_id": user_id, "expires_at": claims.exp })),
                ),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
        AuthCommands::Verify { token } => {
            let claims = validate_jwt(token.trim(), &security.jwt_secret).context("token rejected")?;
            output_success(
                &output_format,
                &format!("Token valid for user {}", claims.sub),
                Some(json!({ "user_id": claims.sub, "issued_at": claims.iat, "expires_at": claims.exp })),
            )
        }
    }
}
