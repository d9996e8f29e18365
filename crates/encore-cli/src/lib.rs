use async_trait::async_trait;
use encore_core::models::CurrentUser;
use encore_core::{log_error, AppError, ErrorMetadata};
use encore_services::IdentityProvider;
use uuid::Uuid;

/// Truncate to `max_chars` characters, appending "..." when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Operator identity taken from `ENCORE_USER_ID`; nobody is signed in when unset.
#[derive(Debug, Clone, Default)]
pub struct EnvIdentity {
    user_id: Option<Uuid>,
}

impl EnvIdentity {
    pub fn from_env() -> anyhow::Result<Self> {
        let user_id = match std::env::var("ENCORE_USER_ID") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<Uuid>()
                    .map_err(|e| anyhow::anyhow!("ENCORE_USER_ID is not a UUID: {}", e))?,
            ),
            Err(_) => None,
        };
        Ok(Self { user_id })
    }
}

#[async_trait]
impl IdentityProvider for EnvIdentity {
    async fn current_user(&self) -> Result<Option<CurrentUser>, AppError> {
        Ok(self.user_id.map(|id| CurrentUser {
            id,
            email: None,
            display_name: None,
            avatar_url: None,
        }))
    }
}

/// Log a failed command and render the line shown to the operator.
///
/// Service errors are logged at their own level and shown by code and client message;
/// anything else is shown with its full context chain.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(app) => {
            log_error(app);
            let hint = if app.is_recoverable() {
                " (retrying may help)"
            } else {
                ""
            };
            format!(
                "error[{}]: {}{}",
                app.error_code(),
                app.client_message(),
                hint
            )
        }
        None => format!("error: {:#}", err),
    }
}

/// Initialize tracing for the CLI. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
