//! Discord client setup and lifecycle management.

use super::handler::ChronicleHandler;
use crate::context::SyncContext;
use chronicle_database::PgPool;
use chronicle_error::{GatewayError, GatewayErrorKind, GatewayResult};
use serenity::Client;
use tracing::{info, instrument};

/// Discord gateway client for Chronicle.
///
/// Owns the Serenity client and the engine context its handler writes
/// through.
///
/// # Example
/// ```no_run
/// use chronicle_database::establish_pool;
/// use chronicle_sync::discord::ChronicleBot;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let token = std::env::var("DISCORD_TOKEN")?;
///     let pool = establish_pool()?;
///
///     let mut bot = ChronicleBot::new(token, pool).await?;
///     bot.start().await?;
///     Ok(())
/// }
/// ```
pub struct ChronicleBot {
    /// Serenity client instance
    client: Client,
    /// Engine context (kept for direct access alongside the handler's copy)
    ctx: SyncContext,
}

impl ChronicleBot {
    /// Create a new ChronicleBot instance.
    ///
    /// # Arguments
    /// * `token` - Discord bot token from the Discord Developer Portal
    /// * `pool` - PostgreSQL connection pool
    ///
    /// # Errors
    /// Returns an error if the Serenity client fails to initialize.
    #[instrument(skip(token, pool), fields(token_len = token.len()))]
    pub async fn new(token: String, pool: PgPool) -> GatewayResult<Self> {
        info!("initializing Chronicle Discord client");

        let ctx = SyncContext::new(pool);
        let handler = ChronicleHandler::new(ctx.clone());
        let intents = ChronicleHandler::intents();

        let client = Client::builder(&token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                GatewayError::new(GatewayErrorKind::Transport(format!(
                    "failed to build client: {e}"
                )))
            })?;

        Ok(Self { client, ctx })
    }

    /// Start the client and block until it shuts down.
    ///
    /// # Errors
    /// Returns an error if the client fails to start or hits a fatal
    /// gateway error.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> GatewayResult<()> {
        info!("starting Discord gateway client");

        self.client.start().await.map_err(|e| {
            GatewayError::new(GatewayErrorKind::Transport(format!("client error: {e}")))
        })?;

        Ok(())
    }

    /// The engine context, for querying outside of event handlers.
    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }
}
