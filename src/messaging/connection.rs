//! AMQP connection management with retry logic

use crate::config::AmqpSettings;
use crate::error::Result;
use amqprs::callbacks::{DefaultChannelCallback, DefaultConnectionCallback};
use amqprs::channel::Channel;
use amqprs::connection::{Connection, OpenConnectionArguments};
use anyhow::{anyhow, Context};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Wrapper around an AMQP connection tied to the service configuration
pub struct AmqpConnection {
    connection: Connection,
}

impl AmqpConnection {
    /// Open a connection, retrying with exponential backoff
    pub async fn connect(settings: &AmqpSettings) -> Result<Self> {
        let mut retry_count = 0;
        let mut delay = Duration::from_millis(settings.retry_delay_ms);

        loop {
            match Self::try_connect(settings).await {
                Ok(connection) => {
                    info!(
                        host = %settings.host,
                        port = settings.port,
                        "connected to AMQP broker"
                    );
                    return Ok(Self { connection });
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > settings.max_retries {
                        error!(
                            retries = settings.max_retries,
                            "giving up on AMQP connection: {e}"
                        );
                        return Err(anyhow!(
                            "AMQP connection failed after {} retries: {e}",
                            settings.max_retries
                        ));
                    }

                    warn!(
                        attempt = retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "AMQP connection attempt failed: {e}, retrying"
                    );
                    sleep(delay).await;
                    delay = Duration::from_millis((delay.as_millis() as u64 * 2).min(30_000));
                }
            }
        }
    }

    async fn try_connect(settings: &AmqpSettings) -> Result<Connection> {
        let mut args = OpenConnectionArguments::new(
            &settings.host,
            settings.port,
            &settings.username,
            &settings.password,
        );
        args.virtual_host(&settings.vhost);

        let connection = Connection::open(&args)
            .await
            .context("failed to open AMQP connection")?;
        connection
            .register_callback(DefaultConnectionCallback)
            .await
            .context("failed to register connection callback")?;
        Ok(connection)
    }

    /// Open a new channel on this connection
    pub async fn open_channel(&self) -> Result<Channel> {
        let channel = self
            .connection
            .open_channel(None)
            .await
            .context("failed to open AMQP channel")?;
        channel
            .register_callback(DefaultChannelCallback)
            .await
            .context("failed to register channel callback")?;
        Ok(channel)
    }

    /// Close the connection
    pub async fn close(self) -> Result<()> {
        self.connection
            .close()
            .await
            .context("failed to close AMQP connection")
    }
}

#[cfg(test)]
mod tests {
    use crate::config::AmqpSettings;

    #[test]
    fn default_settings_point_at_local_broker() {
        let settings = AmqpSettings::default();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 5672);
        assert!(settings.max_retries > 0);
    }

    // Connecting against a live broker is covered by deployment smoke tests,
    // not by this suite.
}
