// Termination signals that stop a running report worker

use crate::error::{DataStoryError, Result};
use tokio::signal::unix::{signal, Signal as TokioSignal, SignalKind};

/// Listens for SIGTERM and SIGINT
pub struct SignalHandler {
    sigterm: TokioSignal,
    sigint: TokioSignal,
}

impl SignalHandler {
    pub fn new() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate()).map_err(|e| DataStoryError::Io {
            source: e,
            context: "Failed to setup SIGTERM handler".to_string(),
        })?;
        let sigint = signal(SignalKind::interrupt()).map_err(|e| DataStoryError::Io {
            source: e,
            context: "Failed to setup SIGINT handler".to_string(),
        })?;

        Ok(Self { sigterm, sigint })
    }

    /// Wait for a signal, returning its name
    pub async fn wait(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::info!("Received SIGTERM");
                "terminate"
            }
            _ = self.sigint.recv() => {
                tracing::info!("Received SIGINT");
                "interrupt"
            }
        }
    }
}
