use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use b2c_core::{B2cConfig, TokenResult};
use b2c_session::{InteractiveRequest, InteractiveSurface, SurfaceError};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::redirect::{authorize_url, parse_redirect};

/// Interactive surface for terminals: prints the authorize URL and reads the
/// redirect URL back from stdin.
pub(crate) struct ConsoleSurface {
    client_id: String,
    redirect_uri: String,
}

impl ConsoleSurface {
    pub(crate) fn new(config: &B2cConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }
}

#[async_trait]
impl InteractiveSurface for ConsoleSurface {
    async fn present(&self, request: InteractiveRequest) -> Result<TokenResult, SurfaceError> {
        if self.redirect_uri.trim().is_empty() {
            return Err(SurfaceError::Unavailable(
                "redirect_uri is not configured".to_string(),
            ));
        }
        let nonce = Uuid::new_v4().to_string();
        let url = authorize_url(&request, &self.client_id, &self.redirect_uri, &nonce)?;
        println!("Open this URL to continue ({}):", request.authority.policy());
        println!("{url}");
        print!("Paste the redirect URL (empty line cancels): ");
        io::stdout()
            .flush()
            .map_err(|err| SurfaceError::Unavailable(err.to_string()))?;
        let line = read_line().await?;
        parse_redirect(&line, &request, &nonce)
    }
}

/// Reads one line from stdin on a detached thread.
async fn read_line() -> Result<String, SurfaceError> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = tx.send(io::stdin().lock().read_line(&mut line).map(|_| line));
    });
    rx.await
        .map_err(|err| SurfaceError::Unavailable(err.to_string()))?
        .map_err(|err| SurfaceError::Unavailable(err.to_string()))
}
