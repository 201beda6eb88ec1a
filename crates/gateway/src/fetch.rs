use std::error::Error as StdError;
use std::io::{self, Read};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch image: remote server returned status {0}")]
    Status(u16),

    #[error("Failed to fetch image: timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Failed to fetch image: {0}")]
    Connection(String),

    #[error("Failed to fetch image: body exceeds {0} bytes")]
    TooLarge(usize),
}

impl FetchError {
    /// Short machine-readable reason used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidUrl(_) => "invalid_url",
            FetchError::Status(_) => "status",
            FetchError::Timeout(_) => "timeout",
            FetchError::Connection(_) => "connection",
            FetchError::TooLarge(_) => "too_large",
        }
    }
}

/// Blocking HTTP client for remote images with a bounded timeout and body size.
#[derive(Clone)]
pub struct ImageFetcher {
    agent: ureq::Agent,
    timeout: Duration,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("gateway/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            timeout,
            max_bytes,
        }
    }

    /// Download `url`. Blocks the calling thread for up to the timeout.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.agent.get(url).call().map_err(|e| self.classify(e))?;

        let mut body = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes as u64 + 1)
            .read_to_end(&mut body)
            .map_err(|e| {
                if is_timeout(&e) {
                    FetchError::Timeout(self.timeout)
                } else {
                    FetchError::Connection(e.to_string())
                }
            })?;

        if body.len() > self.max_bytes {
            return Err(FetchError::TooLarge(self.max_bytes));
        }

        Ok(body)
    }

    fn classify(&self, err: ureq::Error) -> FetchError {
        match err {
            ureq::Error::Status(code, _) => FetchError::Status(code),
            ureq::Error::Transport(transport) => match transport.kind() {
                ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => {
                    FetchError::InvalidUrl(transport.to_string())
                }
                _ if is_timeout(&transport) => FetchError::Timeout(self.timeout),
                _ => FetchError::Connection(transport.to_string()),
            },
        }
    }
}

fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        current = e.source();
    }
    err.to_string().contains("timed out")
}
