use thiserror::Error;

/// Every way resolving a stream manifest can fail.
#[derive(Debug, Error)]
pub enum YouTubeError {
  /// A mandatory attribute is missing from an otherwise well-formed response.
  /// Usually means the upstream schema changed.
  #[error("Failed to extract the {0}.")]
  Extraction(String),

  #[error("Video '{video_id}' requires purchase and cannot be played (preview: '{preview_video_id}').")]
  RequiresPurchase {
    video_id: String,
    preview_video_id: String,
  },

  #[error(
    "Video '{video_id}' is unplayable. Reason: '{}'.",
    .reason.as_deref().unwrap_or("unknown")
  )]
  Unplayable {
    video_id: String,
    reason: Option<String>,
  },

  #[error("Invalid YouTube video ID or URL: '{0}'.")]
  InvalidVideoId(String),

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Request to {url} failed with status {status}")]
  Status {
    status: reqwest::StatusCode,
    url: String,
  },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Malformed DASH manifest: {0}")]
  Manifest(String),

  #[error("Cipher error: {0}")]
  Cipher(String),

  #[error("Operation cancelled")]
  Cancelled,
}

impl YouTubeError {
  pub fn extraction(what: impl Into<String>) -> Self {
    Self::Extraction(what.into())
  }

  pub fn unplayable(video_id: impl Into<String>, reason: Option<String>) -> Self {
    Self::Unplayable {
      video_id: video_id.into(),
      reason,
    }
  }

  /// Connection, status and I/O failures.
  pub fn is_network(&self) -> bool {
    matches!(self, Self::Http(_) | Self::Status { .. } | Self::Io(_))
  }

  /// Network failures other than 404. These are the only errors the manifest
  /// resolver retries. Decode and request-builder errors are not network
  /// failures even though reqwest reports them.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request() || e.is_body(),
      Self::Status { status, .. } => *status != reqwest::StatusCode::NOT_FOUND,
      Self::Io(_) => true,
      _ => false,
    }
  }
}

pub type StreamResult<T> = std::result::Result<T, YouTubeError>;
