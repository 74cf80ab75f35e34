use std::{fmt, str::FromStr};

use crate::common::errors::YouTubeError;

/// A validated 11-character YouTube video id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accepts a bare id or a watch, youtu.be, embed, shorts or live URL.
    pub fn parse(input: &str) -> Result<Self, YouTubeError> {
        let input = input.trim();
        if is_valid(input) {
            return Ok(Self(input.to_string()));
        }

        extract_id(input)
            .filter(|id| is_valid(id))
            .map(|id| Self(id.to_string()))
            .ok_or_else(|| YouTubeError::InvalidVideoId(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid(id: &str) -> bool {
    id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn extract_id(url: &str) -> Option<&str> {
    let rest = if let Some((_, rest)) = url.split_once("v=") {
        rest.split('&').next()
    } else {
        ["youtu.be/", "/embed/", "/shorts/", "/live/"]
            .iter()
            .find_map(|marker| url.split_once(marker).map(|(_, rest)| rest))
            .and_then(|rest| rest.split(['?', '/']).next())
    }?;
    rest.split('#').next()
}

impl FromStr for VideoId {
    type Err = YouTubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let cases = [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/live/dQw4w9WgXcQ?feature=shared",
        ];
        for case in cases {
            assert_eq!(VideoId::parse(case).unwrap().as_str(), "dQw4w9WgXcQ", "{}", case);
        }
    }

    #[test]
    fn test_rejects_invalid() {
        for case in ["", "short", "dQw4w9WgXcQx", "https://example.com/", "dQw4w9WgX!Q"] {
            assert!(
                matches!(VideoId::parse(case), Err(YouTubeError::InvalidVideoId(_))),
                "{}",
                case
            );
        }
    }
}
