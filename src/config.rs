use anyhow::Context;
use std::env;
use std::path::PathBuf;

/// Process configuration, resolved from the environment once at startup and
/// shared with the handlers through axum state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory uploaded files are stored in. Created lazily on first upload.
    pub upload_dir: PathBuf,
    /// Request-body byte ceiling. `None` disables the limit.
    pub max_content_length: Option<usize>,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let max_content_length = parse_byte_limit(env::var("MAX_CONTENT_LENGTH").ok());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .context("PORT must be a valid port number")?;

        Ok(Self {
            upload_dir,
            max_content_length,
            host,
            port,
        })
    }
}

/// Lenient parse for `MAX_CONTENT_LENGTH`: unset, empty, non-numeric, or zero
/// all disable the limit.
fn parse_byte_limit(raw: Option<String>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse().ok())
        .filter(|&limit| limit > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_limit_parses_plain_integers() {
        assert_eq!(parse_byte_limit(Some("1048576".into())), Some(1_048_576));
        assert_eq!(parse_byte_limit(Some("  42 ".into())), Some(42));
    }

    #[test]
    fn byte_limit_disabled_when_unset_or_invalid() {
        assert_eq!(parse_byte_limit(None), None);
        assert_eq!(parse_byte_limit(Some("".into())), None);
        assert_eq!(parse_byte_limit(Some("lots".into())), None);
        assert_eq!(parse_byte_limit(Some("10MB".into())), None);
        assert_eq!(parse_byte_limit(Some("0".into())), None);
    }
}
