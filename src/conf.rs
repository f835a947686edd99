use crate::{Error, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Process-level configuration, read once at startup. Portal credentials are
/// intentionally not part of this struct: they are resolved right before a
/// sync starts so the read-only API surface can run without them.
#[derive(Clone)]
pub struct Conf {
    pub download_dir: PathBuf,
    pub data_dir: Option<PathBuf>,
    pub webdriver_url: String,
    pub production: bool,
    pub chrome_binary: Option<String>,
    pub allowed_origins: Vec<String>,
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Conf {
    pub fn from_env() -> Conf {
        Conf {
            download_dir: env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("downloads")),
            data_dir: env::var("DATA_DIR").map(PathBuf::from).ok(),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.into()),
            production: env::var("ENVIRONMENT").as_deref() == Ok("production"),
            chrome_binary: env::var("CHROME_BIN").ok(),
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.into()),
            ),
        }
    }

    /// Portal credentials are mandatory external configuration, there is no
    /// embedded fallback
    pub fn credentials(&self) -> Result<Credentials> {
        let username = env::var("EVOLTA_USERNAME")
            .map_err(|_| Error::Conf("EVOLTA_USERNAME is not set".into()))?;
        let password = env::var("EVOLTA_PASSWORD")
            .map_err(|_| Error::Conf("EVOLTA_PASSWORD is not set".into()))?;
        Ok(Credentials { username, password })
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|it| it.trim())
        .filter(|it| !it.is_empty())
        .map(|it| it.trim_end_matches('/').to_string())
        .collect()
}

#[cfg(test)]
mod test {
    #[test]
    fn parse_origins() {
        assert_eq!(
            vec!["http://localhost:5173", "https://semaforo.example.com"],
            super::parse_origins(" http://localhost:5173 ,https://semaforo.example.com/,,"),
        );
    }

    #[test]
    fn parse_origins_empty() {
        assert!(super::parse_origins("").is_empty());
    }
}
