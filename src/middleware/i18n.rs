// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

const DEFAULT_LANG: &str = "pt";

// Extrator de idioma (a partir do Accept-Language)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    pub fn is_english(&self) -> bool {
        self.0 == "en"
    }

    pub fn from_header(header_str: &str) -> Self {
        accept_language::parse(header_str)
            .first() // Pega o idioma preferido (ex: "pt-BR")
            .map(|tag| {
                // "pt-BR" -> "pt", "en" -> "en"
                tag.split('-').next().unwrap_or(tag).to_lowercase()
            })
            .map(Locale)
            .unwrap_or_default()
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Locale::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn picks_primary_subtag_of_preferred_language() {
        assert_eq!(Locale::from_header("en-US,en;q=0.9,pt;q=0.8"), Locale("en".into()));
        assert_eq!(Locale::from_header("pt-BR"), Locale("pt".into()));
    }

    #[test]
    fn falls_back_to_portuguese() {
        assert_eq!(Locale::from_header(""), Locale::default());
        assert!(!Locale::default().is_english());
    }

    #[tokio::test]
    async fn extractor_reads_accept_language_header() {
        let (mut parts, _) = Request::builder()
            .header(header::ACCEPT_LANGUAGE, "en-GB")
            .body(())
            .unwrap()
            .into_parts();
        let locale = Locale::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(locale.is_english());

        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let locale = Locale::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(locale, Locale::default());
    }
}
