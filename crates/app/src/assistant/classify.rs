//! Keyword routing between the text and media models

use std::sync::LazyLock;

use regex::Regex;

static IMAGE_REQUEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)gerar imagem|criar imagem|desenhe|foto").unwrap());

static VIDEO_REQUEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)gerar video|criar video|movie|fazer video").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Text,
    Image,
    /// Served as a single cinematic still
    Video,
}

impl RequestKind {
    /// Video keywords win over image keywords
    pub fn classify(prompt: &str) -> Self {
        if VIDEO_REQUEST.is_match(prompt) {
            RequestKind::Video
        } else if IMAGE_REQUEST.is_match(prompt) {
            RequestKind::Image
        } else {
            RequestKind::Text
        }
    }

    pub fn is_media(self) -> bool {
        !matches!(self, RequestKind::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(RequestKind::classify("Gerar Imagem de um barco"), RequestKind::Image);
        assert_eq!(RequestKind::classify("uma FOTO do mar"), RequestKind::Image);
        assert_eq!(RequestKind::classify("Criar Video curto"), RequestKind::Video);
        assert_eq!(RequestKind::classify("a movie trailer"), RequestKind::Video);
    }

    #[test]
    fn video_beats_image() {
        assert_eq!(
            RequestKind::classify("desenhe e depois fazer video"),
            RequestKind::Video
        );
    }

    #[test]
    fn plain_prompts_are_text() {
        let kind = RequestKind::classify("como funciona o borrow checker?");
        assert_eq!(kind, RequestKind::Text);
        assert!(!kind.is_media());
    }
}
