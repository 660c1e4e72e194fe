//! Request body content kinds.

/// Media type used when an operation declares no request content type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// The request body encodings the codec knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json`
    Json,
    /// `application/x-www-form-urlencoded`
    FormUrlEncoded,
    /// `multipart/form-data`
    Multipart,
    /// `text/plain`
    Text,
    /// Anything else; the body is sent as supplied.
    Other,
}

const KNOWN_KINDS: &[(&str, ContentKind)] = &[
    ("application/json", ContentKind::Json),
    ("application/x-www-form-urlencoded", ContentKind::FormUrlEncoded),
    ("multipart/form-data", ContentKind::Multipart),
    ("text/plain", ContentKind::Text),
];

impl ContentKind {
    /// Classify a declared content type. `None` means JSON.
    ///
    /// Only the essence (`type/subtype`) is compared, case-insensitively, so
    /// `text/plain; charset=utf-8` is still [`ContentKind::Text`].
    pub fn of(content_type: Option<&str>) -> Self {
        let declared = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);
        let essence = declared.split(';').next().unwrap_or_default().trim();

        KNOWN_KINDS
            .iter()
            .find(|(media, _)| media.eq_ignore_ascii_case(essence))
            .map_or(Self::Other, |(_, kind)| *kind)
    }

    /// Canonical media type for the known kinds.
    pub fn media_type(&self) -> Option<&'static str> {
        KNOWN_KINDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(media, _)| *media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_content_type_is_json() {
        assert_eq!(ContentKind::of(None), ContentKind::Json);
    }

    #[test]
    fn test_known_kinds() {
        assert_eq!(
            ContentKind::of(Some("application/x-www-form-urlencoded")),
            ContentKind::FormUrlEncoded
        );
        assert_eq!(
            ContentKind::of(Some("multipart/form-data")),
            ContentKind::Multipart
        );
        assert_eq!(
            ContentKind::of(Some("Text/Plain; charset=utf-8")),
            ContentKind::Text
        );
    }

    #[test]
    fn test_unknown_kind_is_other() {
        assert_eq!(
            ContentKind::of(Some("application/octet-stream")),
            ContentKind::Other
        );
        assert_eq!(ContentKind::Other.media_type(), None);
        assert_eq!(ContentKind::Json.media_type(), Some("application/json"));
    }
}
