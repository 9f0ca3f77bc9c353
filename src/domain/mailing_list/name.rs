use derive_more::Display;
use unicode_segmentation::UnicodeSegmentation;

const MAX_GRAPHEMES: usize = 256;
const FORBIDDEN_CHARACTERS: [char; 9] = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];

#[derive(Debug, Clone, PartialEq, Eq, Display, serde::Serialize)]
#[display(fmt = "{}", _0)]
#[serde(transparent)]
pub struct ListName(String);

impl TryFrom<String> for ListName {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err("mailing list name is empty".into());
        }

        if value.graphemes(true).count() > MAX_GRAPHEMES {
            return Err("mailing list name is too long".into());
        }

        if value.chars().any(|c| FORBIDDEN_CHARACTERS.contains(&c)) {
            return Err("mailing list name contains invalid characters".into());
        }

        Ok(Self(value))
    }
}

impl AsRef<str> for ListName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
