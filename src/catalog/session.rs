use serde::{Deserialize, Serialize};

/// A single conference session
///
/// `id` is the catalog key. Every other field is best-effort: a field the
/// source page does not carry is left empty rather than failing extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub speakers: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub duration: String,
}

impl Session {
    /// Creates a session with only its key fields set
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_omitted() {
        let mut session = Session::new("42", "https://example.com/42");
        session.title = "Talk".to_string();

        let json = serde_json::to_value(&session).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["id"], "42");
        assert_eq!(object["title"], "Talk");
        assert!(!object.contains_key("speakers"));
    }

    #[test]
    fn test_missing_fields_default_on_decode() {
        let session: Session = serde_json::from_str(r#"{"id":"A","title":"Talk A"}"#).unwrap();
        assert_eq!(session.id, "A");
        assert_eq!(session.title, "Talk A");
        assert!(session.url.is_empty());
        assert!(session.speakers.is_empty());
    }
}
