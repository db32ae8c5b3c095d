use serde::{Deserialize, Serialize};

/// A free-text name split into parts.
///
/// The last whitespace-separated word is the last name, the first word the
/// first name, anything in between the middle name. A single word is a last
/// name only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
}

impl PersonName {
    pub fn parse(name: &str) -> Self {
        let mut parts: Vec<&str> = name.split_whitespace().collect();
        let last_name = parts.pop().map(str::to_string);
        let first_name = if parts.is_empty() {
            None
        } else {
            Some(parts.remove(0).to_string())
        };
        let middle_name = (!parts.is_empty()).then(|| parts.join(" "));

        Self {
            first_name,
            middle_name,
            last_name,
        }
    }
}
