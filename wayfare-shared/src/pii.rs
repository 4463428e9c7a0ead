use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps passenger/contact data so it never shows up in `Debug` or `Display` output.
///
/// Serialization passes the real value through: API payloads need it, log lines must not.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl Masked<String> {
    /// Keeps the last `visible` characters, e.g. `*****6789` for a document number on an e-ticket.
    pub fn partial(&self, visible: usize) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= visible {
            return "*".repeat(chars.len());
        }
        let hidden = chars.len() - visible;
        let tail: String = chars[hidden..].iter().collect();
        format!("{}{}", "*".repeat(hidden), tail)
    }
}

/// `jane.doe@example.com` -> `j*******@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let mut chars = local.chars();
            let first = chars.next().unwrap_or('*');
            format!("{}{}@{}", first, "*".repeat(chars.count()), domain)
        }
        _ => "********".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_masked() {
        let passport = Masked::new("B1234567".to_string());
        assert_eq!(format!("{:?}", passport), "********");
        assert_eq!(format!("{}", passport), "********");
    }

    #[test]
    fn serialization_keeps_value() {
        let passport = Masked::new("B1234567".to_string());
        assert_eq!(serde_json::to_string(&passport).unwrap(), "\"B1234567\"");

        let back: Masked<String> = serde_json::from_str("\"C7654321\"").unwrap();
        assert_eq!(back.expose(), "C7654321");
    }

    #[test]
    fn partial_masking() {
        let id = Masked::new("079123456789".to_string());
        assert_eq!(id.partial(4), "********6789");
        assert_eq!(Masked::new("abc".to_string()).partial(4), "***");
    }

    #[test]
    fn email_masking() {
        assert_eq!(mask_email("jane@example.com"), "j***@example.com");
        assert_eq!(mask_email("not-an-email"), "********");
    }
}
