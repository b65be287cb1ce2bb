//! Common validation utilities.

use validator::{ValidateEmail, ValidationError};

/// A parsed mailbox: optional display name plus a normalized address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub address: String,
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{}\" <{}>", name.replace('"', ""), self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Parses a bare address (`a@example.com`) or a named mailbox
/// (`Ada <a@example.com>`).
///
/// The address part is trimmed and lowercased. Returns `None` when the
/// input is blank or the address is not syntactically valid.
pub fn parse_mailbox(raw: &str) -> Option<Mailbox> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (name, address) = match (trimmed.rfind('<'), trimmed.ends_with('>')) {
        (Some(open), true) => {
            let name = trimmed[..open].trim().trim_matches('"').trim();
            let address = &trimmed[open + 1..trimmed.len() - 1];
            let name = (!name.is_empty()).then(|| name.to_string());
            (name, address)
        }
        _ => (None, trimmed),
    };

    let address = address.trim().to_lowercase();
    if address.is_empty() || !address.validate_email() {
        return None;
    }

    Some(Mailbox { name, address })
}

/// Normalizes an email address to its trimmed, lowercase form.
pub fn normalize_email(raw: &str) -> Option<String> {
    parse_mailbox(raw).map(|mailbox| mailbox.address)
}

/// Validator hook for a four digit year such as `1987`.
pub fn validate_birth_year(year: &str) -> Result<(), ValidationError> {
    if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("birth_year_format");
        err.message = Some("Birth year must be four digits".into());
        Err(err)
    }
}
