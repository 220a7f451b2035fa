//! Validated value types shared across the registry crates.
//!
//! Each type can only be constructed through a checking constructor, so holding one is proof
//! that the wrapped text already satisfies the rules the database and the API rely on.

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    #[error("must be at least {min} characters")]
    TooShort { min: usize },
    #[error("must be at most {max} characters")]
    TooLong { max: usize },
    #[error("value is not a valid email address: {0}")]
    InvalidEmail(&'static str),
    #[error("phone number must be 7 to 20 digits with an optional leading '+'")]
    InvalidPhoneNumber,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A patient's full name: trimmed, between 2 and 150 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName(NonEmptyText);

impl FullName {
    pub const MIN_CHARS: usize = 2;
    pub const MAX_CHARS: usize = 150;

    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let text = NonEmptyText::new(input)?;
        let len = text.as_str().chars().count();
        if len < Self::MIN_CHARS {
            return Err(TextError::TooShort {
                min: Self::MIN_CHARS,
            });
        }
        if len > Self::MAX_CHARS {
            return Err(TextError::TooLong {
                max: Self::MAX_CHARS,
            });
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// A syntactically valid email address.
///
/// The check is deliberately conservative: one `@`, a dot-atom local part of at most 64
/// characters and a dotted domain whose labels are alphanumeric or hyphenated. The domain is
/// lowercased; the local part is kept as supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub const MAX_LEN: usize = 320;
    const MAX_LOCAL_LEN: usize = 64;

    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(TextError::Empty);
        }
        if input.len() > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }

        let (local, domain) = input
            .split_once('@')
            .ok_or(TextError::InvalidEmail("missing '@'"))?;

        if local.is_empty() || local.len() > Self::MAX_LOCAL_LEN {
            return Err(TextError::InvalidEmail("invalid local part length"));
        }
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return Err(TextError::InvalidEmail("misplaced '.' in local part"));
        }
        let local_ok = local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+/=?^_`{|}~.-".contains(&b));
        if !local_ok {
            return Err(TextError::InvalidEmail("invalid character in local part"));
        }

        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 {
            return Err(TextError::InvalidEmail("domain must contain a '.'"));
        }
        for label in &labels {
            let valid = !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-');
            if !valid {
                return Err(TextError::InvalidEmail("invalid domain label"));
            }
        }
        let tld = labels[labels.len() - 1];
        if tld.len() < 2 || !tld.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(TextError::InvalidEmail("invalid top-level domain"));
        }

        Ok(Self(format!("{}@{}", local, domain.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A phone number in loose international form: optional `+` followed by 7–20 ASCII digits, at
/// most 20 characters in total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const MIN_DIGITS: usize = 7;
    pub const MAX_DIGITS: usize = 20;
    pub const MAX_CHARS: usize = 20;

    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref().trim();
        if input.is_empty() {
            return Err(TextError::Empty);
        }
        let digits = input.strip_prefix('+').unwrap_or(input);
        let ok = input.len() <= Self::MAX_CHARS
            && (Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len())
            && digits.bytes().all(|b| b.is_ascii_digit());
        if !ok {
            return Err(TextError::InvalidPhoneNumber);
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! text_impls {
    ($ty:ident, $ctor:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ty::$ctor(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

text_impls!(NonEmptyText, new);
text_impls!(FullName, new);
text_impls!(EmailAddress, parse);
text_impls!(PhoneNumber, parse);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  hi ").unwrap().as_str(), "hi");
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn full_name_bounds() {
        assert!(FullName::new("Juan Perez").is_ok());
        assert_eq!(FullName::new("J"), Err(TextError::TooShort { min: 2 }));
        assert_eq!(
            FullName::new("x".repeat(151)),
            Err(TextError::TooLong { max: 150 })
        );
        // Multi-byte characters count once.
        assert!(FullName::new("Ñá").is_ok());
    }

    #[test]
    fn email_accepts_common_addresses() {
        let email = EmailAddress::parse("juan.perez@example.com").unwrap();
        assert_eq!(email.as_str(), "juan.perez@example.com");

        let email = EmailAddress::parse("First+tag@Mail.Example.ORG").unwrap();
        assert_eq!(email.as_str(), "First+tag@mail.example.org");
    }

    #[test]
    fn email_rejects_malformed_addresses() {
        for bad in [
            "not-an-email",
            "@example.com",
            "juan@",
            "juan@localhost",
            "juan..perez@example.com",
            "juan@exa mple.com",
            "juan@-example.com",
            "juan@example.c0m",
            "a@b@example.com",
        ] {
            assert!(EmailAddress::parse(bad).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn phone_number_format() {
        assert!(PhoneNumber::parse("+5491133344455").is_ok());
        assert!(PhoneNumber::parse("1234567").is_ok());
        assert_eq!(
            PhoneNumber::parse("11-2233-4455"),
            Err(TextError::InvalidPhoneNumber)
        );
        assert_eq!(
            PhoneNumber::parse("+123456"),
            Err(TextError::InvalidPhoneNumber)
        );
        assert_eq!(
            PhoneNumber::parse("1".repeat(21)),
            Err(TextError::InvalidPhoneNumber)
        );
        assert!(PhoneNumber::parse(format!("+{}", "1".repeat(19))).is_ok());
        assert_eq!(
            PhoneNumber::parse(format!("+{}", "1".repeat(20))),
            Err(TextError::InvalidPhoneNumber)
        );
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<EmailAddress, _> = serde_json::from_str("\"a@example.com\"");
        assert!(ok.is_ok());
        let bad: Result<PhoneNumber, _> = serde_json::from_str("\"abc\"");
        assert!(bad.is_err());
    }
}
