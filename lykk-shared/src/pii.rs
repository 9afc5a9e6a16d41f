use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for contact data (emails, phone numbers) that must not leak into logs.
///
/// `Debug` and `Display` render a partially masked form so log lines stay useful
/// for support ("j***@example.com"), while `Serialize` emits the real value
/// because API responses need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    pub fn masked(&self) -> String {
        mask(self.0.as_ref())
    }
}

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked({})", self.masked())
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
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

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

/// Emails keep their first character and domain, everything else keeps the last
/// two characters.
fn mask(value: &str) -> String {
    if let Some((local, domain)) = value.split_once('@') {
        let first: String = local.chars().take(1).collect();
        return format!("{}***@{}", first, domain);
    }

    let count = value.chars().count();
    if count <= 2 {
        return "*".repeat(count);
    }
    let tail: String = value.chars().skip(count - 2).collect();
    format!("{}{}", "*".repeat(count - 2), tail)
}
