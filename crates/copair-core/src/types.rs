use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A contributor, keyed by canonical (trimmed, lowercased) email.
///
/// Equality, hashing and ordering look at the email only. The display name
/// is carried along for reporting.
///
/// # Examples
///
/// ```
/// use copair_core::Identity;
///
/// let a = Identity::new("Alice", "Alice@Example.com");
/// let b = Identity::new("alice smith", "alice@example.com");
/// assert_eq!(a, b);
/// assert_eq!(a.email(), "alice@example.com");
/// assert_eq!(b.display_name(), "alice smith");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    display_name: String,
    email: String,
}

impl Identity {
    /// Build an identity, canonicalising the email.
    pub fn new(display_name: impl Into<String>, email: &str) -> Self {
        Self {
            display_name: display_name.into(),
            email: canonical_email(email),
        }
    }

    /// Name shown in reports.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Canonical email, the identity key.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Same identity with another display name.
    pub fn with_display_name(self, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..self
        }
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.email.hash(state);
    }
}

impl PartialOrd for Identity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.email.cmp(&other.email)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.display_name, self.email)
    }
}

/// Lowercase and trim an email address.
///
/// # Examples
///
/// ```
/// use copair_core::canonical_email;
///
/// assert_eq!(canonical_email("  Bob@Example.ORG "), "bob@example.org");
/// ```
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Two distinct identities with no internal order.
///
/// The constructor sorts the members by email, so `(a, b)` and `(b, a)` build
/// the same pair. Self pairs cannot be constructed.
///
/// # Examples
///
/// ```
/// use copair_core::{Identity, UnorderedPair};
///
/// let a = Identity::new("A", "a@x.io");
/// let b = Identity::new("B", "b@x.io");
/// let ab = UnorderedPair::new(a.clone(), b.clone()).unwrap();
/// let ba = UnorderedPair::new(b, a.clone()).unwrap();
/// assert_eq!(ab, ba);
/// assert_eq!(ab.first().email(), "a@x.io");
/// assert!(UnorderedPair::new(a.clone(), a).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnorderedPair {
    first: Identity,
    second: Identity,
}

impl UnorderedPair {
    /// Pair two identities, or `None` if they share an email.
    pub fn new(a: Identity, b: Identity) -> Option<Self> {
        match a.cmp(&b) {
            Ordering::Less => Some(Self { first: a, second: b }),
            Ordering::Greater => Some(Self { first: b, second: a }),
            Ordering::Equal => None,
        }
    }

    /// Member with the smaller email.
    pub fn first(&self) -> &Identity {
        &self.first
    }

    /// Member with the larger email.
    pub fn second(&self) -> &Identity {
        &self.second
    }
}

/// Output format for reports.
///
/// # Examples
///
/// ```
/// use copair_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
