//! Named payment gateway variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which payment provider an order or event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GatewayKind {
    Stripe,
    /// Any other provider, kept by its lowercase tag.
    Other(String),
}

impl GatewayKind {
    /// Tag stored on orders and processed events.
    pub fn as_str(&self) -> &str {
        match self {
            GatewayKind::Stripe => "stripe",
            GatewayKind::Other(tag) => tag,
        }
    }

    /// Human name used in audit notes, e.g. `Stripe`.
    pub fn display_name(&self) -> String {
        match self {
            GatewayKind::Stripe => "Stripe".to_string(),
            GatewayKind::Other(tag) => {
                let mut chars = tag.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

impl From<&str> for GatewayKind {
    fn from(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        match tag.as_str() {
            "stripe" => GatewayKind::Stripe,
            _ => GatewayKind::Other(tag),
        }
    }
}

impl From<String> for GatewayKind {
    fn from(tag: String) -> Self {
        GatewayKind::from(tag.as_str())
    }
}

impl From<GatewayKind> for String {
    fn from(kind: GatewayKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_unknown_tags() {
        assert_eq!(GatewayKind::from("Stripe"), GatewayKind::Stripe);
        assert_eq!(GatewayKind::from("paypal"), GatewayKind::Other("paypal".into()));
    }

    #[test]
    fn display_name_capitalizes() {
        assert_eq!(GatewayKind::Stripe.display_name(), "Stripe");
        assert_eq!(GatewayKind::from("paypal").display_name(), "Paypal");
    }

    #[test]
    fn serializes_as_tag() {
        assert_eq!(serde_json::to_string(&GatewayKind::Stripe).unwrap(), "\"stripe\"");
        let kind: GatewayKind = serde_json::from_str("\"check\"").unwrap();
        assert_eq!(kind.as_str(), "check");
    }
}
