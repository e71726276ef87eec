//! Ready-made test data.

use launchpad_mail::{Address, HandlebarsEngine, MessageTemplate, Tag};

/// Sender used by every fixture.
pub const SENDER: &str = "Launchpad <hello@launchpad.dev>";

/// Parse an address, panicking on invalid input.
pub fn address(email: &str) -> Address {
    Address::parse(email).unwrap_or_else(|e| panic!("invalid fixture address {email}: {e}"))
}

/// `count` distinct addresses: `user0@example.com`, `user1@example.com`, ...
pub fn recipients(count: usize) -> Vec<Address> {
    (0..count)
        .map(|i| address(&format!("user{i}@example.com")))
        .collect()
}

/// The same addresses as [`recipients`], as raw JSON strings.
pub fn raw_recipients(count: usize) -> Vec<serde_json::Value> {
    (0..count)
        .map(|i| serde_json::Value::String(format!("user{i}@example.com")))
        .collect()
}

/// A campaign-level message.
pub fn template() -> MessageTemplate {
    MessageTemplate::builder()
        .from(address(SENDER))
        .subject("Launchpad is live")
        .html("<h1>We're live</h1>")
        .text("We're live")
        .tag(Tag::new("campaign", "launch").unwrap_or_else(|e| panic!("{e}")))
        .build()
        .unwrap_or_else(|e| panic!("invalid fixture template: {e}"))
}

/// Template engine with built-ins and the variables they need.
pub fn engine() -> HandlebarsEngine {
    HandlebarsEngine::with_builtins()
        .unwrap_or_else(|e| panic!("built-in templates failed to compile: {e}"))
        .with_default("product_name", "Launchpad")
        .with_default("launch_url", "https://launchpad.dev")
}
