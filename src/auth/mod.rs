//! Authentication module
//!
//! DHIS2 accepts HTTP Basic authentication on every API route. `Credentials`
//! holds the username/password pair and attaches it to outgoing requests.

mod credentials;

pub use credentials::Credentials;

#[cfg(test)]
mod tests;
