//! Module dedicated to the transport settings.
//!
//! Settings are not tied to an account: they hold the return-path
//! mapping applied to every outgoing message.

use std::collections::HashMap;

use tracing::debug;

use crate::email::Address;

/// The transport settings.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
    feature = "derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case", default)
)]
pub struct Settings {
    /// The mapping from sender domain to return-path domain.
    pub return_paths: Option<HashMap<String, String>>,
}

impl Settings {
    /// Finds the return-path domain configured for the given sender
    /// domain.
    ///
    /// An exact key match wins. Otherwise keys are compared
    /// case-insensitively, and among keys differing only by case the
    /// smallest one wins.
    pub fn find_return_path_domain(&self, domain: &str) -> Option<&str> {
        let return_paths = self.return_paths.as_ref()?;
        let domain = domain.trim();

        let return_path_domain = return_paths.get(domain).or_else(|| {
            return_paths
                .iter()
                .filter(|(sender_domain, _)| sender_domain.trim().eq_ignore_ascii_case(domain))
                .min_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, return_path_domain)| return_path_domain)
        })?;

        Some(return_path_domain.trim()).filter(|domain| !domain.is_empty())
    }

    /// Returns the envelope sender address for the given sender.
    ///
    /// The local part is kept and the domain is replaced by the
    /// matching return-path domain, if any.
    pub fn apply_return_path(&self, sender: &Address) -> String {
        let return_path_domain = sender
            .domain()
            .and_then(|domain| self.find_return_path_domain(domain));

        match (sender.local_part(), return_path_domain) {
            (Some(local), Some(domain)) => {
                let return_path = format!("{local}@{domain}");
                debug!("using return path {return_path} for sender {}", sender.addr);
                return_path
            }
            _ => sender.addr.trim().to_owned(),
        }
    }
}
