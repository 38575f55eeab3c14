//! Module dedicated to email addresses.

use std::fmt;

/// An email address with an optional display name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Address {
    /// The optional display name.
    pub name: Option<String>,

    /// The address itself, for example `alice@localhost`.
    pub addr: String,
}

impl Address {
    pub fn new(addr: impl ToString) -> Self {
        Self {
            name: None,
            addr: addr.to_string(),
        }
    }

    pub fn new_with_name(name: impl ToString, addr: impl ToString) -> Self {
        Self {
            name: Some(name.to_string()),
            addr: addr.to_string(),
        }
    }

    /// Returns the display name, if not blank.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Returns `true` if both addresses are the same, ignoring ASCII
    /// case and display names.
    pub fn matches(&self, other: &Address) -> bool {
        self.addr.trim().eq_ignore_ascii_case(other.addr.trim())
    }

    /// Returns the local part of the address, if any.
    pub fn local_part(&self) -> Option<&str> {
        self.addr.trim().rsplit_once('@').map(|(local, _)| local)
    }

    /// Returns the domain part of the address, if any.
    pub fn domain(&self) -> Option<&str> {
        self.addr.trim().rsplit_once('@').map(|(_, domain)| domain)
    }

    pub(crate) fn from_parsed(addr: &mail_parser::Addr) -> Option<Self> {
        let email = addr.address.as_ref()?.trim();

        if email.is_empty() {
            return None;
        }

        Some(Self {
            name: addr.name.as_ref().map(|name| name.to_string()),
            addr: email.to_owned(),
        })
    }

    pub(crate) fn from_parsed_list(addrs: Option<&mail_parser::Address>) -> Vec<Self> {
        match addrs {
            Some(mail_parser::Address::List(addrs)) => {
                addrs.iter().filter_map(Self::from_parsed).collect()
            }
            Some(mail_parser::Address::Group(groups)) => groups
                .iter()
                .flat_map(|group| group.addresses.iter())
                .filter_map(Self::from_parsed)
                .collect(),
            None => Vec::new(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name:?} <{}>", self.addr),
            None => write!(f, "{}", self.addr),
        }
    }
}

impl From<&str> for Address {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

impl From<String> for Address {
    fn from(addr: String) -> Self {
        Self::new(addr)
    }
}

impl<N: ToString, A: ToString> From<(N, A)> for Address {
    fn from((name, addr): (N, A)) -> Self {
        Self::new_with_name(name, addr)
    }
}
