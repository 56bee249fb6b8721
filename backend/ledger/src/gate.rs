//! # Access Gate
//!
//! Protected views are only reachable with a bound identity. The decision is made
//! from the identity alone and is re-made on every request, since a session can
//! expire underneath a client at any time.
use crate::identity::Identity;

/// Where callers without an identity are sent.
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admit(Identity),
    Redirect(&'static str),
}

pub fn admit(identity: Option<Identity>) -> Admission {
    match identity {
        Some(identity) => Admission::Admit(identity),
        None => Admission::Redirect(LOGIN_PATH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Email;

    #[test]
    fn test_no_identity_redirects() {
        assert_eq!(admit(None), Admission::Redirect("/login"));
    }

    #[test]
    fn test_identity_admitted() {
        let identity = Identity::new(Email::parse("a@x.com").unwrap());

        assert_eq!(admit(Some(identity.clone())), Admission::Admit(identity));
    }
}
