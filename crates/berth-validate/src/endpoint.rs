//! HTTPS and SSH endpoint validation.

use std::net::{IpAddr, ToSocketAddrs};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Result type alias for validation.
pub type ValidateResult<T> = Result<T, ValidateError>;

/// Rejections name the rule and the host, never any credential material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("scheme must be https, got {0:?}")]
    SchemeNotHttps(String),

    #[error("url has no host: {0}")]
    MissingHost(String),

    #[error("endpoint must look like identity@host[:path], got {0:?}")]
    MalformedSshEndpoint(String),

    #[error("host {host:?} is {rule}; internal endpoints are not reachable from builds")]
    DisallowedHost { host: String, rule: &'static str },

    #[error("host {0:?} did not resolve; unresolvable endpoints are rejected")]
    Unresolvable(String),
}

/// Validate an HTTPS endpoint the build subsystem will fetch.
pub fn validate_https_endpoint(raw: &str) -> ValidateResult<()> {
    let parsed = Url::parse(raw).map_err(|_| ValidateError::InvalidUrl(raw.to_string()))?;
    if parsed.scheme() != "https" {
        return Err(ValidateError::SchemeNotHttps(parsed.scheme().to_string()));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| ValidateError::MissingHost(raw.to_string()))?;
    check_host(host, parsed.port().unwrap_or(443))
}

/// Validate an SSH endpoint of the form `identity@host[:path]`.
pub fn validate_ssh_endpoint(raw: &str) -> ValidateResult<()> {
    static SSH_FORM: OnceLock<Regex> = OnceLock::new();
    let re = SSH_FORM.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]+@([A-Za-z0-9.-]+)(?::(\S*))?$").unwrap()
    });
    let captures = re
        .captures(raw)
        .ok_or_else(|| ValidateError::MalformedSshEndpoint(raw.to_string()))?;
    let host = &captures[1];
    check_host(host, 22)
}

/// Reject a host that is, or resolves to, an internal address.
fn check_host(host: &str, port: u16) -> ValidateResult<()> {
    // IP literals are checked directly; `[...]` strips IPv6 brackets.
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return match disallowed_rule(ip) {
            Some(rule) => Err(ValidateError::DisallowedHost {
                host: host.to_string(),
                rule,
            }),
            None => Ok(()),
        };
    }

    // Hostnames must resolve, and every resolved address must be public.
    let addrs = (bare, port)
        .to_socket_addrs()
        .map_err(|_| ValidateError::Unresolvable(host.to_string()))?;
    let mut resolved_any = false;
    for addr in addrs {
        resolved_any = true;
        if let Some(rule) = disallowed_rule(addr.ip()) {
            return Err(ValidateError::DisallowedHost {
                host: host.to_string(),
                rule,
            });
        }
    }
    if !resolved_any {
        return Err(ValidateError::Unresolvable(host.to_string()));
    }
    Ok(())
}

/// The rejection rule an address falls under, if any.
fn disallowed_rule(ip: IpAddr) -> Option<&'static str> {
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_loopback() {
                Some("a loopback address")
            } else if v4.is_private() {
                Some("a private-range address")
            } else if v4.is_link_local() {
                Some("a link-local address")
            } else if v4.is_unspecified() {
                Some("the unspecified address")
            } else {
                None
            }
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return disallowed_rule(IpAddr::V4(mapped));
            }
            if v6.is_loopback() {
                Some("a loopback address")
            } else if v6.is_unspecified() {
                Some("the unspecified address")
            } else if (v6.segments()[0] & 0xffc0) == 0xfe80 {
                Some("a link-local address")
            } else if (v6.segments()[0] & 0xfe00) == 0xfc00 {
                Some("a unique-local address")
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 203.0.113.0/24 and 93.184.216.34 are public; no DNS needed for literals.

    #[test]
    fn https_public_literal_is_accepted() {
        assert!(validate_https_endpoint("https://93.184.216.34/repo.git").is_ok());
        assert!(validate_https_endpoint("https://203.0.113.10:8443/x").is_ok());
    }

    #[test]
    fn non_tls_scheme_is_rejected() {
        let err = validate_https_endpoint("http://93.184.216.34/repo.git").unwrap_err();
        assert_eq!(err, ValidateError::SchemeNotHttps("http".to_string()));
    }

    #[test]
    fn loopback_and_private_literals_are_rejected_regardless_of_scheme() {
        for host in ["127.0.0.1", "10.0.0.5", "192.168.1.10", "172.16.0.1", "169.254.1.1"] {
            let err = validate_https_endpoint(&format!("https://{host}/x")).unwrap_err();
            assert!(
                matches!(err, ValidateError::DisallowedHost { .. }),
                "{host} should be disallowed, got {err:?}"
            );
        }
    }

    #[test]
    fn localhost_resolves_to_loopback_and_is_rejected() {
        let err = validate_https_endpoint("https://localhost/x").unwrap_err();
        // Resolution either lands on loopback or fails outright; both reject.
        assert!(matches!(
            err,
            ValidateError::DisallowedHost { .. } | ValidateError::Unresolvable(_)
        ));
    }

    #[test]
    fn ipv6_internal_ranges_are_rejected() {
        for host in ["[::1]", "[fe80::1]", "[fc00::1]", "[::ffff:10.0.0.5]"] {
            let err = validate_https_endpoint(&format!("https://{host}/x")).unwrap_err();
            assert!(
                matches!(err, ValidateError::DisallowedHost { .. }),
                "{host} should be disallowed, got {err:?}"
            );
        }
    }

    #[test]
    fn garbage_url_is_rejected() {
        assert!(matches!(
            validate_https_endpoint("not a url"),
            Err(ValidateError::InvalidUrl(_))
        ));
    }

    #[test]
    fn ssh_form_is_enforced() {
        assert!(validate_ssh_endpoint("git@203.0.113.10:org/repo.git").is_ok());
        assert!(validate_ssh_endpoint("deploy@203.0.113.10").is_ok());

        for bad in ["no-identity.example.com", "@host", "git@", "a b@host"] {
            assert!(
                matches!(
                    validate_ssh_endpoint(bad),
                    Err(ValidateError::MalformedSshEndpoint(_))
                ),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn ssh_host_gets_the_same_rejection() {
        let err = validate_ssh_endpoint("git@10.0.0.5:org/repo.git").unwrap_err();
        assert!(matches!(err, ValidateError::DisallowedHost { .. }));
    }

    #[test]
    fn rejection_message_names_the_rule_not_a_secret() {
        let err = validate_https_endpoint("https://10.0.0.5/x").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("private-range"));
        assert!(msg.contains("10.0.0.5"));
    }
}
