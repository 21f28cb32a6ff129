//! # Authenticator (C10)
//!
//! Applies a [`Credential`] to an outbound request according to the spec's
//! declared security schemes, including passthrough-credential selection.
//!
//! Grounded on the teacher's `security::SecurityProvider` shape
//! (`validate(scheme, scopes, req) -> bool`) and `RemoteApiKeyProvider`'s
//! credential-to-header mapping, generalized from *validating inbound*
//! requests against a declared scheme to *synthesizing outbound* requests
//! that satisfy one.

use crate::config::PassthroughMode;
use crate::error::{CoreError, CoreResult};
use crate::spec::SecurityScheme;
use std::collections::HashMap;
use std::fmt;

/// Where an API-key credential is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

/// A tagged credential variant, per spec §3. `Debug` redacts secret material
/// so credentials are never logged (spec §5's "credentials are never
/// logged" invariant).
#[derive(Clone)]
pub enum Credential {
    None,
    Token(String),
    ApiKey {
        value: String,
        header_name: String,
        location: ApiKeyLocation,
    },
    Basic {
        user: String,
        pass: String,
    },
    Bearer(String),
    OAuth {
        access_token: String,
    },
    Custom(HashMap<String, String>),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::None => write!(f, "Credential::None"),
            Credential::Token(_) => write!(f, "Credential::Token(***)"),
            Credential::ApiKey { header_name, location, .. } => {
                write!(f, "Credential::ApiKey({header_name}, {location:?}, ***)")
            }
            Credential::Basic { user, .. } => write!(f, "Credential::Basic({user}, ***)"),
            Credential::Bearer(_) => write!(f, "Credential::Bearer(***)"),
            Credential::OAuth { .. } => write!(f, "Credential::OAuth(***)"),
            Credential::Custom(map) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                write!(f, "Credential::Custom({keys:?} -> ***)")
            }
        }
    }
}

/// A piece of an outbound request the authenticator mutates: header
/// insertions, appended query parameters, and (for cookie-location API keys)
/// a `Cookie` header contribution. Kept transport-agnostic so C11's
/// `reqwest::RequestBuilder` and C5's discovery fetches can both consume it.
#[derive(Debug, Clone, Default)]
pub struct AuthApplication {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl AuthApplication {
    fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        AuthApplication {
            headers: vec![(name.into(), value.into())],
            query: vec![],
        }
    }
}

/// Apply `credential` to an outbound request, choosing the scheme by shape
/// when `security_schemes` is empty, or the first scheme the credential can
/// satisfy when schemes are supplied.
pub fn apply(
    credential: &Credential,
    security_schemes: &[SecurityScheme],
) -> CoreResult<AuthApplication> {
    if let Some(scheme) = security_schemes
        .iter()
        .find(|s| credential_satisfies(credential, s))
    {
        return Ok(apply_for_scheme(credential, scheme));
    }
    apply_by_shape(credential)
}

fn credential_satisfies(credential: &Credential, scheme: &SecurityScheme) -> bool {
    matches!(
        (credential, scheme),
        (Credential::ApiKey { .. }, SecurityScheme::ApiKey { .. })
            | (Credential::Basic { .. }, SecurityScheme::Http { scheme: s, .. } if s == "basic")
            | (Credential::Bearer(_), SecurityScheme::Http { scheme: s, .. } if s == "bearer")
            | (Credential::Token(_), SecurityScheme::Http { scheme: s, .. } if s == "bearer")
            | (Credential::OAuth { .. }, SecurityScheme::OAuth2 { .. })
            | (Credential::OAuth { .. }, SecurityScheme::OpenIdConnect { .. })
    )
}

fn apply_for_scheme(credential: &Credential, scheme: &SecurityScheme) -> AuthApplication {
    match (credential, scheme) {
        (Credential::ApiKey { value, header_name, location }, SecurityScheme::ApiKey { name, .. }) => {
            let effective_name = if name.is_empty() { header_name.as_str() } else { name.as_str() };
            match location {
                ApiKeyLocation::Header => AuthApplication::header(effective_name, value.clone()),
                ApiKeyLocation::Query => AuthApplication {
                    headers: vec![],
                    query: vec![(effective_name.to_string(), value.clone())],
                },
                ApiKeyLocation::Cookie => AuthApplication::header(
                    "Cookie",
                    format!("{effective_name}={value}"),
                ),
            }
        }
        _ => apply_by_shape(credential).unwrap_or_default(),
    }
}

fn apply_by_shape(credential: &Credential) -> CoreResult<AuthApplication> {
    match credential {
        Credential::None => Ok(AuthApplication::default()),
        Credential::Token(v) | Credential::Bearer(v) => {
            Ok(AuthApplication::header("Authorization", format!("Bearer {v}")))
        }
        Credential::OAuth { access_token } => {
            Ok(AuthApplication::header("Authorization", format!("Bearer {access_token}")))
        }
        Credential::ApiKey { value, header_name, location } => Ok(match location {
            ApiKeyLocation::Header => AuthApplication::header(header_name.clone(), value.clone()),
            ApiKeyLocation::Query => AuthApplication {
                headers: vec![],
                query: vec![(header_name.clone(), value.clone())],
            },
            ApiKeyLocation::Cookie => {
                AuthApplication::header("Cookie", format!("{header_name}={value}"))
            }
        }),
        Credential::Basic { user, pass } => {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            Ok(AuthApplication::header("Authorization", format!("Basic {encoded}")))
        }
        Credential::Custom(map) => Ok(AuthApplication {
            headers: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            query: vec![],
        }),
    }
}

/// Resolve which credential to apply when a passthrough (tool-specific)
/// credential may override the bound service credential, per spec §4.10.
/// `fallback_to_service` gates the `Optional`/`Hybrid` no-passthrough case:
/// only when it's `true` does the stored credential stand in for a missing
/// passthrough; otherwise the absence is an authentication failure.
pub fn select_credential<'a>(
    service_credential: &'a Credential,
    passthrough: Option<&'a Credential>,
    policy: PassthroughMode,
    fallback_to_service: bool,
) -> CoreResult<&'a Credential> {
    match (policy, passthrough) {
        (PassthroughMode::Required, Some(c)) => Ok(c),
        (PassthroughMode::Required, None) => Err(CoreError::AuthenticationFailed),
        (PassthroughMode::Disabled, _) => Ok(service_credential),
        (PassthroughMode::Optional | PassthroughMode::Hybrid, Some(c)) => Ok(c),
        (PassthroughMode::Optional | PassthroughMode::Hybrid, None) if fallback_to_service => {
            Ok(service_credential)
        }
        (PassthroughMode::Optional | PassthroughMode::Hybrid, None) => Err(CoreError::AuthenticationFailed),
    }
}

/// Convert the spec's `components.securitySchemes` into the authenticator's
/// internal list, dropping unsupported scheme kinds rather than failing.
#[must_use]
pub fn extract_security_schemes(schemes: &HashMap<String, SecurityScheme>) -> Vec<SecurityScheme> {
    schemes.values().cloned().collect()
}
