//! Portal-specific discovery patterns (C5 strategy 6, multi-API mode only).
//!
//! Each profile supplies glob-like path patterns; a `*` segment is expanded
//! by substituting a fixed list of common path segments.

const WILDCARD_SEGMENTS: &[&str] = &[
    "v1", "v2", "v3", "platform", "core", "admin", "public", "private", "rest", "graphql",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalProfile {
    Harness,
    Aws,
    Azure,
    Google,
    Kubernetes,
    Generic,
}

impl PortalProfile {
    /// Dispatch a host to a profile by regex-free substring matching on
    /// well-known portal domain fragments.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        let h = host.to_ascii_lowercase();
        if h.contains("harness.io") {
            PortalProfile::Harness
        } else if h.contains("amazonaws.com") || h.contains("aws.amazon.com") {
            PortalProfile::Aws
        } else if h.contains("azure.com") || h.contains("azure-api.net") {
            PortalProfile::Azure
        } else if h.contains("googleapis.com") || h.contains("cloud.google.com") {
            PortalProfile::Google
        } else if h.contains("k8s.io") || h.contains("kubernetes") {
            PortalProfile::Kubernetes
        } else {
            PortalProfile::Generic
        }
    }

    fn glob_patterns(self) -> &'static [&'static str] {
        match self {
            PortalProfile::Harness => &["/gateway/*/openapi.json", "/ng/api/*/swagger.json"],
            PortalProfile::Aws => &["/restapis/*/stages/*/openapi", "/v2/*/openapi.json"],
            PortalProfile::Azure => &["/*/swagger/v1/swagger.json", "/*/openapi.json"],
            PortalProfile::Google => &["/discovery/v1/apis/*/rest", "/*/openapi.json"],
            PortalProfile::Kubernetes => &["/openapi/v2", "/openapi/v3/*"],
            PortalProfile::Generic => &["/*/openapi.json", "/*/swagger.json", "/api/*/openapi.json"],
        }
    }

    /// Expand this profile's glob patterns against [`WILDCARD_SEGMENTS`],
    /// producing concrete candidate paths in declaration order.
    #[must_use]
    pub fn expand_candidates(self) -> Vec<String> {
        let mut out = Vec::new();
        for pattern in self.glob_patterns() {
            if pattern.contains('*') {
                for segment in WILDCARD_SEGMENTS {
                    out.push(pattern.replacen('*', segment, 1));
                }
            } else {
                out.push((*pattern).to_string());
            }
        }
        out
    }
}
