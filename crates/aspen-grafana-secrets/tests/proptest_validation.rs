//! Property-based tests for configuration and role validation.
//!
//! Tests cover invariants for:
//! - URL normalization of stored configurations
//! - Rejection of invalid configuration writes
//! - TTL bounds on role writes
//! - Role name canonicalization

use aspen_grafana_secrets::DEFAULT_GRAFANA_CLOUD_URL;
use aspen_grafana_secrets::GrafanaConfig;
use aspen_grafana_secrets::PlatformKind;
use aspen_grafana_secrets::RoleEntry;
use aspen_grafana_secrets::RoleKind;
use aspen_grafana_secrets::role::validate_role_name;
use proptest::prelude::*;

// =============================================================================
// Generators
// =============================================================================

/// Generate an absolute http(s) URL with mixed case and optional trailing slash.
fn base_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("http"), Just("https"), Just("HTTPS")],
        "[a-zA-Z][a-zA-Z0-9]{0,10}(\\.[a-zA-Z]{2,5}){0,2}",
        proptest::option::of(1024u16..65535),
        "(/[a-zA-Z0-9]{1,8}){0,2}",
        proptest::bool::ANY,
    )
        .prop_map(|(scheme, host, port, path, trailing)| {
            let port = port.map(|p| format!(":{p}")).unwrap_or_default();
            let slash = if trailing { "/" } else { "" };
            format!("{scheme}://{host}{port}{path}{slash}")
        })
}

fn token() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_=]{1,64}"
}

// =============================================================================
// Configuration Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Stored URLs are lower case without a trailing slash.
    #[test]
    fn test_proptest_url_normalized(url in base_url(), token in token()) {
        let config = GrafanaConfig::new("grafana", &token, &url).unwrap();

        prop_assert_eq!(config.kind, PlatformKind::Instance);
        prop_assert_eq!(&config.token, &token);
        prop_assert_eq!(config.url.clone(), url.to_lowercase().trim_end_matches('/').to_string());
        prop_assert!(!config.url.ends_with('/'));
    }

    /// Normalization is idempotent: a stored URL validates to itself.
    #[test]
    fn test_proptest_normalization_idempotent(url in base_url()) {
        let once = GrafanaConfig::new("grafana", "t", &url).unwrap();
        let twice = GrafanaConfig::new("grafana", "t", &once.url).unwrap();
        prop_assert_eq!(once.url, twice.url);
    }

    /// Cloud configurations without a URL get the default.
    #[test]
    fn test_proptest_cloud_default_url(token in token()) {
        let config = GrafanaConfig::new("cloud", &token, "").unwrap();
        prop_assert_eq!(config.url, DEFAULT_GRAFANA_CLOUD_URL);
    }

    /// Unknown kinds are rejected regardless of the other fields.
    #[test]
    fn test_proptest_unknown_kind_rejected(kind in "[a-z]{1,12}", url in base_url(), token in token()) {
        prop_assume!(kind != "cloud" && kind != "grafana");
        prop_assert!(GrafanaConfig::new(&kind, &token, &url).is_err());
    }

    /// Relative or non-http URLs are rejected for instances.
    #[test]
    fn test_proptest_relative_url_rejected(path in "/?[a-z0-9]{1,12}(/[a-z0-9]{1,8}){0,2}") {
        prop_assert!(GrafanaConfig::new("grafana", "t", &path).is_err());
    }
}

// =============================================================================
// Role Invariants
// =============================================================================

fn service_account_role(ttl_secs: u64, max_ttl_secs: u64) -> RoleEntry {
    let mut role = RoleEntry::new("sa", RoleKind::ServiceAccount);
    role.role = "Viewer".into();
    role.stack = "acme".into();
    role.ttl_secs = ttl_secs;
    role.max_ttl_secs = max_ttl_secs;
    role
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// `ttl > max_ttl` is rejected only when both are set.
    #[test]
    fn test_proptest_ttl_bounds(ttl in 0u64..100_000, max_ttl in 0u64..100_000) {
        let result = service_account_role(ttl, max_ttl).validate(Some(PlatformKind::Cloud));
        let should_reject = ttl > 0 && max_ttl > 0 && ttl > max_ttl;
        prop_assert_eq!(result.is_err(), should_reject);
    }

    /// Valid names canonicalize to lower case and stay valid.
    #[test]
    fn test_proptest_role_name_lowercased(name in "[a-zA-Z0-9_]([a-zA-Z0-9_.-]{0,30}[a-zA-Z0-9_])?") {
        let canonical = validate_role_name(&name).unwrap();
        prop_assert_eq!(&canonical, &name.to_lowercase());
        prop_assert_eq!(validate_role_name(&canonical).unwrap(), canonical);
    }

    /// Names with separators never become storage paths.
    #[test]
    fn test_proptest_role_name_rejects_slashes(prefix in "[a-z]{1,8}", suffix in "[a-z]{1,8}") {
        let name = format!("{prefix}/{suffix}");
        prop_assert!(validate_role_name(&name).is_err());
    }
}
