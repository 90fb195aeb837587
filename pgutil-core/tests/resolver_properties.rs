//! Property-based tests for credential resolution precedence.
//!
//! These verify, over arbitrary inputs, that:
//! - a non-empty explicit value always beats the environment
//! - the environment always beats the built-in defaults
//! - a supplied password never triggers the prompt or the credential file

#![allow(clippy::unwrap_used)]

use pgutil_core::config::{DEFAULT_HOST, DEFAULT_PORT, PartialConfig};
use pgutil_core::credentials::{CredentialResolver, PgPassFile};
use pgutil_core::{PgUtilError, ValueSource};
use proptest::prelude::*;
use std::collections::HashMap;

fn arb_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.-]{1,16}"
}

fn arb_optional_value() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), Just(Some(String::new())), arb_value().prop_map(Some)]
}

fn resolver_over(
    env: HashMap<String, String>,
) -> CredentialResolver<HashMap<String, String>, fn(&str) -> pgutil_core::Result<String>> {
    fn refuse(_: &str) -> pgutil_core::Result<String> {
        Err(PgUtilError::configuration("prompt must not be reached"))
    }

    CredentialResolver::new(env, refuse as fn(&str) -> pgutil_core::Result<String>)
        .with_pgpass(PgPassFile::at("/nonexistent/pgutil-properties/.pgpass"))
}

proptest! {
    #[test]
    fn prop_host_precedence(
        explicit in arb_optional_value(),
        from_env in arb_optional_value(),
    ) {
        let mut env = HashMap::from([
            ("PGDATABASE".to_string(), "db".to_string()),
            ("PGPASSWORD".to_string(), "pw".to_string()),
        ]);
        if let Some(host) = &from_env {
            env.insert("PGHOST".to_string(), host.clone());
        }
        let mut partial = PartialConfig::new();
        if let Some(host) = &explicit {
            partial = partial.with_host(host.clone());
        }

        let descriptor = resolver_over(env).resolve(&partial).unwrap();

        match (explicit.filter(|h| !h.is_empty()), from_env.filter(|h| !h.is_empty())) {
            (Some(host), _) => {
                prop_assert_eq!(&descriptor.host, &host);
                prop_assert_eq!(&descriptor.sources.host, &ValueSource::Explicit);
            }
            (None, Some(host)) => {
                prop_assert_eq!(&descriptor.host, &host);
                prop_assert_eq!(
                    &descriptor.sources.host,
                    &ValueSource::Environment("PGHOST".to_string())
                );
            }
            (None, None) => {
                prop_assert_eq!(descriptor.host.as_str(), DEFAULT_HOST);
                prop_assert_eq!(&descriptor.sources.host, &ValueSource::Default);
            }
        }
    }

    #[test]
    fn prop_port_precedence(
        explicit in any::<u16>(),
        from_env in proptest::option::of(any::<u16>()),
    ) {
        let mut env = HashMap::from([
            ("PGDATABASE".to_string(), "db".to_string()),
            ("PGPASSWORD".to_string(), "pw".to_string()),
        ]);
        if let Some(port) = from_env {
            env.insert("PGPORT".to_string(), port.to_string());
        }

        let descriptor = resolver_over(env)
            .resolve(&PartialConfig::new().with_port(explicit))
            .unwrap();

        let expected = if explicit > 0 {
            explicit
        } else {
            from_env.filter(|port| *port > 0).unwrap_or(DEFAULT_PORT)
        };
        prop_assert_eq!(descriptor.port, expected);
    }

    #[test]
    fn prop_supplied_password_is_used_verbatim(
        password in "\\PC{1,32}",
        via_env in any::<bool>(),
        no_prompt in any::<bool>(),
    ) {
        let mut env = HashMap::from([
            ("PGDATABASE".to_string(), "db".to_string()),
            ("PGUSER".to_string(), "c42".to_string()),
        ]);
        let mut partial = PartialConfig::new();
        if via_env {
            env.insert("PGPASSWORD".to_string(), password.clone());
        } else {
            partial = partial.with_password(password.clone());
        }
        if no_prompt {
            partial = partial.without_password_prompt();
        }

        let descriptor = resolver_over(env).resolve(&partial).unwrap();

        prop_assert_eq!(descriptor.password(), password.as_str());
        prop_assert_eq!(descriptor.sources.password != ValueSource::Explicit, via_env);
    }

    #[test]
    fn prop_connection_string_shape(
        user in arb_value(),
        host in arb_value(),
        database in arb_value(),
        options in arb_optional_value(),
    ) {
        let mut partial = PartialConfig::new()
            .with_user(user.clone())
            .with_host(host.clone())
            .with_database(database.clone())
            .with_password("pw");
        if let Some(options) = &options {
            partial = partial.with_options(options.clone());
        }

        let descriptor = resolver_over(HashMap::new()).resolve(&partial).unwrap();
        let base = format!("user={user} host={host} dbname={database} password=pw");

        match options.filter(|o| !o.is_empty()) {
            Some(options) => {
                prop_assert_eq!(descriptor.connection_string(), format!("{base} {options}"));
            }
            None => prop_assert_eq!(descriptor.connection_string(), base),
        }
    }
}

#[test]
fn test_missing_database_wins_over_password_resolution() {
    let result = resolver_over(HashMap::new()).resolve(&PartialConfig::new().with_user("c42"));
    assert!(matches!(result, Err(PgUtilError::MissingDatabase)));
}
