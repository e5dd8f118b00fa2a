//! Provider listing.
//!
//! Backs `trace providers` and `GET /providers`: one row per registered
//! probe with its search kind, credential state and time budget. Credential
//! values themselves are never exposed.

use serde::Serialize;

use crate::models::SearchKind;
use crate::probe::{CredentialState, Probe, ProbeRegistry};
use crate::providers::Registries;

/// Status of one registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub kind: SearchKind,
    /// `"not required"`, `"configured"` or `"missing"`.
    pub credential: &'static str,
    pub timeout_ms: u64,
}

fn credential_label(state: CredentialState) -> &'static str {
    match state {
        CredentialState::NotRequired => "not required",
        CredentialState::Configured => "configured",
        CredentialState::Missing => "missing",
    }
}

fn rows<Q: Sync>(
    kind: SearchKind,
    registry: &ProbeRegistry<Q>,
) -> impl Iterator<Item = ProviderStatus> + '_ {
    registry.probes().iter().map(move |probe| status(kind, probe.as_ref()))
}

fn status<Q: Sync>(kind: SearchKind, probe: &dyn Probe<Q>) -> ProviderStatus {
    ProviderStatus {
        name: probe.name().to_string(),
        kind,
        credential: credential_label(probe.credential()),
        timeout_ms: probe.timeout().as_millis() as u64,
    }
}

/// Every registered provider, grouped by kind in [`SearchKind::ALL`] order.
pub fn get_providers(registries: &Registries) -> Vec<ProviderStatus> {
    rows(SearchKind::Username, &registries.username)
        .chain(rows(SearchKind::Email, &registries.email))
        .chain(rows(SearchKind::Phone, &registries.phone))
        .chain(rows(SearchKind::Image, &registries.image))
        .collect()
}

/// Print the provider table to stdout.
pub fn list_providers(registries: &Registries) {
    println!(
        "{:<16} {:<10} {:<14} TIMEOUT",
        "PROVIDER", "KIND", "CREDENTIAL"
    );
    for p in get_providers(registries) {
        println!(
            "{:<16} {:<10} {:<14} {}ms",
            p.name, p.kind, p.credential, p.timeout_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_lists_every_provider() {
        let mut config = Config::default();
        config.credentials.insert("hibp".into(), "k".into());
        let providers = get_providers(&Registries::builtin(&config));

        assert_eq!(providers.len(), 23);
        assert_eq!(providers[0].name, "GitHub");
        assert_eq!(providers[0].kind, SearchKind::Username);
        assert_eq!(providers[0].credential, "not required");

        let hibp = providers.iter().find(|p| p.name == "HaveIBeenPwned").unwrap();
        assert_eq!(hibp.credential, "configured");
        let hunter = providers.iter().find(|p| p.name == "Hunter.io").unwrap();
        assert_eq!(hunter.credential, "missing");

        let vision = providers.last().unwrap();
        assert_eq!(vision.kind, SearchKind::Image);
        assert_eq!(vision.timeout_ms, 20_000);
    }
}
