//! World definition for Funeral Hub BDD tests

use cucumber::World;
use funeral_hub_core::{Actor, CoreError, HousekeepingReport, Protocol, ProtocolId, Role};
use std::fmt;

use funeral_hub_test_utils::TestHarness;

/// World struct that holds state across step definitions
#[derive(Default, World)]
pub struct FuneralHubWorld {
    pub harness: Option<TestHarness>,

    /// Protocol under test, refreshed after every successful action
    pub protocol: Option<Protocol>,

    /// Outcome of the last action
    pub last_error: Option<CoreError>,

    pub report: Option<HousekeepingReport>,
}

impl fmt::Debug for FuneralHubWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuneralHubWorld")
            .field("harness", &self.harness.is_some())
            .field("protocol", &self.protocol)
            .field("last_error", &self.last_error)
            .field("report", &self.report)
            .finish()
    }
}

impl FuneralHubWorld {
    pub fn harness(&self) -> &TestHarness {
        self.harness
            .as_ref()
            .expect("no funeral hub set up; add a 'Given a funeral hub' step")
    }

    pub fn protocol_id(&self) -> ProtocolId {
        self.protocol
            .as_ref()
            .map(|p| p.id)
            .expect("no protocol in play; add a 'Given a protocol' step")
    }

    /// Cast member holding `role`
    pub fn actor(&self, role: &str) -> Actor {
        let cast = &self.harness().cast;
        match role {
            "intake" => cast.intake,
            "funeral_home" => cast.funeral_home,
            "notary" => cast.notary,
            "declarant" => cast.declarant,
            "admin" => cast.admin,
            other => panic!("unknown role in feature file: {}", other),
        }
    }

    pub fn role(role: &str) -> Role {
        role.parse()
            .unwrap_or_else(|_| panic!("unknown role in feature file: {}", role))
    }

    /// Record the outcome of an action
    pub fn record(&mut self, result: Result<Protocol, CoreError>) {
        match result {
            Ok(protocol) => {
                self.protocol = Some(protocol);
                self.last_error = None;
            }
            Err(err) => self.last_error = Some(err),
        }
    }

    /// Re-read the protocol from the store
    pub async fn refresh(&mut self) {
        let id = self.protocol_id();
        let protocol = self
            .harness()
            .read(&id)
            .await
            .expect("protocol should still exist");
        self.protocol = Some(protocol);
    }
}
