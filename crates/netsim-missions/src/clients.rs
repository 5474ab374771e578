//! The static client catalog.
//!
//! Clients are gated by `min_reputation`: a client only offers work to a
//! player whose tier is at least that value. The catalog also carries a
//! walk-in client used when nothing else is available, so pool generation
//! never stalls on an empty or exhausted catalog.

use netsim_types::{ClientId, Industry};
use serde::{Deserialize, Serialize};

/// A client that can commission missions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Catalog key.
    pub id: ClientId,
    /// Display name.
    pub name: String,
    /// Industry sector.
    pub industry: Industry,
    /// Lowest reputation tier the client works with.
    pub min_reputation: u8,
    /// Contact person signing the client's messages.
    pub contact: String,
}

/// `(id, name, industry, min_reputation, contact)`
type ClientRow = (&'static str, &'static str, Industry, u8, &'static str);

/// Built-in catalog, lowest reputation first.
const CATALOG: [ClientRow; 16] = [
    ("corner-pharmacy", "Corner Pharmacy", Industry::Healthcare, 1, "Dana Whitlock"),
    ("maple-street-school", "Maple Street Elementary", Industry::Education, 1, "Principal Okafor"),
    ("harbor-grocers", "Harbor Grocers", Industry::Retail, 1, "Luis Ferreira"),
    ("valley-gazette", "Valley Gazette", Industry::Media, 1, "Ruth Calloway"),
    ("pine-credit-union", "Pine Ridge Credit Union", Industry::Banking, 1, "Martin Cole"),
    ("northside-clinic", "Northside Family Clinic", Industry::Healthcare, 3, "Dr. Anika Rao"),
    ("brightline-retail", "Brightline Outlets", Industry::Retail, 3, "Gemma Lytton"),
    ("county-records", "County Records Office", Industry::Government, 3, "Clerk Harlan Boyd"),
    ("lakeside-university", "Lakeside University", Industry::Education, 5, "Prof. Ines Marlow"),
    ("hartwell-legal", "Hartwell & Partners", Industry::Legal, 5, "Simone Hartwell"),
    ("metro-water", "Metro Water Authority", Industry::Utilities, 5, "Ken Abernathy"),
    ("first-meridian-bank", "First Meridian Bank", Industry::Banking, 7, "Victor Sallow"),
    ("channel-nine", "Channel Nine News", Industry::Media, 7, "Priya Venkat"),
    ("state-health-dept", "State Health Department", Industry::Government, 7, "Director Alma Reyes"),
    ("grid-power", "GridPower Utilities", Industry::Utilities, 9, "Oskar Lind"),
    ("atlas-federal", "Atlas Federal Reserve Branch", Industry::Banking, 9, "Helena Vance"),
];

/// The catalog of clients available to the mission generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistry {
    /// Catalog entries, lowest reputation first.
    clients: Vec<Client>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ClientRegistry {
    /// The built-in 16-client catalog.
    pub fn standard() -> Self {
        let clients = CATALOG
            .iter()
            .map(|&(id, name, industry, min_reputation, contact)| Client {
                id: ClientId::new(id),
                name: name.to_owned(),
                industry,
                min_reputation,
                contact: contact.to_owned(),
            })
            .collect();
        Self { clients }
    }

    /// A custom catalog (possibly empty).
    pub const fn new(clients: Vec<Client>) -> Self {
        Self { clients }
    }

    /// Every client in catalog order.
    pub fn all(&self) -> &[Client] {
        &self.clients
    }

    /// Look up a client by id. The walk-in client is always found.
    pub fn get(&self, id: &ClientId) -> Option<Client> {
        if id.as_str() == WALK_IN_ID {
            return Some(walk_in());
        }
        self.clients.iter().find(|c| &c.id == id).cloned()
    }

    /// Clients the player currently qualifies for.
    pub fn get_accessible_clients(&self, reputation: u8) -> Vec<&Client> {
        self.clients
            .iter()
            .filter(|c| c.min_reputation <= reputation)
            .collect()
    }

    /// Number of catalog clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Catalog key of the walk-in client.
pub const WALK_IN_ID: &str = "walk-in";

/// The fallback client used when the catalog has nothing to offer.
pub fn walk_in() -> Client {
    Client {
        id: ClientId::new(WALK_IN_ID),
        name: "Walk-in Customer".to_owned(),
        industry: Industry::Retail,
        min_reputation: 1,
        contact: "Front Desk".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn catalog_has_sixteen_unique_clients() {
        let registry = ClientRegistry::standard();
        assert_eq!(registry.len(), 16);
        let ids: BTreeSet<_> = registry.all().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn accessibility_is_gated_by_reputation() {
        let registry = ClientRegistry::standard();
        assert_eq!(registry.get_accessible_clients(1).len(), 5);
        assert_eq!(registry.get_accessible_clients(11).len(), 16);
        assert!(
            registry
                .get_accessible_clients(4)
                .iter()
                .all(|c| c.min_reputation <= 4)
        );
    }

    #[test]
    fn walk_in_resolves_even_with_empty_catalog() {
        let registry = ClientRegistry::new(Vec::new());
        assert!(registry.is_empty());
        let client = registry.get(&ClientId::new(WALK_IN_ID));
        assert_eq!(client.map(|c| c.name), Some("Walk-in Customer".to_owned()));
    }
}
