//! Client type enumeration and its mapping tables.
//!
//! A "client type" is one distinguishable game variant (retail, classic,
//! the PTR flavors, beta). Each maps to an on-disk folder token, a human
//! display name, a preference key storing the chosen install path, and a
//! lowercase token used by pack definitions. The maps are total in both
//! directions; lookups that produce strings soft-fail to `""` so an
//! unrecognized future client folder never takes the manager down.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A distinguishable game variant with its own install path and executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientType {
    Retail,
    Classic,
    RetailPtr,
    ClassicPtr,
    Beta,
    None,
}

/// Every real client type, in a fixed display order. `None` is excluded.
pub const ALL_CLIENT_TYPES: [ClientType; 5] = [
    ClientType::Retail,
    ClientType::Classic,
    ClientType::RetailPtr,
    ClientType::ClassicPtr,
    ClientType::Beta,
];

impl ClientType {
    /// The launcher's on-disk folder token for this client (e.g. `_retail_`).
    pub fn folder_name(self) -> &'static str {
        match self {
            ClientType::Retail => "_retail_",
            ClientType::Classic => "_classic_",
            ClientType::RetailPtr => "_ptr_",
            ClientType::ClassicPtr => "_classic_ptr_",
            ClientType::Beta => "_beta_",
            ClientType::None => "",
        }
    }

    /// Reverse of [`folder_name`](Self::folder_name). Unknown tokens map to
    /// `None` rather than erroring; the launcher may ship folders newer than
    /// this build.
    pub fn from_folder_name(folder: &str) -> ClientType {
        match folder {
            "_retail_" => ClientType::Retail,
            "_classic_" => ClientType::Classic,
            "_ptr_" => ClientType::RetailPtr,
            "_classic_ptr_" => ClientType::ClassicPtr,
            "_beta_" => ClientType::Beta,
            _ => ClientType::None,
        }
    }

    /// Human-readable name for list views.
    pub fn display_name(self) -> &'static str {
        match self {
            ClientType::Retail => "Retail",
            ClientType::Classic => "Classic",
            ClientType::RetailPtr => "Retail PTR",
            ClientType::ClassicPtr => "Classic PTR",
            ClientType::Beta => "Beta",
            ClientType::None => "",
        }
    }

    /// Preference-store key holding the chosen install path for this client.
    pub fn location_preference_key(self) -> &'static str {
        match self {
            ClientType::Retail => "wow_retail_location",
            ClientType::Classic => "wow_classic_location",
            ClientType::RetailPtr => "wow_retail_ptr_location",
            ClientType::ClassicPtr => "wow_classic_ptr_location",
            ClientType::Beta => "wow_beta_location",
            ClientType::None => "",
        }
    }

    /// Lowercase token used by pack definitions and the CLI.
    pub fn token(self) -> &'static str {
        match self {
            ClientType::Retail => "retail",
            ClientType::Classic => "classic",
            ClientType::RetailPtr => "retail_ptr",
            ClientType::ClassicPtr => "classic_ptr",
            ClientType::Beta => "beta",
            ClientType::None => "",
        }
    }

    /// Reverse of [`token`](Self::token); unknown tokens map to `None`.
    pub fn from_token(token: &str) -> ClientType {
        match token {
            "retail" => ClientType::Retail,
            "classic" => ClientType::Classic,
            "retail_ptr" => ClientType::RetailPtr,
            "classic_ptr" => ClientType::ClassicPtr,
            "beta" => ClientType::Beta,
            _ => ClientType::None,
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_name_round_trips_for_every_client_type() {
        for client in ALL_CLIENT_TYPES {
            assert_eq!(ClientType::from_folder_name(client.folder_name()), client);
        }
        // None maps to the empty token and back.
        assert_eq!(ClientType::from_folder_name(ClientType::None.folder_name()), ClientType::None);
    }

    #[test]
    fn token_round_trips_for_every_client_type() {
        for client in ALL_CLIENT_TYPES {
            assert_eq!(ClientType::from_token(client.token()), client);
        }
    }

    #[test]
    fn unknown_folder_token_soft_fails_to_none() {
        assert_eq!(ClientType::from_folder_name("_classic_era_"), ClientType::None);
        assert_eq!(ClientType::from_folder_name(""), ClientType::None);
    }

    #[test]
    fn none_produces_empty_strings_not_errors() {
        assert_eq!(ClientType::None.folder_name(), "");
        assert_eq!(ClientType::None.display_name(), "");
        assert_eq!(ClientType::None.location_preference_key(), "");
    }
}
