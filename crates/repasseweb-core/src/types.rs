//! Basic enumerations shared by ledger entries, closures and payouts
//!
//! Wire values are the Portuguese names used by the database views. Parsing is
//! case-insensitive because the views are not consistent about casing.

use serde::{Deserialize, Serialize};

/// Which side of the marketplace an actor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ActorKind {
    /// Delivery courier (`entregador`)
    #[serde(rename = "entregador")]
    Courier,
    /// Restaurant (`restaurante`)
    #[serde(rename = "restaurante")]
    Restaurant,
}

impl ActorKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Courier => "entregador",
            ActorKind::Restaurant => "restaurante",
        }
    }

    /// Parse an optional query value, ignoring anything that is not a known kind
    pub fn from_filter(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| v.parse().ok())
    }
}

impl std::str::FromStr for ActorKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entregador" => Ok(ActorKind::Courier),
            "restaurante" => Ok(ActorKind::Restaurant),
            _ => Err(format!("Invalid actor kind: {}", s)),
        }
    }
}

impl TryFrom<String> for ActorKind {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Direction {
    /// Credit owed to the actor (`entrada`)
    #[serde(rename = "entrada")]
    Credit,
    /// Amount paid out to the actor (`saida`)
    #[serde(rename = "saida")]
    Debit,
}

impl Direction {
    /// Wire name of the direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Credit => "entrada",
            Direction::Debit => "saida",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" => Ok(Direction::Credit),
            "saida" | "saída" => Ok(Direction::Debit),
            _ => Err(format!("Invalid direction: {}", s)),
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum EntryStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "confirmado")]
    Confirmed,
    #[serde(rename = "pago")]
    Paid,
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl EntryStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pendente",
            EntryStatus::Confirmed => "confirmado",
            EntryStatus::Paid => "pago",
            EntryStatus::Cancelled => "cancelado",
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendente" => Ok(EntryStatus::Pending),
            "confirmado" => Ok(EntryStatus::Confirmed),
            "pago" => Ok(EntryStatus::Paid),
            "cancelado" => Ok(EntryStatus::Cancelled),
            _ => Err(format!("Invalid entry status: {}", s)),
        }
    }
}

impl TryFrom<String> for EntryStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a cash-register closure batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum ClosureStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "aprovado")]
    Approved,
    #[serde(rename = "pago")]
    Paid,
}

impl ClosureStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureStatus::Pending => "pendente",
            ClosureStatus::Approved => "aprovado",
            ClosureStatus::Paid => "pago",
        }
    }
}

impl Default for ClosureStatus {
    fn default() -> Self {
        ClosureStatus::Pending
    }
}

impl std::str::FromStr for ClosureStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendente" => Ok(ClosureStatus::Pending),
            "aprovado" => Ok(ClosureStatus::Approved),
            "pago" => Ok(ClosureStatus::Paid),
            _ => Err(format!("Invalid closure status: {}", s)),
        }
    }
}

impl TryFrom<String> for ClosureStatus {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for ClosureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
