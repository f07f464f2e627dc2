//! Shared newtypes and enums used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize
//! identically to the raw format the persistence layer and external
//! collaborators use, so they can be embedded in records without conversion
//! overhead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// ─── OrderId ─────────────────────────────────────────────────────────────────

/// Newtype for on-ramp order identifiers (e.g. `"ord_6fa1c03b"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Generate a fresh random order id.
    pub fn generate() -> Self {
        Self(format!("ord_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for OrderId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OrderId(s.to_string()))
    }
}

impl Serialize for OrderId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(OrderId(s))
    }
}

// ─── AccountId ───────────────────────────────────────────────────────────────

/// A Stellar account address stored as its string form (`G...`).
///
/// Serializes transparently as a JSON string. Can be used as a HashMap key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address has the shape of an ed25519 public key
    /// (`G` followed by 55 base32 characters). Shape only — no checksum.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 56
            && self.0.starts_with('G')
            && self.0[1..]
                .bytes()
                .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b))
    }

    /// Shortened display form: `GAXY...DEFG`.
    pub fn short(&self) -> String {
        let chars = 4;
        if self.0.len() < chars * 2 + 3 {
            return self.0.clone();
        }
        format!("{}...{}", &self.0[..chars], &self.0[self.0.len() - chars..])
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for AccountId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AccountId(s))
    }
}

// ─── FiatCurrency ────────────────────────────────────────────────────────────

/// Supported local currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiatCurrency {
    NGN,
    KES,
    GHS,
    ZAR,
    UGX,
}

impl FiatCurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NGN => "NGN",
            Self::KES => "KES",
            Self::GHS => "GHS",
            Self::ZAR => "ZAR",
            Self::UGX => "UGX",
        }
    }

    /// The stablecoin a currency converts to by default.
    pub fn default_asset(&self) -> CryptoAsset {
        match self {
            Self::NGN => CryptoAsset::CNgn,
            Self::KES => CryptoAsset::CKes,
            Self::GHS => CryptoAsset::CGhs,
            Self::ZAR | Self::UGX => CryptoAsset::Usdc,
        }
    }
}

impl std::fmt::Display for FiatCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── CryptoAsset ─────────────────────────────────────────────────────────────

/// Stablecoins deliverable by the on-ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryptoAsset {
    #[serde(rename = "cNGN")]
    CNgn,
    #[serde(rename = "cKES")]
    CKes,
    #[serde(rename = "cGHS")]
    CGhs,
    #[serde(rename = "USDC")]
    Usdc,
}

impl CryptoAsset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CNgn => "cNGN",
            Self::CKes => "cKES",
            Self::CGhs => "cGHS",
            Self::Usdc => "USDC",
        }
    }
}

impl std::fmt::Display for CryptoAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── PaymentMethod ───────────────────────────────────────────────────────────

/// How the user pays the fiat leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    MobileMoney,
    Card,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BankTransfer => write!(f, "bank_transfer"),
            Self::MobileMoney => write!(f, "mobile_money"),
            Self::Card => write!(f, "card"),
        }
    }
}

// ─── Network ─────────────────────────────────────────────────────────────────

/// Stellar network a wallet session is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Public,
    Testnet,
    Futurenet,
    Standalone,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Testnet => "TESTNET",
            Self::Futurenet => "FUTURENET",
            Self::Standalone => "STANDALONE",
        }
    }

    /// The network passphrase used when signing transactions.
    pub fn passphrase(&self) -> &'static str {
        match self {
            Self::Public | Self::Standalone => crate::network::PUBLIC_PASSPHRASE,
            Self::Testnet => crate::network::TESTNET_PASSPHRASE,
            Self::Futurenet => crate::network::FUTURENET_PASSPHRASE,
        }
    }

    /// Horizon base URL serving this network's account resources.
    pub fn horizon_url(&self) -> &'static str {
        match self {
            Self::Testnet => crate::network::HORIZON_TESTNET_URL,
            _ => crate::network::HORIZON_URL,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
