//! Network constants for the AFRAMP SDK.

/// Horizon base URL for the public network.
pub const HORIZON_URL: &str = "https://horizon.stellar.org";

/// Horizon base URL for the test network.
pub const HORIZON_TESTNET_URL: &str = "https://horizon-testnet.stellar.org";

/// Public network passphrase.
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Test network passphrase.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Futurenet passphrase.
pub const FUTURENET_PASSPHRASE: &str = "Test SDF Future Network ; October 2022";
