//! Authentication and signing for the Polymarket CLOB
//!
//! Level 1: EIP-712 `ClobAuth` signature by the wallet, used to derive API keys.
//! Level 2: HMAC-SHA256 over `timestamp + method + path + body` with the API secret.
//! Orders carry their own EIP-712 signature against the CTF exchange contract.

use crate::error::{BotError, Result};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// EIP-712 domain constants for CLOB auth
const CLOB_DOMAIN_NAME: &str = "ClobAuthDomain";
const CLOB_VERSION: &str = "1";
const CLOB_AUTH_MESSAGE: &str = "This message attests that I control the given wallet";

const EXCHANGE_DOMAIN_NAME: &str = "Polymarket CTF Exchange";
const EXCHANGE_VERSION: &str = "1";

/// Exchange contract that verifies orders for a chain
pub fn exchange_address(chain_id: u64, neg_risk: bool) -> Result<Address> {
    let addr = match (chain_id, neg_risk) {
        (137, false) => "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E",
        (137, true) => "0xC5d563A36AE78145C45a50134d48A1215220f80a",
        (80002, false) => "0xdFE02Eb6733538f8Ea35D585af8DE5958AD99E40",
        (80002, true) => "0xd91E80cF2E7be2e162c6513ceD06f1dD0dA35296",
        _ => {
            return Err(BotError::Config(format!(
                "Unsupported chain id {}",
                chain_id
            )))
        }
    };
    addr.parse()
        .map_err(|e| BotError::Config(format!("Invalid exchange address: {}", e)))
}

/// Wallet signer for CLOB authentication and orders
#[derive(Clone)]
pub struct PolySigner {
    wallet: LocalWallet,
    chain_id: u64,
}

impl PolySigner {
    /// Create a new signer from a private key (hex string, with or without 0x prefix)
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self> {
        let key_hex = private_key.trim().trim_start_matches("0x");
        let wallet: LocalWallet = key_hex
            .parse()
            .map_err(|e| BotError::Auth(format!("Invalid private key: {}", e)))?;

        let wallet = wallet.with_chain_id(chain_id);

        Ok(Self { wallet, chain_id })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn address_hex(&self) -> String {
        format!("{:?}", self.wallet.address())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn sign_hash(&self, hash: H256) -> Result<String> {
        let signature = self
            .wallet
            .sign_hash(hash)
            .map_err(|e| BotError::Auth(format!("Signing failed: {}", e)))?;

        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }

    /// Sign the `ClobAuth` message for Level 1 authentication
    pub fn sign_clob_auth(&self, timestamp: i64, nonce: u64) -> Result<String> {
        let domain_type_hash =
            keccak256(b"EIP712Domain(string name,string version,uint256 chainId)");

        let mut domain_data = Vec::with_capacity(128);
        domain_data.extend_from_slice(&domain_type_hash);
        domain_data.extend_from_slice(&keccak256(CLOB_DOMAIN_NAME.as_bytes()));
        domain_data.extend_from_slice(&keccak256(CLOB_VERSION.as_bytes()));
        domain_data.extend_from_slice(&u256_to_bytes32(U256::from(self.chain_id)));
        let domain_separator = keccak256(&domain_data);

        let struct_type_hash = keccak256(
            b"ClobAuth(address address,string timestamp,uint256 nonce,string message)",
        );
        let mut struct_data = Vec::with_capacity(160);
        struct_data.extend_from_slice(&struct_type_hash);
        struct_data.extend_from_slice(&address_to_bytes32(self.wallet.address()));
        struct_data.extend_from_slice(&keccak256(timestamp.to_string().as_bytes()));
        struct_data.extend_from_slice(&u256_to_bytes32(U256::from(nonce)));
        struct_data.extend_from_slice(&keccak256(CLOB_AUTH_MESSAGE.as_bytes()));
        let struct_hash = keccak256(&struct_data);

        self.sign_hash(typed_digest(&domain_separator, &struct_hash))
    }

    /// Sign an order for the given exchange contract
    pub fn sign_order(&self, order: &OrderSignData, exchange: Address) -> Result<String> {
        let domain_separator = self.exchange_domain_separator(exchange);
        let struct_hash = order.struct_hash();

        self.sign_hash(typed_digest(&domain_separator, &struct_hash))
    }

    fn exchange_domain_separator(&self, exchange: Address) -> [u8; 32] {
        let type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );

        let mut data = Vec::with_capacity(160);
        data.extend_from_slice(&type_hash);
        data.extend_from_slice(&keccak256(EXCHANGE_DOMAIN_NAME.as_bytes()));
        data.extend_from_slice(&keccak256(EXCHANGE_VERSION.as_bytes()));
        data.extend_from_slice(&u256_to_bytes32(U256::from(self.chain_id)));
        data.extend_from_slice(&address_to_bytes32(exchange));

        keccak256(&data)
    }
}

/// keccak256("\x19\x01" ++ domain_separator ++ struct_hash)
fn typed_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> H256 {
    let mut data = Vec::with_capacity(66);
    data.extend_from_slice(&[0x19, 0x01]);
    data.extend_from_slice(domain_separator);
    data.extend_from_slice(struct_hash);
    H256::from(keccak256(&data))
}

fn u256_to_bytes32(value: U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    bytes
}

fn address_to_bytes32(addr: Address) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[12..].copy_from_slice(addr.as_bytes());
    bytes
}

/// API credentials for Level 2 authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCredentials {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "secret")]
    pub api_secret: String,
    #[serde(rename = "passphrase")]
    pub api_passphrase: String,
}

impl ApiCredentials {
    pub fn new(api_key: &str, api_secret: &str, api_passphrase: &str) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            api_secret: api_secret.trim().to_string(),
            api_passphrase: api_passphrase.trim().to_string(),
        }
    }

    /// Base64 HMAC of `timestamp + method + path + body`
    pub fn l2_signature(
        &self,
        timestamp: i64,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<String> {
        let secret = URL_SAFE
            .decode(&self.api_secret)
            .map_err(|e| BotError::Auth(format!("Invalid API secret: {}", e)))?;
        let mut mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| BotError::Auth(format!("Invalid HMAC key: {}", e)))?;

        mac.update(timestamp.to_string().as_bytes());
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        if let Some(body) = body {
            mac.update(body.as_bytes());
        }

        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }
}

/// Order fields covered by the EIP-712 signature
#[derive(Debug, Clone)]
pub struct OrderSignData {
    pub salt: U256,
    pub maker: Address,
    pub signer: Address,
    pub taker: Address,
    pub token_id: U256,
    pub maker_amount: U256,
    pub taker_amount: U256,
    pub expiration: U256,
    pub nonce: U256,
    pub fee_rate_bps: U256,
    pub side: u8,
    pub signature_type: u8,
}

impl OrderSignData {
    fn struct_hash(&self) -> [u8; 32] {
        let type_hash = keccak256(
            b"Order(uint256 salt,address maker,address signer,address taker,uint256 tokenId,uint256 makerAmount,uint256 takerAmount,uint256 expiration,uint256 nonce,uint256 feeRateBps,uint8 side,uint8 signatureType)",
        );

        let mut data = Vec::with_capacity(416);
        data.extend_from_slice(&type_hash);
        data.extend_from_slice(&u256_to_bytes32(self.salt));
        data.extend_from_slice(&address_to_bytes32(self.maker));
        data.extend_from_slice(&address_to_bytes32(self.signer));
        data.extend_from_slice(&address_to_bytes32(self.taker));
        data.extend_from_slice(&u256_to_bytes32(self.token_id));
        data.extend_from_slice(&u256_to_bytes32(self.maker_amount));
        data.extend_from_slice(&u256_to_bytes32(self.taker_amount));
        data.extend_from_slice(&u256_to_bytes32(self.expiration));
        data.extend_from_slice(&u256_to_bytes32(self.nonce));
        data.extend_from_slice(&u256_to_bytes32(self.fee_rate_bps));
        data.extend_from_slice(&[0u8; 31]);
        data.push(self.side);
        data.extend_from_slice(&[0u8; 31]);
        data.push(self.signature_type);

        keccak256(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known hardhat test key, never funded on mainnet
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_signer_address() {
        let signer = PolySigner::from_private_key(TEST_KEY, 137).unwrap();
        assert_eq!(
            signer.address_hex().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
        assert_eq!(signer.chain_id(), 137);
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(matches!(
            PolySigner::from_private_key("not-a-key", 137),
            Err(BotError::Auth(_))
        ));
    }

    #[test]
    fn test_clob_auth_signature_shape() {
        let signer = PolySigner::from_private_key(TEST_KEY, 137).unwrap();
        let sig = signer.sign_clob_auth(1_700_000_000, 0).unwrap();
        assert!(sig.starts_with("0x"));
        // r (32) + s (32) + v (1) bytes, hex encoded
        assert_eq!(sig.len(), 2 + 130);
        // Deterministic for the same input
        assert_eq!(sig, signer.sign_clob_auth(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn test_order_signature_depends_on_exchange() {
        let signer = PolySigner::from_private_key(TEST_KEY, 137).unwrap();
        let order = OrderSignData {
            salt: U256::from(42u64),
            maker: signer.address(),
            signer: signer.address(),
            taker: Address::zero(),
            token_id: U256::from(12345u64),
            maker_amount: U256::from(5_000_000u64),
            taker_amount: U256::from(10_000_000u64),
            expiration: U256::zero(),
            nonce: U256::zero(),
            fee_rate_bps: U256::zero(),
            side: 0,
            signature_type: 0,
        };

        let regular = signer
            .sign_order(&order, exchange_address(137, false).unwrap())
            .unwrap();
        let neg_risk = signer
            .sign_order(&order, exchange_address(137, true).unwrap())
            .unwrap();
        assert_ne!(regular, neg_risk);
    }

    #[test]
    fn test_exchange_address_unknown_chain() {
        assert!(exchange_address(1, false).is_err());
        assert!(exchange_address(80002, true).is_ok());
    }

    #[test]
    fn test_l2_signature_is_url_safe_base64() {
        let creds = ApiCredentials::new("key", &URL_SAFE.encode(b"super-secret"), "pass");
        let sig = creds
            .l2_signature(1_700_000_000, "POST", "/order", Some("{\"a\":1}"))
            .unwrap();
        let raw = URL_SAFE.decode(&sig).unwrap();
        assert_eq!(raw.len(), 32);

        let without_body = creds
            .l2_signature(1_700_000_000, "POST", "/order", None)
            .unwrap();
        assert_ne!(sig, without_body);
    }

    #[test]
    fn test_l2_signature_rejects_bad_secret() {
        let creds = ApiCredentials::new("key", "***not base64***", "pass");
        assert!(creds.l2_signature(0, "GET", "/", None).is_err());
    }
}
