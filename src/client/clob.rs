//! CLOB (Central Limit Order Book) API client
//!
//! Market data, order placement, open orders and cancellation.

use crate::client::auth::{exchange_address, ApiCredentials, OrderSignData, PolySigner};
use crate::client::order_builder::{market_buy_price, BuyAmounts};
use crate::client::TradingApi;
use crate::config::PolymarketConfig;
use crate::error::{BotError, Result};
use crate::types::{
    CancelResponse, ClobMarket, MarketsPage, OpenOrder, OpenOrdersPage, OrderBookSummary,
    OrderRequest, PostOrderResponse, END_CURSOR,
};
use async_trait::async_trait;
use ethers::types::{Address, U256};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// CLOB API client for trading operations
#[derive(Clone)]
pub struct ClobClient {
    http: Client,
    base_url: String,
    signer: PolySigner,
    funder: Address,
    signature_type: u8,
    credentials: Arc<RwLock<Option<ApiCredentials>>>,
    neg_risk: Arc<RwLock<HashMap<String, bool>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedOrderPayload {
    salt: u64,
    maker: String,
    signer: String,
    taker: String,
    token_id: String,
    maker_amount: String,
    taker_amount: String,
    expiration: String,
    nonce: String,
    fee_rate_bps: String,
    side: &'static str,
    signature_type: u8,
    signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostOrderBody {
    order: SignedOrderPayload,
    owner: String,
    order_type: &'static str,
}

#[derive(Debug, Serialize)]
struct CancelBody<'a> {
    #[serde(rename = "orderID")]
    order_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct NegRiskResponse {
    #[serde(default)]
    neg_risk: bool,
}

impl ClobClient {
    /// Create a new CLOB client. API credentials are taken from the config
    /// when present; otherwise call [`ClobClient::initialize`] to derive them.
    pub fn new(config: &PolymarketConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let signer = PolySigner::from_private_key(&config.private_key, config.chain_id)?;
        let funder: Address = config
            .proxy_address
            .trim()
            .parse()
            .map_err(|e| BotError::Config(format!("Invalid proxy address: {}", e)))?;

        let credentials = if config.api_key.trim().is_empty() {
            None
        } else {
            Some(ApiCredentials::new(
                &config.api_key,
                &config.api_secret,
                &config.api_passphrase,
            ))
        };

        Ok(Self {
            http,
            base_url: config.host.trim_end_matches('/').to_string(),
            signer,
            funder,
            signature_type: config.signature_type,
            credentials: Arc::new(RwLock::new(credentials)),
            neg_risk: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Derive API credentials from the wallet if none are configured
    pub async fn initialize(&self) -> Result<()> {
        if self.credentials.read().await.is_some() {
            return Ok(());
        }

        let creds = self.derive_api_key(0).await?;
        info!("Derived CLOB API key {}", creds.api_key);
        *self.credentials.write().await = Some(creds);

        Ok(())
    }

    async fn derive_api_key(&self, nonce: u64) -> Result<ApiCredentials> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = self.signer.sign_clob_auth(timestamp, nonce)?;

        let mut headers = HeaderMap::new();
        headers.insert("POLY_ADDRESS", header_value(&self.signer.address_hex())?);
        headers.insert("POLY_SIGNATURE", header_value(&signature)?);
        headers.insert("POLY_TIMESTAMP", header_value(&timestamp.to_string())?);
        headers.insert("POLY_NONCE", header_value(&nonce.to_string())?);

        let url = format!("{}/auth/derive-api-key", self.base_url);
        let resp = self.http.get(&url).headers(headers).send().await?;
        parse_response(resp, "/auth/derive-api-key").await
    }

    async fn credentials(&self) -> Result<ApiCredentials> {
        self.credentials
            .read()
            .await
            .clone()
            .ok_or_else(|| BotError::Auth("Not authenticated".into()))
    }

    fn l2_headers(
        &self,
        creds: &ApiCredentials,
        method: &Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<HeaderMap> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = creds.l2_signature(timestamp, method.as_str(), path, body)?;

        let mut headers = HeaderMap::with_capacity(6);
        headers.insert("POLY_ADDRESS", header_value(&self.signer.address_hex())?);
        headers.insert("POLY_SIGNATURE", header_value(&signature)?);
        headers.insert("POLY_TIMESTAMP", header_value(&timestamp.to_string())?);
        headers.insert("POLY_API_KEY", header_value(&creds.api_key)?);
        headers.insert("POLY_PASSPHRASE", header_value(&creds.api_passphrase)?);
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", path, query);
        let resp = self.http.get(&url).query(query).send().await?;
        parse_response(resp, path).await
    }

    async fn send_private<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<T> {
        let creds = self.credentials().await?;
        let headers = self.l2_headers(&creds, &method, path, body.as_deref())?;

        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, path);
        let mut req = self
            .http
            .request(method, &url)
            .headers(headers)
            .query(query);
        if let Some(body) = body {
            req = req.body(body);
        }

        parse_response(req.send().await?, path).await
    }

    /// Whether the token trades on the neg-risk exchange (cached)
    async fn is_neg_risk(&self, token_id: &str) -> Result<bool> {
        if let Some(cached) = self.neg_risk.read().await.get(token_id) {
            return Ok(*cached);
        }

        let resp: NegRiskResponse = self
            .get_public("/neg-risk", &[("token_id", token_id)])
            .await?;
        self.neg_risk
            .write()
            .await
            .insert(token_id.to_string(), resp.neg_risk);
        Ok(resp.neg_risk)
    }

    /// Resolve amounts and expiration, then sign the order
    async fn sign_request(&self, request: &OrderRequest) -> Result<SignedOrderPayload> {
        let (amounts, expiration) = match request {
            OrderRequest::Market { token_id, amount } => {
                let book = self.get_order_book(token_id).await?;
                let price = market_buy_price(&book.asks, *amount)?;
                (BuyAmounts::market(*amount, price)?, 0)
            }
            OrderRequest::Limit { price, size, .. } => (BuyAmounts::limit(*price, *size)?, 0),
            OrderRequest::LimitUntil {
                price,
                size,
                expiration,
                ..
            } => (BuyAmounts::limit(*price, *size)?, *expiration),
        };

        let token_id = request.token_id();
        let neg_risk = self.is_neg_risk(token_id).await?;
        let exchange = exchange_address(self.signer.chain_id(), neg_risk)?;
        let salt: u64 = rand::random::<u32>() as u64;

        let data = OrderSignData {
            salt: U256::from(salt),
            maker: self.funder,
            signer: self.signer.address(),
            taker: Address::zero(),
            token_id: U256::from_dec_str(token_id)
                .map_err(|e| BotError::InvalidInput(format!("Invalid token ID: {}", e)))?,
            maker_amount: amounts.maker_units()?,
            taker_amount: amounts.taker_units()?,
            expiration: U256::from(expiration.max(0) as u64),
            nonce: U256::zero(),
            fee_rate_bps: U256::zero(),
            side: 0,
            signature_type: self.signature_type,
        };
        let signature = self.signer.sign_order(&data, exchange)?;

        Ok(SignedOrderPayload {
            salt,
            maker: format!("{:?}", data.maker),
            signer: format!("{:?}", data.signer),
            taker: format!("{:?}", data.taker),
            token_id: token_id.to_string(),
            maker_amount: data.maker_amount.to_string(),
            taker_amount: data.taker_amount.to_string(),
            expiration: data.expiration.to_string(),
            nonce: "0".to_string(),
            fee_rate_bps: "0".to_string(),
            side: request.side().as_str(),
            signature_type: self.signature_type,
            signature,
        })
    }
}

#[async_trait]
impl TradingApi for ClobClient {
    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/", self.base_url);
        let resp = self.http.get(&url).send().await?;
        Ok(resp.status().is_success())
    }

    async fn get_markets(&self, next_cursor: &str) -> Result<MarketsPage> {
        if next_cursor.is_empty() {
            return self.get_public("/markets", &[]).await;
        }
        self.get_public("/markets", &[("next_cursor", next_cursor)])
            .await
    }

    async fn get_sampling_markets(&self) -> Result<MarketsPage> {
        self.get_public("/sampling-markets", &[]).await
    }

    async fn get_sampling_simplified_markets(&self) -> Result<MarketsPage> {
        self.get_public("/sampling-simplified-markets", &[]).await
    }

    async fn get_market(&self, condition_id: &str) -> Result<ClobMarket> {
        let path = format!("/markets/{}", condition_id);
        let market: ClobMarket = self.get_public(&path, &[]).await?;
        if market.condition_id.is_empty() {
            return Err(BotError::MarketNotFound(condition_id.to_string()));
        }
        Ok(market)
    }

    async fn get_order_book(&self, token_id: &str) -> Result<OrderBookSummary> {
        self.get_public("/book", &[("token_id", token_id)]).await
    }

    async fn post_order(&self, request: &OrderRequest) -> Result<PostOrderResponse> {
        request.validate()?;

        let order = self.sign_request(request).await?;
        let owner = self.credentials().await?.api_key;
        let body = serde_json::to_string(&PostOrderBody {
            order,
            owner,
            order_type: request.order_type().as_str(),
        })?;

        info!(
            "Posting {} buy for token {}",
            request.order_type(),
            request.token_id()
        );
        self.send_private(Method::POST, "/order", &[], Some(body))
            .await
    }

    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>> {
        let mut orders = Vec::new();
        let mut cursor = String::new();

        loop {
            let cursor_query = [("next_cursor", cursor.as_str())];
            let query: &[(&str, &str)] = if cursor.is_empty() {
                &[]
            } else {
                &cursor_query
            };
            let page: OpenOrdersPage = self
                .send_private(Method::GET, "/data/orders", query, None)
                .await?;
            orders.extend(page.data);

            if page.next_cursor.is_empty() || page.next_cursor == END_CURSOR {
                break;
            }
            cursor = page.next_cursor;
        }

        Ok(orders)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<CancelResponse> {
        let body = serde_json::to_string(&CancelBody { order_id })?;
        self.send_private(Method::DELETE, "/order", &[], Some(body))
            .await
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| BotError::Auth(format!("Invalid header value: {}", e)))
}

/// Deserialize a successful response, or turn the body into an API error
async fn parse_response<T: DeserializeOwned>(resp: Response, path: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BotError::Api(format!("{} {}: {}", path, status, body)));
    }
    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PolymarketConfig {
        PolymarketConfig {
            host: "https://clob.example.com/".to_string(),
            private_key: "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            api_passphrase: String::new(),
            proxy_address: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string(),
            chain_id: 137,
            signature_type: 1,
        }
    }

    #[tokio::test]
    async fn test_new_without_credentials_is_unauthenticated() {
        let client = ClobClient::new(&test_config()).unwrap();
        assert_eq!(client.base_url, "https://clob.example.com");
        assert!(matches!(client.credentials().await, Err(BotError::Auth(_))));
    }

    #[tokio::test]
    async fn test_new_with_credentials() {
        let mut config = test_config();
        config.api_key = "key".to_string();
        config.api_secret = "c2VjcmV0".to_string();
        config.api_passphrase = "pass".to_string();

        let client = ClobClient::new(&config).unwrap();
        let creds = client.credentials().await.unwrap();
        assert_eq!(creds.api_key, "key");

        let headers = client
            .l2_headers(&creds, &Method::GET, "/data/orders", None)
            .unwrap();
        assert_eq!(headers["POLY_API_KEY"], "key");
        assert_eq!(headers["POLY_PASSPHRASE"], "pass");
        assert!(headers.contains_key("POLY_SIGNATURE"));
    }

    #[test]
    fn test_invalid_proxy_address() {
        let mut config = test_config();
        config.proxy_address = "0x123".to_string();
        assert!(matches!(ClobClient::new(&config), Err(BotError::Config(_))));
    }

    #[test]
    fn test_post_order_body_wire_names() {
        let body = PostOrderBody {
            order: SignedOrderPayload {
                salt: 7,
                maker: "0xmaker".to_string(),
                signer: "0xsigner".to_string(),
                taker: "0x0".to_string(),
                token_id: "123".to_string(),
                maker_amount: "5000000".to_string(),
                taker_amount: "10000000".to_string(),
                expiration: "0".to_string(),
                nonce: "0".to_string(),
                fee_rate_bps: "0".to_string(),
                side: "BUY",
                signature_type: 1,
                signature: "0xsig".to_string(),
            },
            owner: "api-key".to_string(),
            order_type: "GTC",
        };
        let json: serde_json::Value = serde_json::to_value(&body).unwrap();
        assert_eq!(json["orderType"], "GTC");
        assert_eq!(json["owner"], "api-key");
        assert_eq!(json["order"]["tokenId"], "123");
        assert_eq!(json["order"]["makerAmount"], "5000000");
        assert_eq!(json["order"]["feeRateBps"], "0");
        assert_eq!(json["order"]["signatureType"], 1);
        assert_eq!(json["order"]["salt"], 7);
    }
}
