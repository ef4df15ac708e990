use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantora_instrument::{Category, Symbol};
use vantora_integration::protocol::http::{Method, RestRequest};
use vantora_risk::EntryType;

fn category_str(category: Category) -> &'static str {
    match category {
        Category::Linear => "linear",
        Category::Inverse => "inverse",
        Category::Spot => "spot",
        Category::Option => "option",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderBody {
    pub category: &'static str,
    pub symbol: String,
    pub side: &'static str,
    #[serde(rename = "orderType")]
    pub order_type: &'static str,
    pub qty: String,
    #[serde(rename = "price", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
    #[serde(rename = "reduceOnly")]
    pub reduce_only: bool,
    #[serde(rename = "stopLoss")]
    pub stop_loss: String,
    #[serde(rename = "takeProfit")]
    pub take_profit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResult {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
}

pub struct CreateOrderRequest {
    pub body: CreateOrderBody,
}

impl CreateOrderRequest {
    pub fn new(
        symbol: &Symbol,
        side: vantora_instrument::Side,
        entry_type: EntryType,
        qty: Decimal,
        price: Option<Decimal>,
        reduce_only: bool,
        stop_loss: Decimal,
        take_profit: Decimal,
        client_order_id: String,
    ) -> Self {
        Self {
            body: CreateOrderBody {
                category: category_str(symbol.category()),
                symbol: symbol.code().to_string(),
                side: match side {
                    vantora_instrument::Side::Buy => "Buy",
                    vantora_instrument::Side::Sell => "Sell",
                },
                order_type: match entry_type {
                    EntryType::Market => "Market",
                    EntryType::Limit => "Limit",
                },
                qty: qty.to_string(),
                price: price.map(|p| p.to_string()),
                order_link_id: client_order_id,
                reduce_only,
                stop_loss: stop_loss.to_string(),
                take_profit: take_profit.to_string(),
            },
        }
    }
}

impl RestRequest for CreateOrderRequest {
    type Response = CreateOrderResult;
    type QueryParams = ();
    type Body = CreateOrderBody;

    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        "/v5/order/create".to_string()
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.body)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AmendOrderBody {
    pub category: &'static str,
    pub symbol: String,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
    #[serde(rename = "qty", skip_serializing_if = "Option::is_none")]
    pub qty: Option<String>,
    #[serde(rename = "price", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

pub struct AmendOrderRequest {
    pub body: AmendOrderBody,
}

impl RestRequest for AmendOrderRequest {
    type Response = serde_json::Value;
    type QueryParams = ();
    type Body = AmendOrderBody;

    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        "/v5/order/amend".to_string()
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.body)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderBody {
    pub category: &'static str,
    pub symbol: String,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
}

pub struct CancelOrderRequest {
    pub body: CancelOrderBody,
}

impl RestRequest for CancelOrderRequest {
    type Response = serde_json::Value;
    type QueryParams = ();
    type Body = CancelOrderBody;

    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        "/v5/order/cancel".to_string()
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.body)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelAllBody {
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

pub struct CancelAllRequest {
    pub body: CancelAllBody,
}

impl RestRequest for CancelAllRequest {
    type Response = serde_json::Value;
    type QueryParams = ();
    type Body = CancelAllBody;

    fn method(&self) -> Method {
        Method::Post
    }

    fn path(&self) -> String {
        "/v5/order/cancel-all".to_string()
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.body)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenOrdersQuery {
    pub category: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrderEntry {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
    pub symbol: String,
    #[serde(rename = "orderStatus")]
    pub order_status: String,
    #[serde(rename = "cumExecQty")]
    pub cum_exec_qty: Decimal,
    #[serde(rename = "avgPrice", default)]
    pub avg_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrdersResult {
    pub list: Vec<OpenOrderEntry>,
}

pub struct OpenOrdersRequest {
    pub query: OpenOrdersQuery,
}

impl RestRequest for OpenOrdersRequest {
    type Response = OpenOrdersResult;
    type QueryParams = OpenOrdersQuery;
    type Body = ();

    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        "/v5/order/realtime".to_string()
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionEntry {
    pub symbol: String,
    pub side: String,
    pub size: Decimal,
    #[serde(rename = "avgPrice")]
    pub avg_price: Decimal,
    #[serde(rename = "unrealisedPnl")]
    pub unrealised_pnl: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionListResult {
    pub list: Vec<PositionEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionListQuery {
    pub category: &'static str,
}

pub struct PositionListRequest {
    pub query: PositionListQuery,
}

impl RestRequest for PositionListRequest {
    type Response = PositionListResult;
    type QueryParams = PositionListQuery;
    type Body = ();

    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        "/v5/position/list".to_string()
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceEntry {
    pub coin: Vec<WalletCoinEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletCoinEntry {
    pub coin: String,
    #[serde(rename = "walletBalance")]
    pub wallet_balance: Decimal,
    #[serde(rename = "availableToWithdraw")]
    pub available_to_withdraw: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceResult {
    pub list: Vec<WalletBalanceEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletBalanceQuery {
    #[serde(rename = "accountType")]
    pub account_type: &'static str,
}

pub struct WalletBalanceRequest {
    pub query: WalletBalanceQuery,
}

impl RestRequest for WalletBalanceRequest {
    type Response = WalletBalanceResult;
    type QueryParams = WalletBalanceQuery;
    type Body = ();

    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        "/v5/account/wallet-balance".to_string()
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}
