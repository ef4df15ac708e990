use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Which exchange deployment a process is wired against.
///
/// Each variant carries a fixed triple of base URLs (REST, public WebSocket, private
/// WebSocket) - see [`Environment::rest_base`], [`Environment::public_ws_base`] and
/// [`Environment::private_ws_base`]. The Gateway keeps these three consistent within a
/// process: there is no way to mix, say, a `live` REST base with a `testnet` WebSocket.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Live,
    Testnet,
    /// Mainnet public market data with a dedicated private/REST surface - the canonical
    /// choice for paper trading in production (see DESIGN.md).
    Demo,
}

impl Environment {
    pub fn rest_base(self) -> &'static str {
        match self {
            Environment::Live => "https://api.bybit.com",
            Environment::Testnet => "https://api-testnet.bybit.com",
            Environment::Demo => "https://api-demo.bybit.com",
        }
    }

    /// Public WebSocket base; `category` selects the topic namespace (e.g. `linear`, `spot`).
    pub fn public_ws_base(self, category: &str) -> String {
        match self {
            Environment::Live | Environment::Demo => {
                format!("wss://stream.bybit.com/v5/public/{category}")
            }
            Environment::Testnet => {
                format!("wss://stream-testnet.bybit.com/v5/public/{category}")
            }
        }
    }

    pub fn private_ws_base(self) -> &'static str {
        match self {
            Environment::Live | Environment::Testnet => "wss://stream.bybit.com/v5/private",
            Environment::Demo => "wss://stream-demo.bybit.com/v5/private",
        }
    }

    /// `true` for `Demo`, the only environment the spec models as non-risking
    /// even though it submits real exchange requests over the demo surface.
    pub fn is_paper_safe(self) -> bool {
        matches!(self, Environment::Demo | Environment::Testnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_uses_mainnet_public_stream_but_its_own_private_and_rest_bases() {
        assert_eq!(Environment::Demo.rest_base(), "https://api-demo.bybit.com");
        assert_eq!(
            Environment::Demo.public_ws_base("linear"),
            Environment::Live.public_ws_base("linear"),
        );
        assert_ne!(
            Environment::Demo.private_ws_base(),
            Environment::Live.private_ws_base(),
        );
    }
}
