//! Endpoint, credential and client-identification constants.

/// Crate version, sent in the `User-Agent` header and MCP `clientInfo`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Remote MCP endpoint used unless a config overrides it.
pub const MCP_SERVER_URL: &str = "https://mcp.stripe.com";

/// User-Agent product name in toolkit mode.
pub const TOOLKIT_HEADER: &str = "stripe-agent-toolkit-rust";

/// User-Agent product name when running as a local MCP server.
pub const MCP_HEADER: &str = "stripe-mcp-rust";

/// Full-access (legacy) secret key prefix.
pub const SECRET_KEY_PREFIX: &str = "sk_";

/// Restricted key prefix; preferred.
pub const RESTRICTED_KEY_PREFIX: &str = "rk_";

/// Required prefix for connected account ids.
pub const ACCOUNT_PREFIX: &str = "acct_";

/// Header carrying the connected account the requests act on behalf of.
pub const ACCOUNT_HEADER: &str = "Stripe-Account";
