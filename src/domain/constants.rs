pub const DOCS_MESSAGE: &str = "Documentation on running a masternode:";
pub const DOCS_URL: &str = "https://docs.tomochain.com/masternode/tmnd/";

/// Where the chain data volume is mounted inside the node container.
pub const CHAINDATA_MOUNT: &str = "/tomochain/data";
pub const P2P_PORT: u16 = 30303;
pub const RESTART_POLICY: &str = "unless-stopped";

pub const IDENTITY_ENV: &str = "IDENTITY";
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
pub const REDACTED: &str = "<redacted>";

pub const OK_GLYPH: &str = "✔";
pub const FAIL_GLYPH: &str = "✗";
