/// JSON-RPC error codes returned by the connector.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    /// Malformed envelope, batch request, or a tool name that is not registered.
    pub const INVALID_REQUEST: i64 = -32600;
    pub const INVALID_TOOL: i64 = INVALID_REQUEST;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Server-defined range; not part of the JSON-RPC reserved set.
    pub const UNSUPPORTED_PROTOCOL_VERSION: i64 = -32001;
}
