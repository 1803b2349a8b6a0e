/// Laminark's own MCP server name, as it appears in the `mcp__<server>__<tool>`
/// tool-name convention the host uses for MCP-backed tools.
const OWN_MCP_SERVER: &str = "laminark";

/// True when `tool_name` belongs to Laminark's own MCP namespace. These calls
/// must be dropped silently and never produce an observation (§4.2 step 1) —
/// otherwise recalling a memory would itself become a new memory.
pub fn is_self_reference(tool_name: &str) -> bool {
    tool_name
        .strip_prefix("mcp__")
        .and_then(|rest| rest.split("__").next())
        .is_some_and(|server| server == OWN_MCP_SERVER)
}
