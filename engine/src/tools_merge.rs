//! Tool-set merging (spec §4.7.1): request tools ∪ built-in provider tools,
//! deduplicated by name with the request's own definition taking precedence.

use protocol::ToolDefinition;

pub fn merge_tools(request_tools: &[ToolDefinition], provider_tools: Vec<ToolDefinition>) -> Vec<ToolDefinition> {
    let mut merged: Vec<ToolDefinition> = request_tools.to_vec();
    for tool in provider_tools {
        if !merged.iter().any(|existing| existing.name == tool.name) {
            merged.push(tool);
        }
    }
    merged
}
