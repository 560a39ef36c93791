use serde_json::{Value, json};

pub fn print_json(value: &Value) {
    println!("{}", jobtread_mcp_runtime::to_pretty_json(value));
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", jobtread_mcp_runtime::to_pretty_json(&err));
    std::process::exit(1);
}
